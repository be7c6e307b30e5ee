use crate::config::EnvConfig;
use crate::models::{Entity, Entry, EntryPatch};
use crate::storage::TOKEN_KEY;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};

/// Browsers refuse keepalive requests whose body exceeds 64 KiB.
pub(crate) const KEEPALIVE_BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{context} ({status}): {body}")]
    Http {
        status: u16,
        body: String,
        context: &'static str,
    },
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self::Parse(e.to_string())
    }

    fn js(v: JsValue) -> Self {
        Self::Network(v.as_string().unwrap_or_else(|| format!("{v:?}")))
    }

    fn from_status(status: u16, body: String, context: &'static str) -> Self {
        if status == 401 {
            Self::Unauthorized
        } else {
            Self::Http {
                status,
                body,
                context,
            }
        }
    }

    /// True when retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Unauthorized | Self::Parse(_) => false,
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token: None,
        }
    }

    pub fn load_from_storage(config: &EnvConfig) -> Self {
        let token = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|s| s.get_item(TOKEN_KEY).ok().flatten())
            .filter(|t| !t.trim().is_empty());

        Self {
            base_url: config.api_url.clone(),
            token,
        }
    }

    #[allow(dead_code)]
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    pub(crate) fn entry_url(&self, id: &str) -> String {
        format!("{}/entries/{}", self.base_url, id)
    }

    async fn request_api<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<&impl serde::Serialize>,
        context: &'static str,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let mut req = client.request(method, url);
        if let Some(header) = self.auth_header() {
            req = req.header("Authorization", header);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, body, context))
        }
    }

    pub async fn list_entries(&self) -> ApiResult<Vec<Entry>> {
        let data: serde_json::Value = self
            .request_api(
                reqwest::Method::GET,
                format!("{}/entries", self.base_url),
                None::<&()>,
                "List entries failed",
            )
            .await?;
        Ok(Self::parse_list_response(data, "entries"))
    }

    pub async fn list_entities(&self) -> ApiResult<Vec<Entity>> {
        let data: serde_json::Value = self
            .request_api(
                reqwest::Method::GET,
                format!("{}/entities", self.base_url),
                None::<&()>,
                "List entities failed",
            )
            .await?;
        Ok(Self::parse_list_response(data, "entities"))
    }

    pub async fn get_entry(&self, id: &str) -> ApiResult<Entry> {
        self.request_api(
            reqwest::Method::GET,
            self.entry_url(id),
            None::<&()>,
            "Load entry failed",
        )
        .await
    }

    pub async fn update_entry(&self, id: &str, patch: &EntryPatch) -> ApiResult<Entry> {
        self.request_api(
            reqwest::Method::PATCH,
            self.entry_url(id),
            Some(patch),
            "Update entry failed",
        )
        .await
    }

    /// PATCH through `fetch` with `keepalive`, so the browser keeps delivering
    /// the request after the page that issued it is gone.
    pub async fn update_entry_keepalive(&self, id: &str, patch: &EntryPatch) -> ApiResult<()> {
        let body = serde_json::to_string(patch).map_err(ApiError::parse)?;
        let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".into()))?;

        let headers = web_sys::Headers::new().map_err(ApiError::js)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(ApiError::js)?;
        if let Some(header) = self.auth_header() {
            headers.set("Authorization", &header).map_err(ApiError::js)?;
        }

        let init = web_sys::RequestInit::new();
        init.set_method("PATCH");
        init.set_keepalive(true);
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));

        let request = web_sys::Request::new_with_str_and_init(&self.entry_url(id), &init)
            .map_err(ApiError::js)?;
        let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(ApiError::js)?;
        let resp: web_sys::Response = resp.dyn_into().map_err(ApiError::js)?;

        if resp.ok() {
            Ok(())
        } else {
            Err(ApiError::from_status(
                resp.status(),
                resp.status_text(),
                "Keepalive update failed",
            ))
        }
    }

    /// Accepts both `{"<key>": [...]}` and a bare array. Items that fail to
    /// parse are skipped rather than failing the whole list.
    pub(crate) fn parse_list_response<T: DeserializeOwned>(
        data: serde_json::Value,
        key: &str,
    ) -> Vec<T> {
        let list = match data {
            serde_json::Value::Array(items) => items,
            other => other
                .get(key)
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default(),
        };

        list.into_iter()
            .filter_map(|item| serde_json::from_value::<T>(item).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_list_wrapped() {
        let data = serde_json::json!({
            "entries": [
                {"id": "e1", "entity-id": "mood", "timestamp": 1, "notes": "ok"},
                {"id": "e2", "entity-id": "mood", "timestamp": 2}
            ]
        });
        let entries: Vec<Entry> = ApiClient::parse_list_response(data, "entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].notes, "ok");
        assert!(entries[1].notes.is_empty());
    }

    #[test]
    fn test_parse_entry_list_bare_array_skips_broken_items() {
        let data = serde_json::json!([
            {"id": "e1", "entity-id": "mood", "timestamp": 1},
            {"id": "broken"}
        ]);
        let entries: Vec<Entry> = ApiClient::parse_list_response(data, "entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "e1");
    }

    #[test]
    fn test_parse_list_missing_key_is_empty() {
        let entities: Vec<Entity> =
            ApiClient::parse_list_response(serde_json::json!({"other": []}), "entities");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_entry_url() {
        let client = ApiClient::new("http://localhost:6689".to_string());
        assert_eq!(client.entry_url("e1"), "http://localhost:6689/entries/e1");
    }

    #[test]
    fn test_auth_header_with_token() {
        let mut client = ApiClient::new("http://localhost:6689".to_string());
        assert!(client.auth_header().is_none());
        client.set_token("my-jwt-token".to_string());
        assert_eq!(client.auth_header().as_deref(), Some("Bearer my-jwt-token"));
    }

    #[test]
    fn test_status_401_maps_to_unauthorized() {
        assert_eq!(
            ApiError::from_status(401, String::new(), "x"),
            ApiError::Unauthorized
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Network("offline".into()).is_transient());
        assert!(ApiError::from_status(503, String::new(), "x").is_transient());
        assert!(!ApiError::from_status(400, String::new(), "x").is_transient());
        assert!(!ApiError::Unauthorized.is_transient());
    }
}
