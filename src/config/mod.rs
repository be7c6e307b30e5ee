use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:6689";
pub(crate) const DEFAULT_AUTOSAVE_MS: u32 = 1500;
pub(crate) const DEFAULT_SAVED_DISPLAY_MS: u32 = 2000;
pub(crate) const DEFAULT_ERROR_DISPLAY_MS: u32 = 4000;

// Anything shorter turns typing into a request per keystroke.
const MIN_AUTOSAVE_MS: u32 = 200;
const MIN_DISPLAY_MS: u32 = 500;

/// Timing knobs for the autosave controller.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save fires.
    pub debounce_ms: u32,
    /// How long "Saved" stays visible before reverting to idle.
    pub saved_display_ms: u32,
    /// How long "Failed to save" stays visible before reverting to idle.
    pub error_display_ms: u32,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_AUTOSAVE_MS,
            saved_display_ms: DEFAULT_SAVED_DISPLAY_MS,
            error_display_ms: DEFAULT_ERROR_DISPLAY_MS,
        }
    }
}

/// Runtime configuration injected by the hosting page as `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnvConfig {
    pub api_url: String,
    pub autosave_ms: u32,
    pub saved_display_ms: u32,
    pub error_display_ms: u32,
    pub debug: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            autosave_ms: DEFAULT_AUTOSAVE_MS,
            saved_display_ms: DEFAULT_SAVED_DISPLAY_MS,
            error_display_ms: DEFAULT_ERROR_DISPLAY_MS,
            debug: false,
        }
    }
}

/// Raw values as found on `window.ENV`, before defaults and clamping.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawEnv {
    pub api_url: Option<String>,
    pub autosave_ms: Option<f64>,
    pub saved_display_ms: Option<f64>,
    pub error_display_ms: Option<f64>,
    pub debug: Option<bool>,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::from_raw(read_window_env())
    }

    pub(crate) fn from_raw(raw: RawEnv) -> Self {
        let ms = |v: Option<f64>, default: u32, min: u32| -> u32 {
            match v {
                Some(v) if v.is_finite() && v > 0.0 => (v.round() as u32).max(min),
                _ => default,
            }
        };

        let api_url = raw
            .api_url
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self {
            api_url,
            autosave_ms: ms(raw.autosave_ms, DEFAULT_AUTOSAVE_MS, MIN_AUTOSAVE_MS),
            saved_display_ms: ms(raw.saved_display_ms, DEFAULT_SAVED_DISPLAY_MS, MIN_DISPLAY_MS),
            error_display_ms: ms(raw.error_display_ms, DEFAULT_ERROR_DISPLAY_MS, MIN_DISPLAY_MS),
            debug: raw.debug.unwrap_or(false),
        }
    }

    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig {
            debounce_ms: self.autosave_ms,
            saved_display_ms: self.saved_display_ms,
            error_display_ms: self.error_display_ms,
        }
    }
}

// Both `window.ENV.API_URL` (documented) and `window.ENV.api_url` are accepted.
fn env_value(env: &JsValue, key: &str) -> Option<JsValue> {
    [key.to_string(), key.to_lowercase()]
        .iter()
        .filter_map(|k| js_sys::Reflect::get(env, &JsValue::from_str(k)).ok())
        .find(|v| !v.is_undefined() && !v.is_null())
}

fn read_window_env() -> RawEnv {
    let Some(window) = web_sys::window() else {
        return RawEnv::default();
    };
    let Some(env) = window.get("ENV") else {
        return RawEnv::default();
    };
    let env: JsValue = env.into();
    if env.is_undefined() || !env.is_object() {
        return RawEnv::default();
    }

    let number = |key: &str| {
        env_value(&env, key).and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_string().and_then(|s| s.trim().parse::<f64>().ok()))
        })
    };

    RawEnv {
        api_url: env_value(&env, "API_URL").and_then(|v| v.as_string()),
        autosave_ms: number("AUTOSAVE_MS"),
        saved_display_ms: number("SAVED_DISPLAY_MS"),
        error_display_ms: number("ERROR_DISPLAY_MS"),
        debug: env_value(&env, "DEBUG").map(|v| {
            v.as_bool()
                .unwrap_or_else(|| matches!(v.as_string().as_deref(), Some("1" | "true")))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_is_missing() {
        let cfg = EnvConfig::from_raw(RawEnv::default());
        assert_eq!(cfg, EnvConfig::default());
        assert_eq!(cfg.autosave(), AutosaveConfig::default());
    }

    #[test]
    fn test_api_url_is_trimmed() {
        let cfg = EnvConfig::from_raw(RawEnv {
            api_url: Some(" https://journal.example.com/ ".to_string()),
            ..Default::default()
        });
        assert_eq!(cfg.api_url, "https://journal.example.com");
    }

    #[test]
    fn test_blank_api_url_falls_back() {
        let cfg = EnvConfig::from_raw(RawEnv {
            api_url: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_timings_are_clamped() {
        let cfg = EnvConfig::from_raw(RawEnv {
            autosave_ms: Some(10.0),
            saved_display_ms: Some(-5.0),
            error_display_ms: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(cfg.autosave_ms, MIN_AUTOSAVE_MS);
        assert_eq!(cfg.saved_display_ms, DEFAULT_SAVED_DISPLAY_MS);
        assert_eq!(cfg.error_display_ms, DEFAULT_ERROR_DISPLAY_MS);
    }

    #[test]
    fn test_autosave_config_follows_env() {
        let cfg = EnvConfig::from_raw(RawEnv {
            autosave_ms: Some(1000.0),
            saved_display_ms: Some(1500.0),
            error_display_ms: Some(3000.0),
            debug: Some(true),
            ..Default::default()
        });
        assert!(cfg.debug);
        assert_eq!(
            cfg.autosave(),
            AutosaveConfig {
                debounce_ms: 1000,
                saved_display_ms: 1500,
                error_display_ms: 3000,
            }
        );
    }
}
