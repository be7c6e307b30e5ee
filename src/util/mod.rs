pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Local-time `YYYY-MM-DD HH:MM` for an epoch-milliseconds timestamp.
pub(crate) fn format_timestamp_local(ms: i64) -> String {
    let d = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms as f64));
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        d.get_full_year(),
        d.get_month() + 1,
        d.get_date(),
        d.get_hours(),
        d.get_minutes()
    )
}
