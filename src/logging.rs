use log::{Level, LevelFilter, Log, Metadata, Record};

const CRATE_TARGET: &str = "journal_app";

/// `log` backend that writes to the browser console.
///
/// This crate logs at info (debug when `window.ENV.DEBUG` is set); every other
/// target is held to warn so framework chatter stays out of the console.
pub(crate) struct ConsoleLogger {
    debug: bool,
}

impl ConsoleLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn install(debug: bool) {
        if log::set_boxed_logger(Box::new(Self::new(debug))).is_ok() {
            log::set_max_level(LevelFilter::Debug);
        }
    }
}

pub(crate) fn max_level_for(target: &str, debug: bool) -> LevelFilter {
    if target == CRATE_TARGET || target.starts_with("journal_app::") {
        if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    } else {
        LevelFilter::Warn
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level_for(metadata.target(), self.debug)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        let msg = wasm_bindgen::JsValue::from_str(&line);
        match record.level() {
            Level::Error => web_sys::console::error_1(&msg),
            Level::Warn => web_sys::console::warn_1(&msg),
            Level::Info => web_sys::console::info_1(&msg),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}
