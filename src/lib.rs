mod api;
mod app;
mod autosave;
mod components;
mod config;
mod drafts;
mod logging;
mod models;
mod pages;
mod state;
mod storage;
mod store;
mod tags;
mod util;

#[cfg(test)]
mod test_utils;

use crate::app::App;
use crate::config::EnvConfig;
use crate::logging::ConsoleLogger;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    ConsoleLogger::install(EnvConfig::new().debug);
    log::info!("journal app starting");
    mount_to_body(App);
}
