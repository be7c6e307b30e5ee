use futures::future::LocalBoxFuture;
use wasm_bindgen::JsCast;

/// Timers and task spawning for the autosave controller.
///
/// Everything runs on one thread: deferred tasks and spawned futures are
/// driven by the host event loop, never concurrently with each other.
pub(crate) trait Scheduler: Clone + 'static {
    type Handle: 'static;

    /// Run `task` once after `delay_ms`, unless cancelled first.
    fn defer(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Self::Handle;

    /// Cancel a deferred task. Cancelling one that already ran is a no-op.
    fn cancel(&self, handle: Self::Handle);

    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// `setTimeout`-backed scheduler for the browser.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    type Handle = i32;

    fn defer(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> i32 {
        let Some(win) = web_sys::window() else {
            log::warn!("no window; deferred task dropped");
            return 0;
        };

        let cb = wasm_bindgen::closure::Closure::once_into_js(move || task());
        win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay_ms.min(i32::MAX as u32) as i32,
        )
        .unwrap_or(0)
    }

    fn cancel(&self, handle: i32) {
        if let Some(win) = web_sys::window() {
            win.clear_timeout_with_handle(handle);
        }
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        leptos::task::spawn_local(task);
    }
}
