//! Browser implementations of the clock, scheduler, haptics, logging and
//! cache-storage capabilities.

use crate::clock::{Clock, Fired, Scheduler, Task, TimerHandle};
use crate::error::OfflineError;
use crate::haptics::Haptics;
use crate::offline::CacheBackend;
use gloo_timers::callback::{Interval, Timeout};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Cache, CacheStorage, Request, Response, ServiceWorkerGlobalScope};
use yew::Callback;

// ──────────────────────────────────────────────────────────────────────────────
// Logging

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Route the `log` macros to the browser console. Later calls are ignored.
pub fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Clock

/// `performance.now()`, falling back to `Date.now()` where unavailable.
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for PerformanceClock {
    fn now_ms(&self) -> u64 {
        match &self.performance {
            Some(performance) => performance.now() as u64,
            None => js_sys::Date::now() as u64,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Scheduler

enum Armed {
    Once(Timeout),
    Every(Interval),
}

#[derive(Default)]
struct SchedulerInner {
    next_id: u64,
    timers: HashMap<TimerHandle, Armed>,
    sink: Option<Callback<Fired>>,
}

/// `setTimeout`/`setInterval` scheduler. Fired tasks go to the bound sink.
#[derive(Default)]
pub struct GlooScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl GlooScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver fired tasks to `sink` from now on.
    pub fn bind(&self, sink: Callback<Fired>) {
        self.inner.borrow_mut().sink = Some(sink);
    }

    /// Stop delivering and drop every armed timer.
    pub fn unbind(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.sink = None;
        inner.timers.clear();
    }

    /// Timers still armed. Fired one-shots are no longer counted.
    pub fn armed(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    fn next_handle(&self) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        TimerHandle::new(inner.next_id)
    }

    fn emit(inner: &Rc<RefCell<SchedulerInner>>, fired: Fired) {
        // Released before emitting: the sink schedules and cancels.
        let sink = inner.borrow().sink.clone();
        if let Some(sink) = sink {
            sink.emit(fired);
        }
    }
}

impl Scheduler for GlooScheduler {
    fn schedule_once(&self, delay_ms: u32, task: Task) -> TimerHandle {
        let handle = self.next_handle();
        let inner = self.inner.clone();
        let timeout = Timeout::new(delay_ms, move || {
            let fired = inner.borrow_mut().timers.remove(&handle);
            Self::emit(&inner, Fired { handle, task });
            // This closure is still on the stack; free it once it returns.
            if let Some(fired) = fired {
                wasm_bindgen_futures::spawn_local(async move { drop(fired) });
            }
        });
        self.inner
            .borrow_mut()
            .timers
            .insert(handle, Armed::Once(timeout));
        handle
    }

    fn schedule_every(&self, period_ms: u32, task: Task) -> TimerHandle {
        let handle = self.next_handle();
        let inner = self.inner.clone();
        let interval = Interval::new(period_ms, move || {
            Self::emit(&inner, Fired { handle, task });
        });
        self.inner
            .borrow_mut()
            .timers
            .insert(handle, Armed::Every(interval));
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        // Dropping a gloo timer clears it.
        let armed = self.inner.borrow_mut().timers.remove(&handle);
        drop(armed);
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Haptics

/// `navigator.vibrate`, where the browser has it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigatorHaptics;

impl Haptics for NavigatorHaptics {
    fn pulse(&self, duration_ms: u32) {
        if let Some(window) = web_sys::window() {
            let _ = window.navigator().vibrate_with_duration(duration_ms);
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Service worker

/// Register the offline service worker where the browser supports one.
/// Failure only costs offline support, so it is logged and dropped.
pub fn register_service_worker(script: &'static str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let navigator = window.navigator();
    if !js_sys::Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false) {
        info!("service workers unsupported, running online only");
        return;
    }
    let container = navigator.service_worker();
    wasm_bindgen_futures::spawn_local(async move {
        match JsFuture::from(container.register(script)).await {
            Ok(_) => info!("service worker registered from {script}"),
            Err(e) => warn!("service worker registration failed: {}", js_reason(&e)),
        }
    });
}

// ──────────────────────────────────────────────────────────────────────────────
// Cache Storage

/// Cache Storage as seen from a service worker.
pub struct WebCacheBackend {
    scope: ServiceWorkerGlobalScope,
}

impl WebCacheBackend {
    pub fn new(scope: ServiceWorkerGlobalScope) -> Self {
        Self { scope }
    }

    fn storage(&self) -> Result<CacheStorage, OfflineError> {
        self.scope.caches().map_err(|e| OfflineError::Backend(js_reason(&e)))
    }
}

fn js_reason(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl CacheBackend for WebCacheBackend {
    type Request = Request;
    type Response = Response;

    async fn populate(&self, cache_name: &str, assets: &[&str]) -> Result<(), OfflineError> {
        let populate_error = |e: JsValue| OfflineError::Populate {
            cache: cache_name.to_string(),
            reason: js_reason(&e),
        };
        let storage = self.storage()?;
        let cache: Cache = JsFuture::from(storage.open(cache_name))
            .await
            .map_err(populate_error)?
            .unchecked_into();
        let list = js_sys::Array::new();
        for asset in assets {
            list.push(&JsValue::from_str(asset));
        }
        JsFuture::from(cache.add_all_with_str_sequence(&list))
            .await
            .map_err(populate_error)?;
        Ok(())
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        let storage = self.storage().ok()?;
        let found = JsFuture::from(storage.match_with_request(request)).await.ok()?;
        found.dyn_into::<Response>().ok()
    }

    async fn fetch(&self, request: &Request) -> Result<Response, OfflineError> {
        let network_error = |e: JsValue| OfflineError::Network {
            url: request.url(),
            reason: js_reason(&e),
        };
        JsFuture::from(self.scope.fetch_with_request(request))
            .await
            .map_err(network_error)?
            .dyn_into::<Response>()
            .map_err(network_error)
    }

    async fn cache_names(&self) -> Result<Vec<String>, OfflineError> {
        let keys = JsFuture::from(self.storage()?.keys())
            .await
            .map_err(|e| OfflineError::Backend(js_reason(&e)))?;
        Ok(js_sys::Array::from(&keys)
            .iter()
            .filter_map(|name| name.as_string())
            .collect())
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, OfflineError> {
        let deleted = JsFuture::from(self.storage()?.delete(cache_name))
            .await
            .map_err(|e| OfflineError::Backend(js_reason(&e)))?;
        Ok(deleted.as_bool().unwrap_or(false))
    }
}
