//! Service worker: precaches the app shell and serves it cache-first.

use calc_coffee::browser::{init_logging, WebCacheBackend};
use calc_coffee::config::{CACHE_NAME, PRECACHE_ASSETS};
use calc_coffee::offline::OfflineCache;
use log::{info, warn, LevelFilter};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::future_to_promise;
use web_sys::{ExtendableEvent, FetchEvent, ServiceWorkerGlobalScope};

type Cache = Rc<OfflineCache<WebCacheBackend>>;

fn on_install(cache: Cache) -> Closure<dyn FnMut(ExtendableEvent)> {
    Closure::new(move |event: ExtendableEvent| {
        let cache = cache.clone();
        let installed = future_to_promise(async move {
            cache
                .install()
                .await
                .map(|()| JsValue::UNDEFINED)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        });
        if event.wait_until(&installed).is_err() {
            warn!("install event no longer extendable");
        }
    })
}

fn on_fetch(cache: Cache) -> Closure<dyn FnMut(FetchEvent)> {
    Closure::new(move |event: FetchEvent| {
        let cache = cache.clone();
        let request = event.request();
        let response = future_to_promise(async move {
            cache
                .respond(&request)
                .await
                .map(JsValue::from)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        });
        if event.respond_with(&response).is_err() {
            warn!("fetch event already answered");
        }
    })
}

fn on_activate(cache: Cache) -> Closure<dyn FnMut(ExtendableEvent)> {
    Closure::new(move |event: ExtendableEvent| {
        let cache = cache.clone();
        let pruned = future_to_promise(async move {
            cache
                .activate()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        });
        if event.wait_until(&pruned).is_err() {
            warn!("activate event no longer extendable");
        }
    })
}

fn main() {
    console_error_panic_hook::set_once();
    init_logging(LevelFilter::Info);

    let scope: ServiceWorkerGlobalScope = js_sys::global().unchecked_into();
    let cache: Cache = Rc::new(OfflineCache::new(
        CACHE_NAME,
        PRECACHE_ASSETS,
        WebCacheBackend::new(scope.clone()),
    ));

    info!("service worker starting for {}", cache.version());

    let install = on_install(cache.clone());
    let fetch = on_fetch(cache.clone());
    let activate = on_activate(cache);
    for (event, listener) in [
        ("install", install.as_ref()),
        ("fetch", fetch.as_ref()),
        ("activate", activate.as_ref()),
    ] {
        if let Err(e) = scope.add_event_listener_with_callback(event, listener.unchecked_ref()) {
            warn!("cannot listen for {event}: {e:?}");
        }
    }
    // Listeners live as long as the worker.
    install.forget();
    fetch.forget();
    activate.forget();
}
