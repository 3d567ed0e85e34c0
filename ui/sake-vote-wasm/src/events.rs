//! Event binding helpers.
//!
//! Page modules wire their listeners with these. Async handlers take the
//! page by `Rc` and are spawned with `wasm_bindgen_futures::spawn_local`.
//! Listeners live as long as the page, so every closure is `forget`-ed.

use std::future::Future;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget};

/// Attach a sync listener for `event`.
pub fn listen<F>(target: &EventTarget, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

/// Attach an async listener: each event spawns `handler(page, event)`.
pub fn listen_async<P, F, Fut>(
    target: &EventTarget,
    event: &str,
    page: &Rc<P>,
    handler: F,
) -> Result<(), JsValue>
where
    P: 'static,
    F: Fn(Rc<P>, Event) -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let page = Rc::clone(page);
    listen(target, event, move |ev| {
        wasm_bindgen_futures::spawn_local(handler(Rc::clone(&page), ev));
    })
}

/// Helper: attach async click handler; `$page` is a `&Rc<_>`.
macro_rules! on_click_async {
    ($el:expr, $page:expr, $handler:expr) => {
        $crate::events::listen_async(&$el, "click", $page, |page, _| $handler(page))?
    };
}

/// Helper: attach sync click handler.
macro_rules! on_click {
    ($el:expr, $cb:expr) => {
        $crate::events::listen(&$el, "click", $cb)?
    };
}

pub(crate) use on_click;
pub(crate) use on_click_async;
