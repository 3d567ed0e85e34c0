//! Browser transports for the voting API.
//!
//! `BrowserGateway` moves bytes with `fetch` (or JSONP for reads) and leaves
//! reply interpretation to `sv_gateway`. Every request is raced against a
//! timer; on timeout the `fetch` is aborted.

use crate::config::{AppConfig, Transport};
use crate::dom;
use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{Either, select};
use gloo_net::http::{Request, RequestBuilder};
use gloo_timers::future::TimeoutFuture;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::pin::pin;
use std::rc::Rc;
use sv_api_types::{ResourceType, WriteRequest};
use sv_gateway::{
    Gateway, GatewayError, WireBody, append_query, interpret_reply, resource_url, wire_request,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AbortController, HtmlScriptElement, RequestCache, UrlSearchParams};

thread_local! {
    static JSONP_SEQ: Cell<u32> = const { Cell::new(0) };
}

fn js_err(e: JsValue) -> GatewayError {
    GatewayError::Transport(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

fn net_err(e: gloo_net::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

pub struct BrowserGateway {
    api_url: String,
    timeout_ms: u32,
    transport: Transport,
}

impl BrowserGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            timeout_ms: config.timeout_ms,
            transport: config.transport,
        }
    }

    /// Send a request built against a fresh abort signal, with the timeout.
    async fn exchange(
        &self,
        build: impl FnOnce(RequestBuilder) -> Result<Request, gloo_net::Error>,
        builder: RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let controller = AbortController::new().map_err(js_err)?;
        let signal = controller.signal();
        let request = build(builder.abort_signal(Some(&signal))).map_err(net_err)?;

        let reply = async {
            let response = request.send().await.map_err(net_err)?;
            let status = response.status();
            let text = response.text().await.map_err(net_err)?;
            interpret_reply(status, &text)
        };
        match select(pin!(reply), pin!(TimeoutFuture::new(self.timeout_ms))).await {
            Either::Left((reply, _)) => reply,
            Either::Right(((), _)) => {
                controller.abort();
                Err(GatewayError::Timeout(self.timeout_ms))
            }
        }
    }

    async fn get(&self, url: &str) -> Result<Value, GatewayError> {
        self.exchange(RequestBuilder::build, Request::get(url).cache(RequestCache::NoStore))
            .await
    }

    async fn post(&self, url: &str, body: WireBody) -> Result<Value, GatewayError> {
        let builder = Request::post(url);
        match body {
            WireBody::Form { field, json } => {
                let form = UrlSearchParams::new().map_err(js_err)?;
                form.append(field, &json);
                self.exchange(move |b| b.body(form), builder).await
            }
            // Apps Script does not answer CORS preflights, so JSON goes out
            // as text/plain.
            WireBody::Json(json) => {
                let builder = builder.header("Content-Type", "text/plain;charset=utf-8");
                self.exchange(move |b| b.body(json), builder).await
            }
            WireBody::Empty => self.exchange(RequestBuilder::build, builder).await,
        }
    }

    /// GET through a one-shot `<script>` callback.
    async fn jsonp(&self, url: &str) -> Result<Value, GatewayError> {
        let seq = JSONP_SEQ.with(|c| {
            let next = c.get().wrapping_add(1);
            c.set(next);
            next
        });
        let name = format!("__sakeVoteCb{seq}");
        let window = dom::window();
        let (tx, rx) = oneshot::channel::<Result<JsValue, GatewayError>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_data = {
            let tx = Rc::clone(&tx);
            Closure::<dyn FnMut(JsValue)>::new(move |data: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Ok(data));
                }
            })
        };
        let on_error = {
            let tx = Rc::clone(&tx);
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Err(GatewayError::Transport("JSONP script failed".into())));
                }
            })
        };

        js_sys::Reflect::set(&window, &JsValue::from_str(&name), on_data.as_ref())
            .map_err(js_err)?;
        let script: HtmlScriptElement = dom::create_element("script")
            .map_err(js_err)?
            .dyn_into()
            .map_err(|e: web_sys::Element| js_err(e.into()))?;
        script.set_src(&append_query(url, "callback", &name));
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        let head = gloo_utils::document()
            .head()
            .ok_or_else(|| GatewayError::Transport("document has no <head>".into()))?;
        head.append_child(&script).map_err(js_err)?;

        let outcome = match select(rx, pin!(TimeoutFuture::new(self.timeout_ms))).await {
            Either::Left((Ok(result), _)) => result,
            Either::Left((Err(_), _)) => {
                Err(GatewayError::Transport("JSONP callback dropped".into()))
            }
            Either::Right(((), _)) => Err(GatewayError::Timeout(self.timeout_ms)),
        };

        script.remove();
        let _ = js_sys::Reflect::delete_property(&window, &JsValue::from_str(&name));
        drop((on_data, on_error));

        let data = outcome?;
        serde_wasm_bindgen::from_value::<Value>(data)
            .map_err(|e| GatewayError::Malformed { raw: e.to_string() })
    }
}

#[async_trait(?Send)]
impl Gateway for BrowserGateway {
    async fn fetch(&self, resource: ResourceType) -> Result<Value, GatewayError> {
        let url = resource_url(&self.api_url, resource);
        match self.transport {
            Transport::Fetch => self.get(&url).await,
            Transport::Jsonp => self.jsonp(&url).await,
        }
    }

    async fn send(&self, request: &WriteRequest) -> Result<Value, GatewayError> {
        let wire = wire_request(request)?;
        let url = match wire.query {
            Some((key, value)) => append_query(&self.api_url, key, value),
            None => self.api_url.clone(),
        };
        self.post(&url, wire.body).await
    }
}
