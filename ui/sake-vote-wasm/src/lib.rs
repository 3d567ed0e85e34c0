//! SakeVote WASM Frontend
//!
//! One bundle for every event page. `<body data-page>` picks the page
//! controller; the shared crates hold all voting logic.

pub mod admin_page;
pub mod api;
pub mod catalog_page;
pub mod config;
pub mod dom;
pub mod events;
pub mod latest_page;
pub mod ranking_view;
pub mod results_page;
pub mod state;
pub mod vote_page;

use config::AppConfig;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Vote,
    Admin,
    Results,
    Catalog,
    Latest,
}

impl PageKind {
    /// Unknown or missing values fall back to the voting page.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Self::Admin,
            Some("results") => Self::Results,
            Some("catalog") => Self::Catalog,
            Some("latest") => Self::Latest,
            _ => Self::Vote,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::Admin => "admin",
            Self::Results => "results",
            Self::Catalog => "catalog",
            Self::Latest => "latest",
        }
    }

    /// Status line that startup errors are reported in.
    fn message_id(self) -> &'static str {
        match self {
            Self::Vote => "msg",
            Self::Admin => "adminMsg",
            Self::Results => "rankMeta",
            Self::Catalog => "sake-status",
            Self::Latest => "latest-status",
        }
    }
}

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();

    init().await
}

async fn init() -> Result<(), JsValue> {
    let page = PageKind::parse(dom::body_attr("data-page").as_deref());
    gloo_console::log!("sake-vote page:", page.as_str());

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            gloo_console::error!("config:", e.clone());
            if let Some(el) = dom::by_id(page.message_id()) {
                dom::set_msg(&el, "設定の読み込みに失敗しました。", true);
            }
            return Err(e);
        }
    };

    let ctx = state::AppContext::new(config);
    match page {
        PageKind::Vote => vote_page::init(ctx).await,
        PageKind::Admin => admin_page::init(ctx).await,
        PageKind::Results => results_page::init(ctx).await,
        PageKind::Catalog => catalog_page::init(ctx).await,
        PageKind::Latest => latest_page::init(ctx).await,
    }
}
