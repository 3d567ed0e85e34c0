//! Page-wide application state.
//!
//! One `AppContext` per page, shared with event handlers through `Rc`.
//! The `Session` sits behind a `RefCell`; handlers borrow it only between
//! awaits (WASM is single-threaded).

use crate::api::BrowserGateway;
use crate::config::AppConfig;
use gloo_storage::{LocalStorage, Storage};
use std::cell::RefCell;
use std::rc::Rc;
use sv_core::Session;

pub struct AppContext {
    pub config: AppConfig,
    pub session: RefCell<Session>,
    pub gateway: BrowserGateway,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Rc<Self> {
        let session = Session::new(config.session_config());
        let gateway = BrowserGateway::new(&config);
        Rc::new(Self { config, session: RefCell::new(session), gateway })
    }
}

// ── localStorage helpers ──

/// Last voter picked on this device.
pub const VOTER_KEY: &str = "sv_voter";

pub fn local_get(key: &str) -> Option<String> {
    LocalStorage::get::<String>(key).ok().filter(|v| !v.is_empty())
}

pub fn local_set(key: &str, value: &str) {
    if value.is_empty() {
        LocalStorage::delete(key);
    } else {
        let _ = LocalStorage::set(key, value);
    }
}
