//! Runtime configuration.
//!
//! Read once at startup from `window.SAKE_VOTE_CONFIG`. Pages deployed with
//! the older snippet only set `window.GAS_API_URL`, and static hosts can put
//! the URL on `<body data-api-url>` instead.

use crate::dom;
use serde::Deserialize;
use sv_core::{FallbackPolicy, SessionConfig, SubmitMode, ranking::DEFAULT_KEEP_TOP_N};
use sv_gateway::DEFAULT_TIMEOUT_MS;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Fetch,
    Jsonp,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStyle {
    #[default]
    Ballot,
    PerItem,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout_ms: u32,
    pub transport: Transport,
    pub keep_top_n: usize,
    pub fail_closed: bool,
    /// Prepended to relative image paths that are not root-relative.
    pub image_prefix: String,
    pub submit_mode: SubmitStyle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            transport: Transport::default(),
            keep_top_n: DEFAULT_KEEP_TOP_N,
            fail_closed: false,
            image_prefix: "../".to_owned(),
            submit_mode: SubmitStyle::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, JsValue> {
        let window = dom::window();
        let raw = js_sys::Reflect::get(&window, &JsValue::from_str("SAKE_VOTE_CONFIG"))?;
        let mut config: AppConfig = if raw.is_undefined() || raw.is_null() {
            AppConfig::default()
        } else {
            serde_wasm_bindgen::from_value(raw)?
        };

        if config.api_url.trim().is_empty() {
            let global = |name: &str| -> Result<Option<String>, JsValue> {
                Ok(js_sys::Reflect::get(&window, &JsValue::from_str(name))?
                    .as_string()
                    .filter(|s| !s.trim().is_empty()))
            };
            // The catalog and latest-result pages publish the master sheet URL.
            config.api_url = global("GAS_API_URL")?
                .or(global("SAKE_MASTER_API_URL")?)
                .or_else(dom::body_api_url)
                .unwrap_or_default();
        }
        config.normalise();
        if config.api_url.is_empty() {
            return Err(JsValue::from_str("API URL is not configured"));
        }
        Ok(config)
    }

    fn normalise(&mut self) {
        self.api_url = self.api_url.trim().to_owned();
        if self.timeout_ms == 0 {
            self.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        if self.keep_top_n == 0 {
            self.keep_top_n = DEFAULT_KEEP_TOP_N;
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            keep_top_n: self.keep_top_n,
            fallback: if self.fail_closed {
                FallbackPolicy::FailClosed
            } else {
                FallbackPolicy::FailOpen
            },
            submit_mode: match self.submit_mode {
                SubmitStyle::Ballot => SubmitMode::Ballot,
                SubmitStyle::PerItem => SubmitMode::PerItem,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_take_defaults() {
        let config: AppConfig =
            serde_json::from_value(json!({ "apiUrl": "https://script.example/exec" })).unwrap();
        assert_eq!(config.timeout_ms, 12_000);
        assert_eq!(config.transport, Transport::Fetch);
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn options_map_onto_session() {
        let mut config: AppConfig = serde_json::from_value(json!({
            "apiUrl": "  https://script.example/exec ",
            "transport": "jsonp",
            "keepTopN": 0,
            "failClosed": true,
            "submitMode": "per_item"
        }))
        .unwrap();
        config.normalise();

        assert_eq!(config.api_url, "https://script.example/exec");
        assert_eq!(config.transport, Transport::Jsonp);
        let session = config.session_config();
        assert_eq!(session.keep_top_n, 5);
        assert_eq!(session.fallback, FallbackPolicy::FailClosed);
        assert_eq!(session.submit_mode, SubmitMode::PerItem);
    }
}
