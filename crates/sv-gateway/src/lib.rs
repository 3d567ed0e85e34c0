//! Remote data gateway for the spreadsheet-backed voting API.
//!
//! `Gateway` is the seam between the page logic and a transport (browser
//! `fetch`, JSONP, or a scripted fake in tests). Transports only move bytes;
//! reply interpretation and envelope decoding live here so every transport
//! reports failures the same way.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sv_api_types::{
    CatalogItem, LatestRankingResponse, ListEnvelope, Member, ResourceType, SakeItem,
    ScoreStatsResponse, Settings, SettingsEnvelope, VisualStatsResponse, WriteRequest,
    WriteResponse,
};
use thiserror::Error;

pub const DEFAULT_TIMEOUT_MS: u32 = 12_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("request timed out after {0} ms")]
    Timeout(u32),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {raw}")]
    Malformed { raw: String },
    #[error("server rejected request: {raw}")]
    Rejected { raw: String },
}

#[async_trait(?Send)]
pub trait Gateway {
    async fn fetch(&self, resource: ResourceType) -> Result<Value, GatewayError>;
    async fn send(&self, request: &WriteRequest) -> Result<Value, GatewayError>;
}

// ── Reply interpretation ──

/// Turn an HTTP status and body into a JSON value.
///
/// A 2xx body that is not JSON is wrapped as `{ok: false, error: <text>}`
/// instead of failing, so the caller can still surface the server's text.
pub fn interpret_reply(status: u16, text: &str) -> Result<Value, GatewayError> {
    if !(200..300).contains(&status) {
        return Err(GatewayError::Http { status, body: text.to_owned() });
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(json!({ "ok": false, "error": text })),
    }
}

fn rejection(value: &Value) -> Option<String> {
    if value.get("ok") != Some(&Value::Bool(false)) {
        return None;
    }
    Some(match value.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => value.to_string(),
        Some(other) => other.to_string(),
    })
}

/// Decode a reply into `T`; `{ok: false}` envelopes become `Rejected`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    if let Some(raw) = rejection(&value) {
        return Err(GatewayError::Rejected { raw });
    }
    let raw = value.to_string();
    serde_json::from_value(value).map_err(|_| GatewayError::Malformed { raw })
}

/// Accept `{items: [...]}`, a bare array, or the legacy `{members: [...]}`.
fn normalise_list(value: Value) -> Value {
    match value {
        Value::Array(items) => json!({ "ok": true, "items": items }),
        Value::Object(mut map) if !map.contains_key("items") && map.contains_key("members") => {
            if let Some(members) = map.remove("members") {
                map.insert("items".to_owned(), members);
            }
            Value::Object(map)
        }
        other => other,
    }
}

pub fn append_query(base: &str, key: &str, value: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{key}={value}")
}

/// Build a GET URL for `resource` against the API base.
pub fn resource_url(base: &str, resource: ResourceType) -> String {
    append_query(base, "type", resource.as_str())
}

// ── Write encoding ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    /// `application/x-www-form-urlencoded` with one JSON-valued field.
    Form { field: &'static str, json: String },
    Json(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub query: Option<(&'static str, &'static str)>,
    pub body: WireBody,
}

/// How each write is put on the wire.
pub fn wire_request(request: &WriteRequest) -> Result<WireRequest, GatewayError> {
    let to_json = |value: Result<String, serde_json::Error>| {
        value.map_err(|e| GatewayError::Transport(format!("encode {}: {e}", request.action_name())))
    };
    Ok(match request {
        WriteRequest::Ballot(ballot) => WireRequest {
            query: None,
            body: WireBody::Form { field: "payload", json: to_json(serde_json::to_string(ballot))? },
        },
        WriteRequest::Vote(vote) => WireRequest {
            query: None,
            body: WireBody::Json(to_json(serde_json::to_string(vote))?),
        },
        WriteRequest::Admin(command) => WireRequest {
            query: None,
            body: WireBody::Json(to_json(serde_json::to_string(command))?),
        },
        WriteRequest::ToggleOpen => WireRequest {
            query: Some(("type", "toggle_open")),
            body: WireBody::Empty,
        },
    })
}

// ── Typed reads and writes ──

pub async fn fetch_sakes<G: Gateway + ?Sized>(gw: &G) -> Result<Vec<SakeItem>, GatewayError> {
    let value = normalise_list(gw.fetch(ResourceType::Sakes).await?);
    Ok(decode::<ListEnvelope<SakeItem>>(value)?.items)
}

/// `members_full` (`{id, name}`) when `full`, else `members` (`{name, role}`).
pub async fn fetch_members<G: Gateway + ?Sized>(
    gw: &G,
    full: bool,
) -> Result<Vec<Member>, GatewayError> {
    let resource = if full { ResourceType::MembersFull } else { ResourceType::Members };
    let value = normalise_list(gw.fetch(resource).await?);
    Ok(decode::<ListEnvelope<Member>>(value)?.items)
}

pub async fn fetch_settings<G: Gateway + ?Sized>(gw: &G) -> Result<Settings, GatewayError> {
    let value = gw.fetch(ResourceType::Settings).await?;
    if value.get("settings").is_none() && value.get("voteOpen").is_some() {
        // Older deployments return the settings object unwrapped.
        return decode::<Settings>(value);
    }
    Ok(decode::<SettingsEnvelope>(value)?.settings.unwrap_or_default())
}

pub async fn fetch_stats<G: Gateway + ?Sized>(gw: &G) -> Result<ScoreStatsResponse, GatewayError> {
    decode(gw.fetch(ResourceType::Stats).await?)
}

pub async fn fetch_visual_stats<G: Gateway + ?Sized>(
    gw: &G,
) -> Result<VisualStatsResponse, GatewayError> {
    decode(gw.fetch(ResourceType::VisualStats).await?)
}

/// Public catalog rows, in sheet order.
pub async fn fetch_catalog<G: Gateway + ?Sized>(gw: &G) -> Result<Vec<CatalogItem>, GatewayError> {
    let value = normalise_list(gw.fetch(ResourceType::SakesList).await?);
    Ok(decode::<ListEnvelope<CatalogItem>>(value)?.items)
}

pub async fn fetch_latest_ranking<G: Gateway + ?Sized>(
    gw: &G,
) -> Result<LatestRankingResponse, GatewayError> {
    decode(gw.fetch(ResourceType::LatestRanking).await?)
}

/// Post a write and require the server to accept it.
pub async fn send_write<G: Gateway + ?Sized>(
    gw: &G,
    request: &WriteRequest,
) -> Result<WriteResponse, GatewayError> {
    let value = gw.send(request).await?;
    let raw = value.to_string();
    let response: WriteResponse = decode(value)?;
    if response.accepted() {
        Ok(response)
    } else {
        Err(GatewayError::Rejected { raw: response.error.unwrap_or(raw) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use sv_api_types::{AdminCommand, Ballot};

    #[derive(Default)]
    struct CannedGateway {
        reads: HashMap<ResourceType, Result<Value, GatewayError>>,
        write: Option<Result<Value, GatewayError>>,
        sent: RefCell<Vec<WriteRequest>>,
    }

    #[async_trait(?Send)]
    impl Gateway for CannedGateway {
        async fn fetch(&self, resource: ResourceType) -> Result<Value, GatewayError> {
            self.reads
                .get(&resource)
                .cloned()
                .unwrap_or_else(|| Err(GatewayError::Transport("no canned reply".into())))
        }

        async fn send(&self, request: &WriteRequest) -> Result<Value, GatewayError> {
            self.sent.borrow_mut().push(request.clone());
            self.write.clone().unwrap_or(Ok(json!({ "ok": true })))
        }
    }

    #[test]
    fn non_success_status_is_an_http_error() {
        let err = interpret_reply(500, "boom").unwrap_err();
        assert_eq!(err, GatewayError::Http { status: 500, body: "boom".into() });
    }

    #[test]
    fn unparseable_body_is_wrapped_not_thrown() {
        let value = interpret_reply(200, "<html>Sheet not found</html>").unwrap();
        assert_eq!(value, json!({ "ok": false, "error": "<html>Sheet not found</html>" }));

        let err = decode::<WriteResponse>(value).unwrap_err();
        assert_eq!(err, GatewayError::Rejected { raw: "<html>Sheet not found</html>".into() });
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let err = decode::<ScoreStatsResponse>(json!({ "items": "nope" })).unwrap_err();
        assert!(matches!(err, GatewayError::Malformed { .. }));
    }

    #[test]
    fn resource_url_respects_existing_query() {
        assert_eq!(
            resource_url("https://script.example/exec", ResourceType::VisualStats),
            "https://script.example/exec?type=visual_stats"
        );
        assert_eq!(
            resource_url("https://script.example/exec?v=2", ResourceType::Settings),
            "https://script.example/exec?v=2&type=settings"
        );
    }

    #[test]
    fn ballots_go_out_as_form_payload_and_toggles_as_query() {
        let ballot = wire_request(&WriteRequest::Ballot(Ballot::default())).unwrap();
        assert!(matches!(ballot.body, WireBody::Form { field: "payload", .. }));
        assert_eq!(ballot.query, None);

        let toggle = wire_request(&WriteRequest::ToggleOpen).unwrap();
        assert_eq!(toggle.query, Some(("type", "toggle_open")));
        assert_eq!(toggle.body, WireBody::Empty);

        let admin = wire_request(&WriteRequest::Admin(AdminCommand::UpdateSettings {
            member: "Ren".into(),
            allow_sake_vote: true,
            allow_visual_vote: true,
        }))
        .unwrap();
        assert!(matches!(admin.body, WireBody::Json(ref body) if body.contains("updateSettings")));
    }

    #[tokio::test]
    async fn members_accept_bare_arrays_and_legacy_key() {
        let mut gw = CannedGateway::default();
        gw.reads.insert(ResourceType::MembersFull, Ok(json!([{ "id": 1, "name": "Aki" }])));
        gw.reads.insert(
            ResourceType::Members,
            Ok(json!({ "members": [{ "name": "Ren", "role": "admin" }] })),
        );

        let full = fetch_members(&gw, true).await.unwrap();
        let plain = fetch_members(&gw, false).await.unwrap();

        assert_eq!(full[0].key(), "1");
        assert!(plain[0].is_admin());
    }

    #[tokio::test]
    async fn sakes_rejection_carries_server_error() {
        let mut gw = CannedGateway::default();
        gw.reads.insert(
            ResourceType::Sakes,
            Ok(json!({ "ok": false, "error": "sheet not found: sakes" })),
        );

        let err = fetch_sakes(&gw).await.unwrap_err();
        assert_eq!(err, GatewayError::Rejected { raw: "sheet not found: sakes".into() });
    }

    #[tokio::test]
    async fn settings_accept_wrapped_and_bare_shapes() {
        let mut gw = CannedGateway::default();
        gw.reads.insert(ResourceType::Settings, Ok(json!({ "settings": { "voteOpen": "FALSE" } })));
        assert_eq!(fetch_settings(&gw).await.unwrap().vote_open.as_deref(), Some("FALSE"));

        gw.reads.insert(ResourceType::Settings, Ok(json!({ "voteOpen": "TRUE" })));
        assert_eq!(fetch_settings(&gw).await.unwrap().vote_open.as_deref(), Some("TRUE"));

        gw.reads.insert(ResourceType::Settings, Ok(json!({ "ok": true })));
        assert_eq!(fetch_settings(&gw).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn catalog_and_latest_round_decode() {
        let mut gw = CannedGateway::default();
        gw.reads.insert(
            ResourceType::SakesList,
            Ok(json!([{ "name": "Dassai", "prefCode": 35 }, { "name": "Kubota" }])),
        );
        gw.reads.insert(
            ResourceType::LatestRanking,
            Ok(json!({ "ok": false, "error": "no published round" })),
        );

        let catalog = fetch_catalog(&gw).await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].pref_code, 35);

        let err = fetch_latest_ranking(&gw).await.unwrap_err();
        assert_eq!(err, GatewayError::Rejected { raw: "no published round".into() });
    }

    #[tokio::test]
    async fn refused_write_surfaces_error_text() {
        let gw = CannedGateway {
            write: Some(Ok(json!({ "ok": false, "error": "Voting closed" }))),
            ..Default::default()
        };

        let err = send_write(&gw, &WriteRequest::ToggleOpen).await.unwrap_err();
        assert_eq!(err, GatewayError::Rejected { raw: "Voting closed".into() });
        assert_eq!(gw.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn legacy_success_status_is_accepted() {
        let gw = CannedGateway {
            write: Some(Ok(json!({ "status": "success", "settings": { "allowSakeVote": true } }))),
            ..Default::default()
        };

        let response = send_write(&gw, &WriteRequest::ToggleOpen).await.unwrap();
        assert!(response.settings.is_some());
    }
}
