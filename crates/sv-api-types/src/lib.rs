use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read resources selected by the `type` query parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Sakes,
    Members,
    MembersFull,
    Settings,
    Stats,
    VisualStats,
    SakesList,
    LatestRanking,
}

impl ResourceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sakes => "sakes",
            Self::Members => "members",
            Self::MembersFull => "members_full",
            Self::Settings => "settings",
            Self::Stats => "stats",
            Self::VisualStats => "visual_stats",
            Self::SakesList => "sakes_list",
            Self::LatestRanking => "latest_ranking",
        }
    }
}

// ── Lenient field decoding ──
//
// Sheet-backed values arrive as strings, numbers or booleans depending on how
// the cell was typed, so ids and flags are normalised here.

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(if b { "TRUE" } else { "FALSE" }.to_owned()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_string(Value::deserialize(d)?).filter(|s| !s.trim().is_empty()))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().map_or(0, |v| v.min(u32::MAX as u64) as u32),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(d)?))
}

/// Spreadsheet truthiness: `true`, `"TRUE"`, `"true"`, `1` and `"1"`.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "TRUE" | "true" | "1"),
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

// ── Master data ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SakeItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub exhibitor: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub exhibitor_member_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub desc: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub blur: bool,
}

impl SakeItem {
    pub fn is_exhibited_by(&self, member_id: &str) -> bool {
        !member_id.is_empty() && self.exhibitor_member_id.as_deref() == Some(member_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub role: Option<String>,
}

impl Member {
    /// `members_full` rows carry an id; plain `members` rows are keyed by name.
    pub fn key(&self) -> &str {
        if self.id.is_empty() { &self.name } else { &self.id }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Public catalog row from `sakes_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub name_kana: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub pref_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub pref_code: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub type_sort_order: u32,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub round: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub desc: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub amazon_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub rakuten_url: Option<String>,
}

impl CatalogItem {
    /// Reading used for `ja` ordering; the display name when no kana is set.
    pub fn sort_name(&self) -> &str {
        self.name_kana.as_deref().unwrap_or(&self.name)
    }
}

/// `{ ok, items, error }` read envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEnvelope<T> {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub error: Option<String>,
}

// ── Settings ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub vote_open: Option<String>,
    #[serde(default)]
    pub is_voting_open: Option<Value>,
    #[serde(default)]
    pub allow_sake_vote: Option<Value>,
    #[serde(default)]
    pub is_visual_voting_open: Option<Value>,
    #[serde(default)]
    pub allow_visual_vote: Option<Value>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_updated: Option<String>,
}

impl Settings {
    /// Star voting channel; absent means allowed.
    pub fn sake_vote_allowed(&self) -> bool {
        self.is_voting_open
            .as_ref()
            .or(self.allow_sake_vote.as_ref())
            .is_none_or(truthy)
    }

    /// Visual voting channel; absent means allowed.
    pub fn visual_vote_allowed(&self) -> bool {
        self.is_visual_voting_open
            .as_ref()
            .or(self.allow_visual_vote.as_ref())
            .is_none_or(truthy)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsEnvelope {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub error: Option<String>,
}

// ── Aggregates ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg: f64,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub count: u32,
    #[serde(default, rename = "type", deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisualStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub votes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse<T> {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub error: Option<String>,
}

impl<T> Default for StatsResponse<T> {
    fn default() -> Self {
        Self { ok: None, items: Vec::new(), updated_at: None, error: None }
    }
}

pub type ScoreStatsResponse = StatsResponse<ScoreStat>;
pub type VisualStatsResponse = StatsResponse<VisualStat>;

// ── Latest round ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventInfo {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub round: Option<String>,
}

/// One award card: a top-3 placing or the bottle design award.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwardEntry {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub rank: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub pref_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brewery_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sake_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub total_score: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub award_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestRankingResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub event: Option<EventInfo>,
    #[serde(default)]
    pub top3: Vec<AwardEntry>,
    #[serde(default)]
    pub design_award: Option<AwardEntry>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub error: Option<String>,
}

// ── Writes ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisualChoice {
    pub sake_index: usize,
}

/// Whole-ballot payload, posted URL-encoded as `payload=<json>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub nickname: String,
    pub member_id: String,
    pub scores: BTreeMap<String, u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualChoice>,
}

/// Per-item vote actions, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoteAction {
    Score { member: String, sake: String, score: u8 },
    VisualVote { member: String, sake: String },
}

/// Administrative actions, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AdminCommand {
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        member: String,
        allow_sake_vote: bool,
        allow_visual_vote: bool,
    },
}

/// Everything the front end may POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Ballot(Ballot),
    Vote(VoteAction),
    ToggleOpen,
    Admin(AdminCommand),
}

impl WriteRequest {
    /// Value of the `type`/`action` discriminator the API routes on.
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Ballot(_) => "ballot",
            Self::Vote(VoteAction::Score { .. }) => "score",
            Self::Vote(VoteAction::VisualVote { .. }) => "visual_vote",
            Self::ToggleOpen => "toggle_open",
            Self::Admin(AdminCommand::UpdateSettings { .. }) => "updateSettings",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WriteResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub error: Option<String>,
    #[serde(default)]
    pub settings: Option<Settings>,
}

impl WriteResponse {
    /// `{ok: true}` from the vote endpoints, `{status: "success"}` or
    /// `{success: true}` from the settings endpoint.
    pub fn accepted(&self) -> bool {
        self.ok == Some(true)
            || self.success == Some(true)
            || self.status.as_deref() == Some("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sake_item_normalises_numeric_exhibitor_id() {
        let item: SakeItem = serde_json::from_value(json!({
            "name": "Dassai 45",
            "type": "純米大吟醸",
            "brewery": "旭酒造",
            "exhibitorMemberId": 17,
            "desc": "",
            "img": "images/dassai.jpg"
        }))
        .unwrap();

        assert_eq!(item.exhibitor_member_id.as_deref(), Some("17"));
        assert_eq!(item.category.as_deref(), Some("純米大吟醸"));
        assert!(item.is_exhibited_by("17"));
        assert!(!item.is_exhibited_by(""));
        assert!(item.brewery_url.is_none());
    }

    #[test]
    fn blur_flag_accepts_blank_and_sheet_spellings() {
        let items: ListEnvelope<SakeItem> = serde_json::from_value(json!({
            "ok": true,
            "items": [
                { "name": "A", "blur": "" },
                { "name": "B", "blur": "TRUE" },
                { "name": "C", "blur": 1 },
                { "name": "D", "blur": null },
                { "name": "E" }
            ]
        }))
        .unwrap();

        let blur: Vec<bool> = items.items.iter().map(|i| i.blur).collect();
        assert_eq!(blur, [false, true, true, false, false]);
    }

    #[test]
    fn member_key_falls_back_to_name() {
        let full: Member = serde_json::from_value(json!({ "id": 3, "name": "Aki" })).unwrap();
        let plain: Member =
            serde_json::from_value(json!({ "name": "Ren", "role": "admin" })).unwrap();

        assert_eq!(full.key(), "3");
        assert_eq!(plain.key(), "Ren");
        assert!(plain.is_admin());
        assert!(!full.is_admin());
    }

    #[test]
    fn settings_channel_flags_follow_sheet_truthiness() {
        let s: Settings = serde_json::from_value(json!({
            "voteOpen": true,
            "allowSakeVote": "FALSE",
            "isVisualVotingOpen": 1
        }))
        .unwrap();

        assert_eq!(s.vote_open.as_deref(), Some("TRUE"));
        assert!(!s.sake_vote_allowed());
        assert!(s.visual_vote_allowed());
        assert!(Settings::default().sake_vote_allowed());
    }

    #[test]
    fn stats_tolerate_string_numbers() {
        let stats: ScoreStatsResponse = serde_json::from_value(json!({
            "items": [{ "name": "A", "avg": "7.5", "count": "4" }],
            "updatedAt": "2025-10-18T05:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(stats.items[0].avg, 7.5);
        assert_eq!(stats.items[0].count, 4);
        assert!(stats.updated_at.is_some());
    }

    #[test]
    fn catalog_rows_default_missing_sort_keys() {
        let items: ListEnvelope<CatalogItem> = serde_json::from_value(json!({
            "ok": true,
            "items": [
                { "name": "獺祭", "nameKana": "だっさい", "prefCode": "35", "typeSortOrder": 2 },
                { "name": "久保田", "prefCode": "", "round": 3 }
            ]
        }))
        .unwrap();

        let [dassai, kubota] = &items.items[..] else { panic!("two rows expected") };
        assert_eq!(dassai.pref_code, 35);
        assert_eq!(dassai.sort_name(), "だっさい");
        assert_eq!(kubota.pref_code, 0);
        assert_eq!(kubota.type_sort_order, 0);
        assert_eq!(kubota.round.as_deref(), Some("3"));
        assert_eq!(kubota.sort_name(), "久保田");
    }

    #[test]
    fn latest_ranking_reads_round_and_design_award() {
        let latest: LatestRankingResponse = serde_json::from_value(json!({
            "ok": true,
            "event": { "round": 12 },
            "top3": [{ "rank": "1", "name": "A", "totalScore": 41.5 }],
            "designAward": { "name": "B", "awardLabel": "ボトルデザイン賞" }
        }))
        .unwrap();

        assert_eq!(latest.event.and_then(|e| e.round).as_deref(), Some("12"));
        assert_eq!(latest.top3[0].rank, 1);
        assert_eq!(latest.top3[0].total_score.as_deref(), Some("41.5"));
        assert_eq!(latest.design_award.map(|d| d.rank), Some(0));
    }

    #[test]
    fn ballot_serialises_camel_case_and_omits_missing_visual() {
        let mut scores = BTreeMap::new();
        scores.insert("s0".to_owned(), 8);
        let ballot = Ballot {
            nickname: "Aki".into(),
            member_id: "3".into(),
            scores,
            visual: None,
        };

        assert_eq!(
            serde_json::to_value(&ballot).unwrap(),
            json!({ "nickname": "Aki", "memberId": "3", "scores": { "s0": 8 } })
        );
    }

    #[test]
    fn tagged_actions_use_api_discriminators() {
        let vote = VoteAction::VisualVote { member: "Aki".into(), sake: "Dassai".into() };
        let admin = AdminCommand::UpdateSettings {
            member: "Ren".into(),
            allow_sake_vote: true,
            allow_visual_vote: false,
        };

        assert_eq!(
            serde_json::to_value(&vote).unwrap(),
            json!({ "type": "visual_vote", "member": "Aki", "sake": "Dassai" })
        );
        assert_eq!(
            serde_json::to_value(&admin).unwrap(),
            json!({
                "action": "updateSettings",
                "member": "Ren",
                "allowSakeVote": true,
                "allowVisualVote": false
            })
        );
        assert_eq!(WriteRequest::Admin(admin).action_name(), "updateSettings");
    }

    #[test]
    fn write_response_accepts_all_success_shapes() {
        let ok: WriteResponse = serde_json::from_value(json!({ "ok": true })).unwrap();
        let legacy: WriteResponse =
            serde_json::from_value(json!({ "status": "success" })).unwrap();
        let failed: WriteResponse =
            serde_json::from_value(json!({ "ok": false, "error": "voting closed" })).unwrap();

        assert!(ok.accepted());
        assert!(legacy.accepted());
        assert!(!failed.accepted());
    }
}
