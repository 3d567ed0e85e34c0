//! Public catalog ordering and the latest-round award cards.

use crate::ranking::Medal;
use std::cmp::Ordering;
use sv_api_types::{AwardEntry, CatalogItem, LatestRankingResponse};

/// Catalog descriptions longer than this get a read-more toggle.
pub const SHORT_DESC_CHARS: usize = 80;
/// Rows without a type order sort after every ordered type.
const UNORDERED_TYPE: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogSort {
    #[default]
    NameKana,
    PrefCode,
    TypeSortOrder,
}

impl CatalogSort {
    /// Values of the sort select. Anything else keeps sheet order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "nameKana" => Some(Self::NameKana),
            "prefCode" => Some(Self::PrefCode),
            "typeSortOrder" => Some(Self::TypeSortOrder),
            _ => None,
        }
    }
}

fn type_order(item: &CatalogItem) -> u32 {
    match item.type_sort_order {
        0 => UNORDERED_TYPE,
        n => n,
    }
}

/// Sorted copy of `items`; `None` keeps sheet order. Ties fall back to the
/// kana reading under `collate`.
pub fn sorted_catalog_by<F>(
    items: &[CatalogItem],
    sort: Option<CatalogSort>,
    collate: F,
) -> Vec<CatalogItem>
where
    F: Fn(&str, &str) -> Ordering,
{
    let mut out = items.to_vec();
    let by_name = |a: &CatalogItem, b: &CatalogItem| collate(a.sort_name(), b.sort_name());
    match sort {
        Some(CatalogSort::NameKana) => out.sort_by(|a, b| by_name(a, b)),
        Some(CatalogSort::PrefCode) => {
            out.sort_by(|a, b| a.pref_code.cmp(&b.pref_code).then_with(|| by_name(a, b)))
        }
        Some(CatalogSort::TypeSortOrder) => {
            out.sort_by(|a, b| type_order(a).cmp(&type_order(b)).then_with(|| by_name(a, b)))
        }
        None => {}
    }
    out
}

/// Truncated description with an ellipsis, or `None` when it already fits.
pub fn short_desc(desc: &str) -> Option<String> {
    let (cut, _) = desc.char_indices().nth(SHORT_DESC_CHARS)?;
    Some(format!("{}…", &desc[..cut]))
}

pub fn status_line(count: usize) -> String {
    format!("{count}件の出品酒が見つかりました。")
}

// ── Latest round ──

/// Medal for a one-based published rank. Unranked cards get none.
pub fn award_medal(entry: &AwardEntry) -> Option<Medal> {
    let medal = Medal::for_rank(entry.rank.checked_sub(1)? as usize);
    medal.css_class().map(|_| medal)
}

/// `総合得点：41.5点／金賞` with whichever parts are present.
pub fn award_meta(entry: &AwardEntry) -> String {
    let score = entry.total_score.as_deref().map(|s| format!("総合得点：{s}点"));
    match (score, entry.award_label.as_deref()) {
        (Some(score), Some(label)) => format!("{score}／{label}"),
        (Some(score), None) => score,
        (None, Some(label)) => label.to_owned(),
        (None, None) => String::new(),
    }
}

/// `酒蔵名（県名）`.
pub fn brewery_line(entry: &AwardEntry) -> String {
    let brewery = entry.brewery.as_deref().unwrap_or_default();
    match entry.pref_name.as_deref() {
        Some(pref) => format!("{brewery}（{pref}）"),
        None => brewery.to_owned(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestResult {
    pub round: Option<String>,
    pub top3: Vec<AwardEntry>,
    pub design_award: Option<AwardEntry>,
}

impl From<LatestRankingResponse> for LatestResult {
    fn from(response: LatestRankingResponse) -> Self {
        Self {
            round: response.event.and_then(|e| e.round),
            top3: response.top3,
            design_award: response.design_award,
        }
    }
}
