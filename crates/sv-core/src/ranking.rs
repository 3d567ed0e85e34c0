//! Ranking builder: sort, annotate with medals, and collapse past the top N.
//!
//! Output is plain data; the UI turns a `RankingView` into markup.

use std::cmp::Ordering;
use sv_api_types::{ScoreStat, VisualStat};

pub const DEFAULT_KEEP_TOP_N: usize = 5;
pub const PODIUM_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
    /// One-based ordinal for ranks past the podium.
    Plain(usize),
}

impl Medal {
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Gold,
            1 => Self::Silver,
            2 => Self::Bronze,
            n => Self::Plain(n + 1),
        }
    }

    pub fn badge(&self) -> String {
        match self {
            Self::Gold => "🥇".to_owned(),
            Self::Silver => "🥈".to_owned(),
            Self::Bronze => "🥉".to_owned(),
            Self::Plain(n) => n.to_string(),
        }
    }

    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            Self::Gold => Some("top1"),
            Self::Silver => Some("top2"),
            Self::Bronze => Some("top3"),
            Self::Plain(_) => None,
        }
    }

    pub fn has_crown(&self) -> bool {
        matches!(self, Self::Gold)
    }
}

// ── Ordering ──

pub fn sort_scores(items: &mut [ScoreStat]) {
    items.sort_by(|a, b| b.avg.total_cmp(&a.avg).then_with(|| b.count.cmp(&a.count)));
}

pub fn sort_visual_by<F>(items: &mut [VisualStat], collate: F)
where
    F: Fn(&str, &str) -> Ordering,
{
    items.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| collate(&a.name, &b.name)));
}

/// Case-insensitive name order, used where no locale collator is available.
pub fn default_collation(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

// ── Views ──

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<T> {
    pub rank: usize,
    pub medal: Medal,
    /// Past the top N and the list is collapsed.
    pub hidden: bool,
    pub record: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListToggle {
    pub expanded: bool,
    /// Entries past the top N, whether or not they are currently shown.
    pub extra: usize,
}

impl ListToggle {
    pub fn label(&self) -> String {
        if self.expanded {
            "閉じる".to_owned()
        } else {
            format!("さらに表示（{} 件）", self.extra)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingView<T> {
    pub entries: Vec<RankedEntry<T>>,
    pub toggle: Option<ListToggle>,
}

impl<T> RankingView<T> {
    /// Annotate already-sorted records.
    pub fn build(records: Vec<T>, keep_top_n: usize, expanded: bool) -> Self {
        let total = records.len();
        let entries = records
            .into_iter()
            .enumerate()
            .map(|(rank, record)| RankedEntry {
                rank,
                medal: Medal::for_rank(rank),
                hidden: !expanded && rank >= keep_top_n,
                record,
            })
            .collect();
        let toggle = (total > keep_top_n)
            .then(|| ListToggle { expanded, extra: total - keep_top_n });
        Self { entries, toggle }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &RankedEntry<T>> {
        self.entries.iter().filter(|e| !e.hidden)
    }

    pub fn hidden_count(&self) -> usize {
        self.entries.iter().filter(|e| e.hidden).count()
    }
}

pub fn score_ranking(
    mut items: Vec<ScoreStat>,
    keep_top_n: usize,
    expanded: bool,
) -> RankingView<ScoreStat> {
    sort_scores(&mut items);
    RankingView::build(items, keep_top_n, expanded)
}

pub fn visual_ranking_by<F>(
    mut items: Vec<VisualStat>,
    keep_top_n: usize,
    expanded: bool,
    collate: F,
) -> RankingView<VisualStat>
where
    F: Fn(&str, &str) -> Ordering,
{
    sort_visual_by(&mut items, collate);
    RankingView::build(items, keep_top_n, expanded)
}

/// Short top-3 list shown on the voting page.
#[derive(Debug, Clone, PartialEq)]
pub enum Podium {
    /// The stats sheet returned nothing at all.
    NoData,
    /// Records exist but none has been voted on.
    NoVotes,
    Ranked(Vec<RankedEntry<ScoreStat>>),
}

impl Podium {
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            Self::NoData => Some("まだ集計データがありません"),
            Self::NoVotes => Some("まだ投票がありません"),
            Self::Ranked(_) => None,
        }
    }
}

pub fn podium(items: &[ScoreStat]) -> Podium {
    if items.is_empty() {
        return Podium::NoData;
    }
    let mut voted: Vec<ScoreStat> = items.iter().filter(|s| s.count > 0).cloned().collect();
    if voted.is_empty() {
        return Podium::NoVotes;
    }
    sort_scores(&mut voted);
    voted.truncate(PODIUM_SIZE);
    Podium::Ranked(RankingView::build(voted, PODIUM_SIZE, true).entries)
}

/// `最終更新：<time>` line, given an already-localised timestamp.
pub fn updated_at_line(local_time: &str) -> String {
    format!("最終更新：{local_time}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str, avg: f64, count: u32) -> ScoreStat {
        ScoreStat { name: name.into(), avg, count, ..ScoreStat::default() }
    }

    fn votes(name: &str, votes: u32) -> VisualStat {
        VisualStat { name: name.into(), votes }
    }

    #[test]
    fn score_order_breaks_ties_on_count() {
        let view = score_ranking(
            vec![stat("B", 8.0, 3), stat("A", 9.0, 1), stat("C", 8.0, 5)],
            DEFAULT_KEEP_TOP_N,
            false,
        );
        let names: Vec<_> = view.entries.iter().map(|e| e.record.name.as_str()).collect();
        assert_eq!(names, ["A", "C", "B"]);
        assert_eq!(view.entries[0].medal, Medal::Gold);
        assert!(view.entries[0].medal.has_crown());
        assert_eq!(view.entries[0].medal.css_class(), Some("top1"));
        assert_eq!(view.entries[2].medal.badge(), "🥉");
    }

    #[test]
    fn visual_order_breaks_ties_on_name() {
        let view = visual_ranking_by(
            vec![votes("b", 2), votes("C", 5), votes("a", 2)],
            DEFAULT_KEEP_TOP_N,
            false,
            default_collation,
        );
        let names: Vec<_> = view.entries.iter().map(|e| e.record.name.as_str()).collect();
        assert_eq!(names, ["C", "a", "b"]);
    }

    #[test]
    fn plain_ordinal_past_podium() {
        assert_eq!(Medal::for_rank(3), Medal::Plain(4));
        assert_eq!(Medal::for_rank(3).badge(), "4");
        assert_eq!(Medal::for_rank(9).css_class(), None);
    }

    #[test]
    fn eight_records_collapse_to_five() {
        let records: Vec<_> = (0..8).map(|i| stat(&format!("s{i}"), 10.0 - i as f64, 1)).collect();

        let collapsed = score_ranking(records.clone(), 5, false);
        assert_eq!(collapsed.visible().count(), 5);
        assert_eq!(collapsed.hidden_count(), 3);
        let toggle = collapsed.toggle.unwrap();
        assert_eq!(toggle.label(), "さらに表示（3 件）");

        let expanded = score_ranking(records.clone(), 5, true);
        assert_eq!(expanded.visible().count(), 8);
        assert_eq!(expanded.toggle.unwrap().label(), "閉じる");

        let recollapsed = score_ranking(records, 5, false);
        assert_eq!(recollapsed, collapsed);
    }

    #[test]
    fn no_toggle_at_or_below_threshold() {
        let records: Vec<_> = (0..5).map(|i| votes(&format!("v{i}"), i)).collect();
        let view = visual_ranking_by(records, 5, false, default_collation);
        assert!(view.toggle.is_none());
        assert_eq!(view.hidden_count(), 0);
        assert!(RankingView::<VisualStat>::build(Vec::new(), 5, false).is_empty());
    }

    #[test]
    fn podium_distinguishes_empty_cases() {
        assert_eq!(podium(&[]), Podium::NoData);
        assert_eq!(podium(&[stat("A", 0.0, 0)]).empty_message(), Some("まだ投票がありません"));

        let Podium::Ranked(top) = podium(&[
            stat("A", 6.0, 2),
            stat("B", 0.0, 0),
            stat("C", 9.0, 1),
            stat("D", 7.0, 4),
            stat("E", 5.0, 1),
        ]) else {
            panic!("expected ranked podium");
        };
        let names: Vec<_> = top.iter().map(|e| e.record.name.as_str()).collect();
        assert_eq!(names, ["C", "D", "A"]);
    }

    #[test]
    fn updated_at_is_prefixed() {
        assert_eq!(updated_at_line("2025/10/18 14:00:00"), "最終更新：2025/10/18 14:00:00");
    }
}
