//! Vote State Store.
//!
//! Scores are kept per sake index (`s{idx}` on the wire), 0 meaning unset.
//! Items exhibited by the active voter are excluded: their score is held at
//! 0, they cannot be the visual selection, and writes to them are refused.

use crate::error::VoteError;
use crate::submit::BallotEntry;
use std::collections::{BTreeMap, BTreeSet};
use sv_api_types::SakeItem;

pub const MAX_SCORE: u8 = 10;

pub fn sake_key(index: usize) -> String {
    format!("s{index}")
}

pub fn parse_sake_key(key: &str) -> Option<usize> {
    key.strip_prefix('s')?.parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteStore {
    scores: Vec<u8>,
    visual: Option<usize>,
    excluded: BTreeSet<usize>,
}

impl VoteStore {
    pub fn new(len: usize) -> Self {
        Self { scores: vec![0; len], ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Adopt a freshly fetched item list. Scores restart at 0 and the visual
    /// selection survives only if its index still exists. Exclusions are
    /// dropped; call `apply_voter` again afterwards.
    pub fn resize(&mut self, len: usize) {
        self.scores = vec![0; len];
        self.excluded.clear();
        if self.visual.is_some_and(|idx| idx >= len) {
            self.visual = None;
        }
    }

    pub fn score(&self, index: usize) -> u8 {
        self.scores.get(index).copied().unwrap_or(0)
    }

    pub fn visual(&self) -> Option<usize> {
        self.visual
    }

    pub fn is_excluded(&self, index: usize) -> bool {
        self.excluded.contains(&index)
    }

    /// Zero every score; the visual selection is kept.
    pub fn reset_scores(&mut self) {
        self.scores.iter_mut().for_each(|s| *s = 0);
    }

    /// Zero every score and drop the visual selection.
    pub fn clear_all(&mut self) {
        self.reset_scores();
        self.visual = None;
    }

    fn writable(&self, index: usize) -> Result<(), VoteError> {
        if index >= self.scores.len() {
            return Err(VoteError::UnknownSake(index));
        }
        if self.excluded.contains(&index) {
            return Err(VoteError::SelfVote(index));
        }
        Ok(())
    }

    /// Star click: choosing the stored value again clears it.
    pub fn set_score(&mut self, index: usize, value: u8) -> Result<u8, VoteError> {
        self.writable(index)?;
        if value > MAX_SCORE {
            return Err(VoteError::ScoreOutOfRange(value));
        }
        let slot = &mut self.scores[index];
        *slot = if *slot == value { 0 } else { value };
        Ok(*slot)
    }

    /// Arrow-key adjustment, clamped to `0..=MAX_SCORE`.
    pub fn step_score(&mut self, index: usize, delta: i8) -> Result<u8, VoteError> {
        self.writable(index)?;
        let slot = &mut self.scores[index];
        *slot = slot.saturating_add_signed(delta).min(MAX_SCORE);
        Ok(*slot)
    }

    pub fn clear_score(&mut self, index: usize) -> Result<(), VoteError> {
        let slot = self.scores.get_mut(index).ok_or(VoteError::UnknownSake(index))?;
        *slot = 0;
        Ok(())
    }

    /// Drop an entry that has already been recorded by the server, unless it
    /// was edited since.
    pub fn forget_sent(&mut self, entry: BallotEntry) {
        match entry {
            BallotEntry::Score { index, score } => {
                if let Some(slot) = self.scores.get_mut(index).filter(|s| **s == score) {
                    *slot = 0;
                }
            }
            BallotEntry::Visual { index } => {
                if self.visual == Some(index) {
                    self.visual = None;
                }
            }
        }
    }

    /// Image click: select, or deselect when already selected.
    pub fn toggle_visual(&mut self, index: usize) -> Result<Option<usize>, VoteError> {
        self.writable(index)?;
        self.visual = if self.visual == Some(index) { None } else { Some(index) };
        Ok(self.visual)
    }

    pub fn has_any_score(&self) -> bool {
        self.scores.iter().any(|&s| s > 0)
    }

    pub fn has_visual_vote(&self) -> bool {
        self.visual.is_some()
    }

    pub fn nonzero_scores(&self) -> BTreeMap<String, u8> {
        self.scores
            .iter()
            .enumerate()
            .filter(|&(idx, &s)| s > 0 && !self.excluded.contains(&idx))
            .map(|(idx, &s)| (sake_key(idx), s))
            .collect()
    }

    /// Recompute self-vote exclusion for `voter_id` and return the excluded
    /// indices.
    pub fn apply_voter(&mut self, voter_id: Option<&str>, items: &[SakeItem]) -> Vec<usize> {
        self.excluded.clear();
        let Some(voter_id) = voter_id.filter(|id| !id.is_empty()) else {
            return Vec::new();
        };
        for (idx, item) in items.iter().enumerate().take(self.scores.len()) {
            if item.is_exhibited_by(voter_id) {
                self.excluded.insert(idx);
                self.scores[idx] = 0;
                if self.visual == Some(idx) {
                    self.visual = None;
                }
            }
        }
        self.excluded.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<SakeItem> {
        ["Dassai", "Kubota", "Hakkaisan"]
            .iter()
            .enumerate()
            .map(|(i, name)| SakeItem {
                name: (*name).to_owned(),
                exhibitor_member_id: Some(format!("m{i}")),
                ..SakeItem::default()
            })
            .collect()
    }

    #[test]
    fn sake_keys_round_trip() {
        assert_eq!(sake_key(7), "s7");
        assert_eq!(parse_sake_key("s7"), Some(7));
        assert_eq!(parse_sake_key("x7"), None);
        assert_eq!(parse_sake_key("s"), None);
    }

    #[test]
    fn same_star_twice_clears_score() {
        let mut store = VoteStore::new(3);
        for value in 1..=MAX_SCORE {
            assert_eq!(store.set_score(0, value).unwrap(), value);
            assert_eq!(store.set_score(0, value).unwrap(), 0);
        }
        store.set_score(0, 4).unwrap();
        assert_eq!(store.set_score(0, 9).unwrap(), 9);
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let mut store = VoteStore::new(1);
        assert_eq!(store.set_score(0, 11), Err(VoteError::ScoreOutOfRange(11)));
        assert_eq!(store.set_score(1, 5), Err(VoteError::UnknownSake(1)));
        assert_eq!(store.score(0), 0);
    }

    #[test]
    fn arrow_keys_clamp() {
        let mut store = VoteStore::new(1);
        assert_eq!(store.step_score(0, -1).unwrap(), 0);
        store.set_score(0, 10).unwrap();
        assert_eq!(store.step_score(0, 1).unwrap(), 10);
        assert_eq!(store.step_score(0, -1).unwrap(), 9);
    }

    #[test]
    fn visual_selection_toggles() {
        let mut store = VoteStore::new(3);
        assert_eq!(store.toggle_visual(1).unwrap(), Some(1));
        assert_eq!(store.toggle_visual(2).unwrap(), Some(2));
        assert_eq!(store.toggle_visual(2).unwrap(), None);
        assert!(!store.has_visual_vote());
    }

    #[test]
    fn voter_change_excludes_own_exhibit() {
        let items = items();
        let mut store = VoteStore::new(items.len());
        store.set_score(1, 8).unwrap();
        store.set_score(2, 5).unwrap();
        store.toggle_visual(1).unwrap();

        assert_eq!(store.apply_voter(Some("m1"), &items), vec![1]);
        assert_eq!(store.score(1), 0);
        assert_eq!(store.visual(), None);
        assert_eq!(store.score(2), 5);

        assert_eq!(store.set_score(1, 3), Err(VoteError::SelfVote(1)));
        assert_eq!(store.step_score(1, 1), Err(VoteError::SelfVote(1)));
        assert_eq!(store.toggle_visual(1), Err(VoteError::SelfVote(1)));
        assert_eq!(store.score(1), 0);

        // Switching voter lifts the previous exclusion.
        assert_eq!(store.apply_voter(Some("m2"), &items), vec![2]);
        assert_eq!(store.set_score(1, 3).unwrap(), 3);
        assert_eq!(store.score(2), 0);
        assert!(store.apply_voter(None, &items).is_empty());
    }

    #[test]
    fn resets_differ_on_visual() {
        let mut store = VoteStore::new(2);
        store.set_score(0, 6).unwrap();
        store.toggle_visual(1).unwrap();

        store.reset_scores();
        assert!(!store.has_any_score());
        assert_eq!(store.visual(), Some(1));

        store.clear_all();
        assert!(!store.has_visual_vote());
    }

    #[test]
    fn forgetting_sent_entries_keeps_later_edits() {
        let mut store = VoteStore::new(3);
        store.set_score(0, 6).unwrap();
        store.set_score(1, 4).unwrap();
        store.toggle_visual(2).unwrap();

        store.forget_sent(BallotEntry::Score { index: 0, score: 6 });
        store.forget_sent(BallotEntry::Score { index: 1, score: 9 });
        store.forget_sent(BallotEntry::Visual { index: 2 });

        assert_eq!(store.score(0), 0);
        assert_eq!(store.score(1), 4);
        assert!(!store.has_visual_vote());
    }

    #[test]
    fn resize_drops_stale_visual() {
        let mut store = VoteStore::new(4);
        store.toggle_visual(3).unwrap();
        store.resize(5);
        assert_eq!(store.visual(), Some(3));
        store.resize(2);
        assert_eq!(store.visual(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn nonzero_scores_are_keyed() {
        let mut store = VoteStore::new(3);
        store.set_score(0, 7).unwrap();
        store.set_score(2, 10).unwrap();
        let scores = store.nonzero_scores();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get("s0"), Some(&7));
        assert_eq!(scores.get("s2"), Some(&10));
    }
}
