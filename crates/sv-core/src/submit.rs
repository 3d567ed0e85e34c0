//! Ballot validation and serialisation.

use crate::error::VoteError;
use crate::gate::Channels;
use crate::store::VoteStore;
use sv_api_types::{Ballot, SakeItem, VisualChoice, VoteAction};

/// The identity a ballot is cast under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub id: String,
    pub name: String,
}

/// How a ballot leaves the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMode {
    /// One `payload` POST carrying every score and the visual choice.
    #[default]
    Ballot,
    /// One `score` / `visual_vote` action per entry.
    PerItem,
}

/// Local checks, in the order the user sees them.
pub fn validate(
    voter: Option<&Voter>,
    store: &VoteStore,
    channels: Channels,
) -> Result<(), VoteError> {
    if voter.is_none() {
        return Err(VoteError::NoVoterSelected);
    }
    let scores = channels.sake && store.has_any_score();
    let visual = channels.visual && store.has_visual_vote();
    if !scores && !visual {
        return Err(VoteError::EmptyBallot);
    }
    Ok(())
}

pub fn build_ballot(
    voter: Option<&Voter>,
    store: &VoteStore,
    channels: Channels,
) -> Result<Ballot, VoteError> {
    validate(voter, store, channels)?;
    let voter = voter.ok_or(VoteError::NoVoterSelected)?;
    Ok(Ballot {
        nickname: voter.name.clone(),
        member_id: voter.id.clone(),
        scores: if channels.sake { store.nonzero_scores() } else { Default::default() },
        visual: store
            .visual()
            .filter(|_| channels.visual)
            .map(|sake_index| VisualChoice { sake_index }),
    })
}

/// The store entry a per-item action was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotEntry {
    Score { index: usize, score: u8 },
    Visual { index: usize },
}

/// Per-item form of the same ballot; actions are keyed by sake name.
pub fn build_actions(
    voter: Option<&Voter>,
    store: &VoteStore,
    channels: Channels,
    items: &[SakeItem],
) -> Result<Vec<(BallotEntry, VoteAction)>, VoteError> {
    validate(voter, store, channels)?;
    let voter = voter.ok_or(VoteError::NoVoterSelected)?;
    let name_of = |idx: usize| {
        items.get(idx).map(|item| item.name.clone()).ok_or(VoteError::UnknownSake(idx))
    };

    let mut actions = Vec::new();
    if channels.sake {
        for idx in (0..store.len()).filter(|&i| store.score(i) > 0 && !store.is_excluded(i)) {
            let score = store.score(idx);
            actions.push((
                BallotEntry::Score { index: idx, score },
                VoteAction::Score { member: voter.name.clone(), sake: name_of(idx)?, score },
            ));
        }
    }
    if let Some(idx) = store.visual().filter(|_| channels.visual) {
        actions.push((
            BallotEntry::Visual { index: idx },
            VoteAction::VisualVote { member: voter.name.clone(), sake: name_of(idx)? },
        ));
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter() -> Voter {
        Voter { id: "7".into(), name: "Aki".into() }
    }

    fn items() -> Vec<SakeItem> {
        ["Dassai", "Kubota"]
            .iter()
            .map(|name| SakeItem { name: (*name).into(), ..SakeItem::default() })
            .collect()
    }

    #[test]
    fn missing_voter_is_reported_before_empty_ballot() {
        let store = VoteStore::new(2);
        assert_eq!(validate(None, &store, Channels::default()), Err(VoteError::NoVoterSelected));
        assert_eq!(
            validate(Some(&voter()), &store, Channels::default()),
            Err(VoteError::EmptyBallot)
        );
    }

    #[test]
    fn ballot_carries_nonzero_scores_and_visual() {
        let mut store = VoteStore::new(2);
        store.set_score(1, 9).unwrap();
        store.toggle_visual(0).unwrap();

        let ballot = build_ballot(Some(&voter()), &store, Channels::default()).unwrap();
        assert_eq!(ballot.nickname, "Aki");
        assert_eq!(ballot.member_id, "7");
        assert_eq!(ballot.scores.len(), 1);
        assert_eq!(ballot.scores.get("s1"), Some(&9));
        assert_eq!(ballot.visual, Some(VisualChoice { sake_index: 0 }));
    }

    #[test]
    fn closed_channel_is_left_out() {
        let mut store = VoteStore::new(2);
        store.toggle_visual(1).unwrap();
        let no_visual = Channels { sake: true, visual: false };

        assert_eq!(build_ballot(Some(&voter()), &store, no_visual), Err(VoteError::EmptyBallot));

        store.set_score(0, 3).unwrap();
        let ballot = build_ballot(Some(&voter()), &store, no_visual).unwrap();
        assert_eq!(ballot.visual, None);
    }

    #[test]
    fn per_item_actions_use_sake_names() {
        let mut store = VoteStore::new(2);
        store.set_score(0, 6).unwrap();
        store.toggle_visual(1).unwrap();

        let actions = build_actions(Some(&voter()), &store, Channels::default(), &items()).unwrap();
        assert_eq!(
            actions,
            vec![
                (
                    BallotEntry::Score { index: 0, score: 6 },
                    VoteAction::Score { member: "Aki".into(), sake: "Dassai".into(), score: 6 },
                ),
                (
                    BallotEntry::Visual { index: 1 },
                    VoteAction::VisualVote { member: "Aki".into(), sake: "Kubota".into() },
                ),
            ]
        );
    }
}
