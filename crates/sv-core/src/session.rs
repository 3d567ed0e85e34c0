//! Page session: every piece of mutable page state in one place.
//!
//! The UI holds a `Session` behind `Rc<RefCell<_>>` and hands `&RefCell` to
//! the async flows below. Each flow borrows only between awaits, so event
//! handlers that fire while a request is pending never hit a borrow panic.

use crate::catalog::LatestResult;
use crate::error::VoteError;
use crate::gate::{Affordances, Channels, FallbackPolicy, GateState, VotingGate};
use crate::ranking::{self, DEFAULT_KEEP_TOP_N, Podium, RankingView};
use crate::store::VoteStore;
use crate::submit::{self, BallotEntry, SubmitMode, Voter};
use futures::join;
use std::cell::RefCell;
use std::cmp::Ordering;
use sv_api_types::{
    AdminCommand, CatalogItem, Member, SakeItem, ScoreStat, ScoreStatsResponse, VisualStat,
    VisualStatsResponse, WriteRequest,
};
use sv_gateway::{
    Gateway, fetch_catalog, fetch_latest_ranking, fetch_members, fetch_sakes, fetch_settings,
    fetch_stats, fetch_visual_stats, send_write,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub keep_top_n: usize,
    pub fallback: FallbackPolicy,
    pub submit_mode: SubmitMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_top_n: DEFAULT_KEEP_TOP_N,
            fallback: FallbackPolicy::default(),
            submit_mode: SubmitMode::default(),
        }
    }
}

/// Which page the session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Voting,
    Admin,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingList {
    Scores,
    Visual,
}

/// Arrow keys on a star group: right/up raise, left/down lower.
pub fn arrow_delta(key: &str) -> Option<i8> {
    match key {
        "ArrowRight" | "ArrowUp" => Some(1),
        "ArrowLeft" | "ArrowDown" => Some(-1),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    sakes: Vec<SakeItem>,
    members: Vec<Member>,
    voter: Option<Voter>,
    store: VoteStore,
    gate: VotingGate,
    stats: ScoreStatsResponse,
    visual_stats: VisualStatsResponse,
    scores_expanded: bool,
    visual_expanded: bool,
    submitting: bool,
    saving: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, gate: VotingGate::new(config.fallback), ..Self::default() }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sakes(&self) -> &[SakeItem] {
        &self.sakes
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn voter(&self) -> Option<&Voter> {
        self.voter.as_ref()
    }

    pub fn store(&self) -> &VoteStore {
        &self.store
    }

    pub fn gate(&self) -> &VotingGate {
        &self.gate
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    // ── Master data ──

    pub fn load_sakes(&mut self, sakes: Vec<SakeItem>) {
        self.store.resize(sakes.len());
        self.sakes = sakes;
        let voter_id = self.voter.as_ref().map(|v| v.id.clone());
        self.store.apply_voter(voter_id.as_deref(), &self.sakes);
    }

    pub fn load_members(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    /// Select the voter by member key; an empty or unknown key clears it.
    /// Returns the indices now excluded as the voter's own exhibits.
    pub fn select_voter(&mut self, key: &str) -> Vec<usize> {
        self.voter = self
            .members
            .iter()
            .find(|m| !key.is_empty() && m.key() == key)
            .map(|m| Voter { id: m.key().to_owned(), name: m.name.clone() });
        let voter_id = self.voter.as_ref().map(|v| v.id.clone());
        self.store.apply_voter(voter_id.as_deref(), &self.sakes)
    }

    /// Name shown next to the confirm select.
    pub fn voter_label(&self) -> &str {
        self.voter.as_ref().map_or("未選択", |v| v.name.as_str())
    }

    fn admin_name(&self) -> Result<String, VoteError> {
        let voter = self.voter.as_ref().ok_or(VoteError::NoVoterSelected)?;
        self.members
            .iter()
            .find(|m| m.key() == voter.id && m.is_admin())
            .map(|m| m.name.clone())
            .ok_or_else(|| VoteError::NotAdmin(voter.name.clone()))
    }

    pub fn is_admin_selected(&self) -> bool {
        self.admin_name().is_ok()
    }

    // ── Ballot editing ──

    pub fn click_star(&mut self, index: usize, value: u8) -> Result<u8, VoteError> {
        if !self.affordances().stars_enabled {
            return Err(VoteError::VotingClosed);
        }
        self.store.set_score(index, value)
    }

    pub fn key_star(&mut self, index: usize, delta: i8) -> Result<u8, VoteError> {
        if !self.affordances().stars_enabled {
            return Err(VoteError::VotingClosed);
        }
        self.store.step_score(index, delta)
    }

    pub fn clear_item(&mut self, index: usize) -> Result<(), VoteError> {
        self.store.clear_score(index)
    }

    pub fn toggle_visual(&mut self, index: usize) -> Result<Option<usize>, VoteError> {
        if !self.affordances().visual_enabled {
            return Err(VoteError::VotingClosed);
        }
        self.store.toggle_visual(index)
    }

    pub fn clear_ballot(&mut self) {
        self.store.clear_all();
    }

    pub fn affordances(&self) -> Affordances {
        let has_ballot =
            submit::validate(self.voter.as_ref(), &self.store, self.gate.channels()).is_ok();
        Affordances::resolve(&self.gate, self.voter.is_some(), has_ballot, self.submitting)
    }

    /// Outbound writes, each with the store entry it records in per-item mode.
    fn write_requests(&self) -> Result<Vec<(Option<BallotEntry>, WriteRequest)>, VoteError> {
        let channels = self.gate.channels();
        Ok(match self.config.submit_mode {
            SubmitMode::Ballot => vec![(
                None,
                WriteRequest::Ballot(submit::build_ballot(
                    self.voter.as_ref(),
                    &self.store,
                    channels,
                )?),
            )],
            SubmitMode::PerItem => {
                submit::build_actions(self.voter.as_ref(), &self.store, channels, &self.sakes)?
                    .into_iter()
                    .map(|(entry, action)| (Some(entry), WriteRequest::Vote(action)))
                    .collect()
            }
        })
    }

    // ── In-flight guards ──

    fn begin_submit(&mut self) -> Result<(), VoteError> {
        if self.submitting {
            return Err(VoteError::AlreadySubmitting);
        }
        self.submitting = true;
        Ok(())
    }

    fn begin_saving(&mut self) -> Result<(), VoteError> {
        if self.saving {
            return Err(VoteError::AlreadySubmitting);
        }
        self.saving = true;
        Ok(())
    }

    // ── Rankings ──

    pub fn is_expanded(&self, list: RankingList) -> bool {
        match list {
            RankingList::Scores => self.scores_expanded,
            RankingList::Visual => self.visual_expanded,
        }
    }

    /// Flip a list's expansion and return the new state.
    pub fn toggle_expanded(&mut self, list: RankingList) -> bool {
        let flag = match list {
            RankingList::Scores => &mut self.scores_expanded,
            RankingList::Visual => &mut self.visual_expanded,
        };
        *flag = !*flag;
        *flag
    }

    pub fn score_view(&self) -> RankingView<ScoreStat> {
        ranking::score_ranking(
            self.stats.items.clone(),
            self.config.keep_top_n,
            self.scores_expanded,
        )
    }

    pub fn visual_view_by<F>(&self, collate: F) -> RankingView<VisualStat>
    where
        F: Fn(&str, &str) -> Ordering,
    {
        ranking::visual_ranking_by(
            self.visual_stats.items.clone(),
            self.config.keep_top_n,
            self.visual_expanded,
            collate,
        )
    }

    pub fn podium(&self) -> Podium {
        ranking::podium(&self.stats.items)
    }

    pub fn stats_updated_at(&self) -> Option<&str> {
        self.stats.updated_at.as_deref()
    }

    pub fn visual_updated_at(&self) -> Option<&str> {
        self.visual_stats.updated_at.as_deref()
    }
}

// ── Async flows ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRefresh {
    pub state: GateState,
    pub channels: Channels,
    /// Set when settings could not be fetched and the cached state was used.
    pub error: Option<VoteError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub gate: GateRefresh,
    /// Rankings that could not be loaded; the page carries on without them.
    pub problems: Vec<(RankingList, VoteError)>,
}

impl BootReport {
    pub fn failed(&self, list: RankingList) -> Option<&VoteError> {
        self.problems.iter().find(|(l, _)| *l == list).map(|(_, e)| e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub requests_sent: usize,
    /// The votes went through but the follow-up ranking refresh failed.
    pub refresh_error: Option<VoteError>,
}

/// Initial load. Master data failures are fatal; ranking failures are
/// collected in the report and the page carries on.
pub async fn bootstrap<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
    surface: Surface,
) -> Result<BootReport, VoteError> {
    let mut problems = Vec::new();
    match surface {
        Surface::Voting => {
            let (sakes, members, stats) =
                join!(fetch_sakes(gw), fetch_members(gw, true), fetch_stats(gw));
            let mut s = session.borrow_mut();
            s.load_sakes(sakes?);
            s.load_members(members?);
            match stats {
                Ok(stats) => s.stats = stats,
                Err(e) => problems.push((RankingList::Scores, e.into())),
            }
        }
        Surface::Admin => {
            let (members, stats, visual) =
                join!(fetch_members(gw, false), fetch_stats(gw), fetch_visual_stats(gw));
            let mut s = session.borrow_mut();
            s.load_members(members?);
            match stats {
                Ok(stats) => s.stats = stats,
                Err(e) => problems.push((RankingList::Scores, e.into())),
            }
            match visual {
                Ok(visual) => s.visual_stats = visual,
                Err(e) => problems.push((RankingList::Visual, e.into())),
            }
        }
        Surface::Results => {
            let (stats, visual) = join!(fetch_stats(gw), fetch_visual_stats(gw));
            let mut s = session.borrow_mut();
            match stats {
                Ok(stats) => s.stats = stats,
                Err(e) => problems.push((RankingList::Scores, e.into())),
            }
            match visual {
                Ok(visual) => s.visual_stats = visual,
                Err(e) => problems.push((RankingList::Visual, e.into())),
            }
        }
    }
    let gate = refresh_gate(session, gw).await;
    Ok(BootReport { gate, problems })
}

/// Re-read settings. A failed read falls back to the cached state.
pub async fn refresh_gate<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> GateRefresh {
    let fetched = fetch_settings(gw).await;
    let mut s = session.borrow_mut();
    let (state, error) = match fetched {
        Ok(settings) => (s.gate.observe(&settings), None),
        Err(e) => (s.gate.observe_failure(), Some(e.into())),
    };
    GateRefresh { state, channels: s.gate.channels(), error }
}

pub async fn refresh_stats<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> Result<(), VoteError> {
    let stats = fetch_stats(gw).await?;
    session.borrow_mut().stats = stats;
    Ok(())
}

pub async fn refresh_visual_stats<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> Result<(), VoteError> {
    let visual = fetch_visual_stats(gw).await?;
    session.borrow_mut().visual_stats = visual;
    Ok(())
}

/// Validate, re-check the gate, post, then clear and refresh rankings.
pub async fn submit_ballot<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> Result<SubmitReceipt, VoteError> {
    session.borrow_mut().begin_submit()?;
    let outcome = submit_guarded(session, gw).await;
    session.borrow_mut().submitting = false;
    outcome
}

async fn submit_guarded<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> Result<SubmitReceipt, VoteError> {
    {
        let s = session.borrow();
        submit::validate(s.voter.as_ref(), &s.store, s.gate.channels())?;
    }

    if !refresh_gate(session, gw).await.state.is_open() {
        return Err(VoteError::VotingClosed);
    }

    // Built after the gate check so edits made meanwhile are included.
    let requests = session.borrow().write_requests()?;
    for (sent, (_, request)) in requests.iter().enumerate() {
        if let Err(e) = send_write(gw, request).await {
            let err = VoteError::from(e);
            let mut s = session.borrow_mut();
            // Entries the server already took must not be posted twice.
            for entry in requests[..sent].iter().filter_map(|(entry, _)| *entry) {
                s.store.forget_sent(entry);
            }
            if err.closes_voting() {
                s.gate.mark_closed();
            }
            return Err(err);
        }
    }

    session.borrow_mut().store.clear_all();
    let refresh_error = refresh_stats(session, gw).await.err();
    Ok(SubmitReceipt { requests_sent: requests.len(), refresh_error })
}

/// Catalog rows for the public list page.
pub async fn load_catalog<G: Gateway + ?Sized>(gw: &G) -> Result<Vec<CatalogItem>, VoteError> {
    Ok(fetch_catalog(gw).await?)
}

/// Placings of the most recently published round.
pub async fn load_latest<G: Gateway + ?Sized>(gw: &G) -> Result<LatestResult, VoteError> {
    Ok(fetch_latest_ranking(gw).await?.into())
}

/// Flip the server-side open flag, then re-read settings.
pub async fn toggle_open<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
) -> Result<GateRefresh, VoteError> {
    session.borrow_mut().begin_saving()?;
    let outcome = match send_write(gw, &WriteRequest::ToggleOpen).await {
        Ok(_) => Ok(refresh_gate(session, gw).await),
        Err(e) => Err(VoteError::from(e)),
    };
    session.borrow_mut().saving = false;
    outcome
}

/// Store the channel flags on behalf of the selected administrator.
pub async fn save_settings<G: Gateway + ?Sized>(
    session: &RefCell<Session>,
    gw: &G,
    channels: Channels,
) -> Result<GateRefresh, VoteError> {
    let member = session.borrow().admin_name()?;
    session.borrow_mut().begin_saving()?;
    let request = WriteRequest::Admin(AdminCommand::UpdateSettings {
        member,
        allow_sake_vote: channels.sake,
        allow_visual_vote: channels.visual,
    });
    let outcome = match send_write(gw, &request).await {
        Ok(_) => Ok(refresh_gate(session, gw).await),
        Err(e) => Err(VoteError::from(e)),
    };
    session.borrow_mut().saving = false;
    outcome
}
