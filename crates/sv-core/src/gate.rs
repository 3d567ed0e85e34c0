//! Voting-Open Gate.
//!
//! Caches the server's `voteOpen` flag and the per-channel flags, and turns
//! them into one `Affordances` value the UI applies in a single pass.

use sv_api_types::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Closed,
}

impl GateState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Admin page status label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "受付中",
            Self::Closed => "締切",
        }
    }

    /// Admin toggle button text: the action the button performs.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Open => "締切にする",
            Self::Closed => "受付にする",
        }
    }
}

/// Only an explicit `FALSE` (trimmed, any case) closes voting.
pub fn parse_vote_open(raw: Option<&str>) -> GateState {
    match raw {
        Some(v) if v.trim().eq_ignore_ascii_case("false") => GateState::Closed,
        _ => GateState::Open,
    }
}

/// State assumed when settings cannot be fetched and nothing is known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    #[default]
    FailOpen,
    FailClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub sake: bool,
    pub visual: bool,
}

impl Default for Channels {
    fn default() -> Self {
        Self { sake: true, visual: true }
    }
}

impl From<&Settings> for Channels {
    fn from(settings: &Settings) -> Self {
        Self { sake: settings.sake_vote_allowed(), visual: settings.visual_vote_allowed() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VotingGate {
    known: Option<GateState>,
    channels: Channels,
    policy: FallbackPolicy,
    last_updated: Option<String>,
}

impl VotingGate {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn state(&self) -> GateState {
        self.known.unwrap_or(match self.policy {
            FallbackPolicy::FailOpen => GateState::Open,
            FallbackPolicy::FailClosed => GateState::Closed,
        })
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    /// Adopt authoritative settings.
    pub fn observe(&mut self, settings: &Settings) -> GateState {
        let state = parse_vote_open(settings.vote_open.as_deref());
        self.known = Some(state);
        self.channels = Channels::from(settings);
        self.last_updated.clone_from(&settings.last_updated);
        state
    }

    /// Settings could not be fetched; keep whatever is cached.
    pub fn observe_failure(&mut self) -> GateState {
        self.state()
    }

    /// The server refused a write because voting is closed.
    pub fn mark_closed(&mut self) {
        self.known = Some(GateState::Closed);
    }
}

/// Everything the gate controls, resolved at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub submit_enabled: bool,
    pub stars_enabled: bool,
    pub visual_enabled: bool,
    pub closed_notice: bool,
    pub busy: bool,
}

impl Affordances {
    pub fn resolve(gate: &VotingGate, has_voter: bool, has_ballot: bool, busy: bool) -> Self {
        let open = gate.is_open();
        let channels = gate.channels();
        Self {
            submit_enabled: open && !busy && has_voter && has_ballot,
            stars_enabled: open && channels.sake,
            visual_enabled: open && channels.visual,
            closed_notice: !open,
            busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(vote_open: Option<&str>) -> Settings {
        Settings { vote_open: vote_open.map(str::to_owned), ..Settings::default() }
    }

    #[test]
    fn only_explicit_false_closes() {
        assert_eq!(parse_vote_open(Some("FALSE")), GateState::Closed);
        assert_eq!(parse_vote_open(Some("  false ")), GateState::Closed);
        assert_eq!(parse_vote_open(Some("False")), GateState::Closed);
        assert_eq!(parse_vote_open(Some("TRUE")), GateState::Open);
        assert_eq!(parse_vote_open(Some("no")), GateState::Open);
        assert_eq!(parse_vote_open(Some("")), GateState::Open);
        assert_eq!(parse_vote_open(None), GateState::Open);
    }

    #[test]
    fn failure_keeps_last_known_state() {
        let mut gate = VotingGate::default();
        assert_eq!(gate.observe(&settings(Some("FALSE"))), GateState::Closed);
        assert_eq!(gate.observe_failure(), GateState::Closed);

        gate.observe(&settings(Some("TRUE")));
        assert_eq!(gate.observe_failure(), GateState::Open);
    }

    #[test]
    fn failure_without_history_uses_policy() {
        assert_eq!(VotingGate::new(FallbackPolicy::FailOpen).observe_failure(), GateState::Open);
        let mut strict = VotingGate::new(FallbackPolicy::FailClosed);
        assert_eq!(strict.observe_failure(), GateState::Closed);
        strict.observe(&settings(None));
        assert!(strict.is_open());
    }

    #[test]
    fn closed_gate_disables_every_control() {
        let mut gate = VotingGate::default();
        gate.observe(&settings(Some("FALSE")));
        let a = Affordances::resolve(&gate, true, true, false);
        assert!(!a.submit_enabled && !a.stars_enabled && !a.visual_enabled);
        assert!(a.closed_notice);
    }

    #[test]
    fn channel_flags_narrow_inputs() {
        let mut gate = VotingGate::default();
        gate.observe(&Settings {
            allow_visual_vote: Some(serde_json::json!("FALSE")),
            ..Settings::default()
        });
        let a = Affordances::resolve(&gate, true, false, false);
        assert!(a.stars_enabled);
        assert!(!a.visual_enabled);
        assert!(!a.submit_enabled);
    }

    #[test]
    fn labels_describe_state_and_action() {
        assert_eq!(GateState::Open.label(), "受付中");
        assert_eq!(GateState::Open.toggle_label(), "締切にする");
        assert_eq!(GateState::Closed.toggle_label(), "受付にする");
    }
}
