//! Vote state, rankings, the voting-open gate and the submission flow.
//!
//! Nothing here touches the DOM; the wasm front end drives a `Session`
//! through these types and renders what they return.

pub mod catalog;
pub mod error;
pub mod gate;
pub mod ranking;
pub mod session;
pub mod store;
pub mod submit;

pub use catalog::{CatalogSort, LatestResult};
pub use error::{Rejection, VoteError, classify_rejection};
pub use gate::{Affordances, Channels, FallbackPolicy, GateState, VotingGate, parse_vote_open};
pub use ranking::{ListToggle, Medal, Podium, RankedEntry, RankingView};
pub use session::{
    BootReport, GateRefresh, RankingList, Session, SessionConfig, SubmitReceipt, Surface,
    arrow_delta, bootstrap, load_catalog, load_latest, refresh_gate, refresh_stats,
    refresh_visual_stats, save_settings, submit_ballot, toggle_open,
};
pub use store::{MAX_SCORE, VoteStore, sake_key};
pub use submit::{BallotEntry, SubmitMode, Voter};
