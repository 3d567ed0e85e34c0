use sv_gateway::GatewayError;
use thiserror::Error;

pub const MSG_VOTING_CLOSED: &str =
    "現在、投票受付は締め切られています。受付期間外のため送信できません。";
const MSG_NO_VOTER: &str = "参加者を選択してください。";
const MSG_EMPTY_BALLOT: &str = "採点またはビジュアル投票を行ってください。";
const MSG_SHEET_NOT_FOUND: &str = "スプレッドシートが見つかりません。管理者に連絡してください。";
const MSG_NETWORK: &str = "通信エラーが発生しました。ネットワークをご確認ください。";

/// Known server error tokens, matched case-insensitively by substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    VotingClosed,
    NicknameRequired,
    SheetNotFound,
    Other,
}

pub fn classify_rejection(text: &str) -> Rejection {
    let lower = text.to_lowercase();
    if lower.contains("voting closed") {
        Rejection::VotingClosed
    } else if lower.contains("nickname required") {
        Rejection::NicknameRequired
    } else if lower.contains("sheet not found") {
        Rejection::SheetNotFound
    } else {
        Rejection::Other
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoteError {
    #[error("no voter selected")]
    NoVoterSelected,
    #[error("ballot is empty")]
    EmptyBallot,
    #[error("voting is closed")]
    VotingClosed,
    #[error("a request is already in flight")]
    AlreadySubmitting,
    #[error("member {0} is not an administrator")]
    NotAdmin(String),
    #[error("s{0} is the voter's own exhibit")]
    SelfVote(usize),
    #[error("score {0} is outside 0..=10")]
    ScoreOutOfRange(u8),
    #[error("unknown sake index {0}")]
    UnknownSake(usize),
    #[error("request timed out")]
    NetworkTimeout,
    #[error("HTTP {status}: {raw}")]
    HttpStatus { status: u16, raw: String },
    #[error("malformed response: {raw}")]
    MalformedResponse { raw: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server rejected request: {raw}")]
    ServerRejected { raw: String },
}

impl From<GatewayError> for VoteError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(_) => Self::NetworkTimeout,
            GatewayError::Http { status, body } => Self::HttpStatus { status, raw: body },
            GatewayError::Malformed { raw } => Self::MalformedResponse { raw },
            GatewayError::Rejected { raw } => Self::ServerRejected { raw },
            GatewayError::Transport(msg) => Self::Transport(msg),
        }
    }
}

impl VoteError {
    /// Classification of server-provided text, for errors that carry any.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::HttpStatus { raw, .. }
            | Self::MalformedResponse { raw }
            | Self::ServerRejected { raw } => Some(classify_rejection(raw)),
            _ => None,
        }
    }

    /// Whether this error proves the server is no longer accepting votes.
    pub fn closes_voting(&self) -> bool {
        matches!(self, Self::VotingClosed) || self.rejection() == Some(Rejection::VotingClosed)
    }

    /// Local validation failures that never reached the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::NoVoterSelected
                | Self::EmptyBallot
                | Self::AlreadySubmitting
                | Self::NotAdmin(_)
                | Self::SelfVote(_)
                | Self::ScoreOutOfRange(_)
                | Self::UnknownSake(_)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NoVoterSelected => MSG_NO_VOTER.to_owned(),
            Self::EmptyBallot => MSG_EMPTY_BALLOT.to_owned(),
            Self::VotingClosed => MSG_VOTING_CLOSED.to_owned(),
            Self::AlreadySubmitting => "送信中です。しばらくお待ちください。".to_owned(),
            Self::NotAdmin(_) => "権限がありません。".to_owned(),
            Self::SelfVote(_) => "出品者は自己投票できません。".to_owned(),
            Self::ScoreOutOfRange(_) | Self::UnknownSake(_) => "入力値が不正です。".to_owned(),
            Self::NetworkTimeout | Self::Transport(_) => MSG_NETWORK.to_owned(),
            Self::HttpStatus { status, raw } => server_message(raw, &format!("（{status}）")),
            Self::MalformedResponse { raw } | Self::ServerRejected { raw } => {
                server_message(raw, "")
            }
        }
    }
}

fn server_message(raw: &str, status: &str) -> String {
    match classify_rejection(raw) {
        Rejection::VotingClosed => MSG_VOTING_CLOSED.to_owned(),
        Rejection::NicknameRequired => MSG_NO_VOTER.to_owned(),
        Rejection::SheetNotFound => MSG_SHEET_NOT_FOUND.to_owned(),
        Rejection::Other => format!("送信に失敗しました{status}：{raw}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_case_insensitive_substring() {
        assert_eq!(classify_rejection("Error: Voting Closed at 18:00"), Rejection::VotingClosed);
        assert_eq!(classify_rejection("nickname required"), Rejection::NicknameRequired);
        assert_eq!(classify_rejection("Sheet not found: votes"), Rejection::SheetNotFound);
        assert_eq!(classify_rejection("quota exceeded"), Rejection::Other);
    }

    #[test]
    fn unknown_server_text_is_appended_to_generic_message() {
        let err = VoteError::from(GatewayError::Http { status: 503, body: "quota exceeded".into() });
        assert_eq!(err.user_message(), "送信に失敗しました（503）：quota exceeded");

        let err = VoteError::ServerRejected { raw: "boom".into() };
        assert_eq!(err.user_message(), "送信に失敗しました：boom");
    }

    #[test]
    fn server_voting_closed_counts_as_closed() {
        let err = VoteError::ServerRejected { raw: "voting closed".into() };
        assert!(err.closes_voting());
        assert_eq!(err.user_message(), MSG_VOTING_CLOSED);
        assert!(!VoteError::NetworkTimeout.closes_voting());
    }

    #[test]
    fn gateway_errors_map_onto_taxonomy() {
        assert_eq!(VoteError::from(GatewayError::Timeout(12_000)), VoteError::NetworkTimeout);
        assert!(matches!(
            VoteError::from(GatewayError::Malformed { raw: "x".into() }),
            VoteError::MalformedResponse { .. }
        ));
        assert!(VoteError::EmptyBallot.is_local());
        assert!(!VoteError::NetworkTimeout.is_local());
    }
}
