use serde::{Deserialize, Serialize};

use crate::model::db::vote::CastOutcome;

/// A vote that a user wishes to cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSpec {
    pub option: String,
}

/// What a client needs in order to render the voting form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    /// The votable options, in their configured order.
    pub options: Vec<String>,
    /// Whether the authenticated user has already voted.
    pub voted: bool,
}

/// Acknowledgement of a cast attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub outcome: CastOutcome,
}
