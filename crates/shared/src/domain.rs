use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProposalId);

/// Lifecycle state derived from the two ledger-reported flags.
/// Deletion always dominates pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Paused,
    Deleted,
}

impl ProposalStatus {
    pub fn derive(is_paused: bool, is_deleted: bool) -> Self {
        if is_deleted {
            Self::Deleted
        } else if is_paused {
            Self::Paused
        } else {
            Self::Active
        }
    }

    /// The single transition table: which actions a proposal in this
    /// state accepts. `Create` has no proposal context and is always
    /// permitted.
    pub fn permits(self, action: ActionKind) -> bool {
        match (self, action) {
            (_, ActionKind::Create) => true,
            (Self::Active, ActionKind::Vote | ActionKind::Pause | ActionKind::Delete) => true,
            (Self::Paused, ActionKind::Unpause | ActionKind::Delete) => true,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Paused => "Paused",
            Self::Deleted => "Deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Vote,
    Pause,
    Unpause,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Vote => "vote",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub description: String,
    pub vote_count: u64,
    pub is_paused: bool,
    pub is_deleted: bool,
}

impl Proposal {
    pub fn status(&self) -> ProposalStatus {
        ProposalStatus::derive(self.is_paused, self.is_deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAddress(pub String);

impl std::fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
