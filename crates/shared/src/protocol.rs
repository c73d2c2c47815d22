use serde::{Deserialize, Serialize};

use crate::domain::{ActionKind, ProposalId};

/// State-changing entry points of the ledger contract, one variant per
/// mutating call the client is allowed to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LedgerCall {
    CreateProposal { description: String },
    Vote { id: ProposalId },
    PauseProposal { id: ProposalId },
    UnpauseProposal { id: ProposalId },
    DeleteProposal { id: ProposalId },
}

impl LedgerCall {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateProposal { .. } => ActionKind::Create,
            Self::Vote { .. } => ActionKind::Vote,
            Self::PauseProposal { .. } => ActionKind::Pause,
            Self::UnpauseProposal { .. } => ActionKind::Unpause,
            Self::DeleteProposal { .. } => ActionKind::Delete,
        }
    }

    pub fn target(&self) -> Option<ProposalId> {
        match self {
            Self::CreateProposal { .. } => None,
            Self::Vote { id }
            | Self::PauseProposal { id }
            | Self::UnpauseProposal { id }
            | Self::DeleteProposal { id } => Some(*id),
        }
    }

    /// Contract-side entry point name, as it appears in the ABI.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::CreateProposal { .. } => "createProposal",
            Self::Vote { .. } => "vote",
            Self::PauseProposal { .. } => "pauseProposal",
            Self::UnpauseProposal { .. } => "unpauseProposal",
            Self::DeleteProposal { .. } => "deleteProposal",
        }
    }
}

/// Opaque transaction handle issued at submission; confirmation is a
/// separate await on the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
