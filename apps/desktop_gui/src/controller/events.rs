//! UI/backend events and error modeling for the desktop controller.

use shared::domain::{AccountAddress, ActionKind, Proposal, ProposalId};

pub enum UiEvent {
    ConnectOk {
        account: AccountAddress,
    },
    Disconnected,
    Info(String),
    Proposals(Vec<Proposal>),
    MutationConfirmed {
        action: ActionKind,
        target: Option<ProposalId>,
    },
    /// A locally denied action: the request never reached the ledger.
    ActionWithheld(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Wallet,
    Transport,
    Contract,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
    Mutation,
    General,
}

pub fn classify_connect_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("backend worker startup failure") {
        "Backend worker startup failure; verify local app environment and retry.".to_string()
    } else if lower.contains("no wallet signing key") || lower.contains("invalid wallet signing key")
    {
        "No usable wallet key; paste a signing key and retry.".to_string()
    } else if lower.contains("unreachable")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Ledger node unreachable; check the endpoint URL/network and retry.".to_string()
    } else {
        format!("Connect error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("revert")
            || message_lower.contains("submission")
            || message_lower.contains("not confirmed")
        {
            UiErrorCategory::Contract
        } else if message_lower.contains("wallet")
            || message_lower.contains("signing key")
            || message_lower.contains("signer")
        {
            UiErrorCategory::Wallet
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("unreachable")
            || message_lower.contains("transport")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reconnect(&self) -> bool {
        self.category == UiErrorCategory::Wallet
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
