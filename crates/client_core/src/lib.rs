use std::{collections::HashSet, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::{
    domain::{AccountAddress, ActionKind, Proposal, ProposalId, ProposalStatus},
    protocol::{LedgerCall, TxId},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capability surface of the external ledger holding authoritative
/// proposal state. Reads return full records; mutations are a two-step
/// submit/confirm pipeline so every suspension point fails independently.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn proposal_count(&self) -> Result<u64>;
    async fn fetch_proposal(&self, id: ProposalId) -> Result<Proposal>;
    async fn submit(&self, call: LedgerCall) -> Result<TxId>;
    async fn await_confirmation(&self, tx: &TxId) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no wallet session is connected")]
    ConnectionUnavailable,
    #[error("{call} submission failed: {source}")]
    SubmissionFailed {
        call: &'static str,
        source: anyhow::Error,
    },
    #[error("transaction {tx} was not confirmed: {source}")]
    ConfirmationFailed { tx: TxId, source: anyhow::Error },
    #[error("proposal refresh failed: {source}")]
    ReadFailed { source: anyhow::Error },
}

/// Key the double-submit guard tracks: one create slot, one slot per
/// targeted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Create,
    Proposal(ProposalId),
}

impl MutationKey {
    fn for_call(call: &LedgerCall) -> Self {
        match call.target() {
            Some(id) => Self::Proposal(id),
            None => Self::Create,
        }
    }
}

impl std::fmt::Display for MutationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "proposal creation"),
            Self::Proposal(id) => write!(f, "proposal {id}"),
        }
    }
}

/// A withheld action. Denial is a normal outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    EmptyDescription,
    UnknownProposal(ProposalId),
    NotPermitted {
        action: ActionKind,
        status: ProposalStatus,
    },
    AlreadyInFlight(MutationKey),
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "a proposal needs a non-empty description"),
            Self::UnknownProposal(id) => write!(f, "proposal {id} is not in the current snapshot"),
            Self::NotPermitted { action, status } => {
                write!(f, "cannot {action} a {} proposal", status.label().to_ascii_lowercase())
            }
            Self::AlreadyInFlight(key) => {
                write!(f, "a mutation for {key} is already awaiting confirmation")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed {
        action: ActionKind,
        target: Option<ProposalId>,
    },
    Denied(DenyReason),
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SessionChanged(Option<AccountAddress>),
    ProposalsUpdated(Vec<Proposal>),
    MutationConfirmed {
        action: ActionKind,
        target: Option<ProposalId>,
    },
    Error(String),
}

/// Client-side view of the proposal ledger: rebuilds the snapshot from
/// the gateway, validates actions against derived status before any
/// network call, and sequences submit -> confirm -> refresh.
pub struct GovernanceClient {
    inner: Mutex<GovernanceState>,
    events: broadcast::Sender<ClientEvent>,
}

struct GovernanceState {
    gateway: Option<Arc<dyn LedgerGateway>>,
    account: Option<AccountAddress>,
    proposals: Vec<Proposal>,
    inflight: HashSet<MutationKey>,
}

impl GovernanceClient {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            inner: Mutex::new(GovernanceState {
                gateway: None,
                account: None,
                proposals: Vec::new(),
                inflight: HashSet::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Binds a freshly established wallet session and pulls the first
    /// snapshot. The session stays bound even if that initial refresh
    /// fails; the caller may retry with `refresh_all`.
    pub async fn connect_session(
        &self,
        gateway: Arc<dyn LedgerGateway>,
        account: AccountAddress,
    ) -> Result<(), ClientError> {
        {
            let mut guard = self.inner.lock().await;
            guard.gateway = Some(gateway);
            guard.account = Some(account.clone());
            guard.proposals.clear();
            guard.inflight.clear();
        }
        info!(account = %account, "ledger session connected");
        let _ = self.events.send(ClientEvent::SessionChanged(Some(account)));
        self.refresh_all().await
    }

    pub async fn disconnect_session(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.gateway = None;
            guard.account = None;
            guard.proposals.clear();
            guard.inflight.clear();
        }
        info!("ledger session disconnected");
        let _ = self.events.send(ClientEvent::SessionChanged(None));
        let _ = self.events.send(ClientEvent::ProposalsUpdated(Vec::new()));
    }

    pub async fn session_account(&self) -> Option<AccountAddress> {
        self.inner.lock().await.account.clone()
    }

    /// Current snapshot, cloned for the caller. Redraw from the
    /// `ProposalsUpdated` event instead when watching for changes.
    pub async fn proposals(&self) -> Vec<Proposal> {
        self.inner.lock().await.proposals.clone()
    }

    /// Rebuilds the whole collection from the ledger: read the count,
    /// fetch ids `1..=n` in order, then swap the snapshot wholesale.
    /// Without a session this is a quiet no-op. A failed read leaves the
    /// previous snapshot untouched; a half-populated list is never
    /// exposed.
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        let gateway = { self.inner.lock().await.gateway.clone() };
        let Some(gateway) = gateway else {
            info!("proposal refresh skipped: no ledger session");
            return Ok(());
        };

        let fresh = match fetch_full_snapshot(gateway.as_ref()).await {
            Ok(list) => list,
            Err(err) => {
                warn!("proposal refresh failed: {err:#}");
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("proposal refresh failed: {err}")));
                return Err(ClientError::ReadFailed { source: err });
            }
        };

        {
            let mut guard = self.inner.lock().await;
            // The session may have been torn down while the reads were in
            // flight; a stale snapshot must not outlive it.
            if guard.gateway.is_none() {
                return Ok(());
            }
            guard.proposals = fresh.clone();
        }
        info!(proposals = fresh.len(), "proposal snapshot refreshed");
        let _ = self.events.send(ClientEvent::ProposalsUpdated(fresh));
        Ok(())
    }

    /// Executes one validated mutation end to end: local validation,
    /// double-submit guard, submit, confirmation wait, then a full
    /// refresh. Any failure aborts at the point it occurred; nothing is
    /// retried automatically.
    pub async fn perform(&self, call: LedgerCall) -> Result<MutationOutcome, ClientError> {
        let action = call.kind();
        let target = call.target();
        let key = MutationKey::for_call(&call);

        let gateway = {
            let mut guard = self.inner.lock().await;
            let Some(gateway) = guard.gateway.clone() else {
                return Err(ClientError::ConnectionUnavailable);
            };

            if let LedgerCall::CreateProposal { description } = &call {
                if description.trim().is_empty() {
                    info!("create denied: empty description");
                    return Ok(MutationOutcome::Denied(DenyReason::EmptyDescription));
                }
            }

            if let Some(id) = target {
                let Some(proposal) = guard.proposals.iter().find(|p| p.id == id) else {
                    warn!(proposal_id = id.0, "{action} denied: unknown proposal");
                    return Ok(MutationOutcome::Denied(DenyReason::UnknownProposal(id)));
                };
                // Re-check even though the UI withholds forbidden
                // affordances: ledger state may have moved between render
                // and click.
                let status = proposal.status();
                if !status.permits(action) {
                    info!(
                        proposal_id = id.0,
                        status = status.label(),
                        "{action} denied by proposal state"
                    );
                    return Ok(MutationOutcome::Denied(DenyReason::NotPermitted {
                        action,
                        status,
                    }));
                }
            }

            if !guard.inflight.insert(key) {
                info!("{action} denied: {key} already has an outstanding mutation");
                return Ok(MutationOutcome::Denied(DenyReason::AlreadyInFlight(key)));
            }
            gateway
        };

        let result = submit_and_confirm(gateway.as_ref(), &call).await;
        self.inner.lock().await.inflight.remove(&key);

        if let Err(err) = &result {
            warn!("{err}");
            let _ = self.events.send(ClientEvent::Error(err.to_string()));
        }
        result?;

        info!(%action, "mutation confirmed");
        let _ = self
            .events
            .send(ClientEvent::MutationConfirmed { action, target });

        // The mutation is final at this point; a failed follow-up read
        // does not un-confirm it. The refresh path reports its own
        // failure.
        if self.refresh_all().await.is_err() {
            warn!(%action, "mutation confirmed but the follow-up refresh failed");
        }

        Ok(MutationOutcome::Confirmed { action, target })
    }
}

async fn fetch_full_snapshot(gateway: &dyn LedgerGateway) -> Result<Vec<Proposal>> {
    let count = gateway
        .proposal_count()
        .await
        .context("failed to read proposal count")?;
    let mut list = Vec::with_capacity(count as usize);
    for raw_id in 1..=count {
        let id = ProposalId(raw_id);
        let proposal = gateway
            .fetch_proposal(id)
            .await
            .with_context(|| format!("failed to fetch proposal {id}"))?;
        list.push(proposal);
    }
    Ok(list)
}

async fn submit_and_confirm(
    gateway: &dyn LedgerGateway,
    call: &LedgerCall,
) -> Result<(), ClientError> {
    let method = call.method_name();
    info!(method, "submitting ledger call");
    let tx = gateway
        .submit(call.clone())
        .await
        .map_err(|source| ClientError::SubmissionFailed {
            call: method,
            source,
        })?;

    info!(method, tx = %tx, "awaiting confirmation");
    gateway
        .await_confirmation(&tx)
        .await
        .map_err(|source| ClientError::ConfirmationFailed { tx, source })?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
