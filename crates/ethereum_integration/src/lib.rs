use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use client_core::LedgerGateway;
use ethers::{
    contract::{abigen, builders::ContractCall},
    core::types::{Address, H256, U256, U64},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use shared::{
    domain::{AccountAddress, Proposal, ProposalId},
    protocol::{LedgerCall, TxId},
};
use tracing::{debug, info};

pub mod config;
pub use config::{load_settings, Settings};

abigen!(VotingPool, "./abi/VotingPool.json");

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(1);
const CONFIRMATION_POLL_ATTEMPTS: usize = 120;

type EthMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A live wallet session: the signing account plus a gateway bound to
/// the voting contract on its chain.
pub struct ConnectedSession {
    pub account: AccountAddress,
    pub gateway: Arc<dyn LedgerGateway>,
}

impl std::fmt::Debug for ConnectedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Establishes a wallet session against the configured endpoint. A
/// missing signing key or an unreachable endpoint surfaces here, before
/// any contract interaction is possible.
pub async fn connect(settings: &Settings) -> Result<ConnectedSession> {
    let key = settings
        .wallet_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("no wallet signing key configured"))?;
    let key = key.strip_prefix("0x").unwrap_or(key);

    let rpc_url = url::Url::parse(&settings.rpc_url)
        .with_context(|| format!("invalid ledger endpoint URL '{}'", settings.rpc_url))?;
    let contract_address: Address = settings
        .contract_address
        .parse()
        .with_context(|| format!("invalid contract address '{}'", settings.contract_address))?;

    let provider = Provider::<Http>::try_from(rpc_url.as_str())
        .context("failed to build JSON-RPC provider")?;
    let chain_id = provider
        .get_chainid()
        .await
        .context("ledger endpoint unreachable while reading chain id")?;

    let wallet: LocalWallet = key.parse().context("invalid wallet signing key")?;
    let wallet = wallet.with_chain_id(chain_id.as_u64());
    let account = AccountAddress(format!("{:#x}", wallet.address()));

    let middleware = Arc::new(SignerMiddleware::new(provider, wallet));
    let gateway = EthereumLedgerGateway {
        contract: VotingPool::new(contract_address, Arc::clone(&middleware)),
        provider: middleware,
    };

    info!(
        account = %account,
        chain_id = chain_id.as_u64(),
        contract = %settings.contract_address,
        "wallet session established"
    );
    Ok(ConnectedSession {
        account,
        gateway: Arc::new(gateway),
    })
}

/// `LedgerGateway` over the deployed `VotingPool` contract. Reads go
/// through `eth_call`; mutations are signed locally, submitted, and
/// confirmed by polling for a mined receipt.
pub struct EthereumLedgerGateway {
    contract: VotingPool<EthMiddleware>,
    provider: Arc<EthMiddleware>,
}

impl EthereumLedgerGateway {
    fn contract_call(&self, call: &LedgerCall) -> ContractCall<EthMiddleware, ()> {
        match call {
            LedgerCall::CreateProposal { description } => {
                self.contract.create_proposal(description.clone())
            }
            LedgerCall::Vote { id } => self.contract.vote(U256::from(id.0)),
            LedgerCall::PauseProposal { id } => self.contract.pause_proposal(U256::from(id.0)),
            LedgerCall::UnpauseProposal { id } => self.contract.unpause_proposal(U256::from(id.0)),
            LedgerCall::DeleteProposal { id } => self.contract.delete_proposal(U256::from(id.0)),
        }
    }
}

#[async_trait]
impl LedgerGateway for EthereumLedgerGateway {
    async fn proposal_count(&self) -> Result<u64> {
        let raw = self
            .contract
            .proposal_count()
            .call()
            .await
            .context("proposalCount call failed")?;
        display_safe_count(raw).context("proposal count out of displayable range")
    }

    async fn fetch_proposal(&self, id: ProposalId) -> Result<Proposal> {
        let (description, vote_count, is_paused, is_deleted) = self
            .contract
            .get_proposal(U256::from(id.0))
            .call()
            .await
            .with_context(|| format!("getProposal({id}) call failed"))?;
        Ok(Proposal {
            id,
            description,
            vote_count: display_safe_count(vote_count)
                .with_context(|| format!("vote count of proposal {id} out of displayable range"))?,
            is_paused,
            is_deleted,
        })
    }

    async fn submit(&self, call: LedgerCall) -> Result<TxId> {
        let method = call.method_name();
        let contract_call = self.contract_call(&call);
        let pending = contract_call
            .send()
            .await
            .with_context(|| format!("{method} submission rejected"))?;
        let tx_hash: H256 = *pending;
        debug!(method, tx = %format!("{tx_hash:#x}"), "ledger call submitted");
        Ok(TxId(format!("{tx_hash:#x}")))
    }

    async fn await_confirmation(&self, tx: &TxId) -> Result<()> {
        let hash: H256 = tx
            .0
            .parse()
            .with_context(|| format!("malformed transaction id '{tx}'"))?;
        for _ in 0..CONFIRMATION_POLL_ATTEMPTS {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .with_context(|| format!("receipt lookup failed for {tx}"))?;
            if let Some(receipt) = receipt {
                return match receipt.status {
                    Some(status) if status == U64::from(1) => Ok(()),
                    _ => Err(anyhow!("transaction {tx} reverted")),
                };
            }
            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
        Err(anyhow!(
            "transaction {tx} not confirmed after {} attempts",
            CONFIRMATION_POLL_ATTEMPTS
        ))
    }
}

/// Ledger counters are `uint256`; anything beyond `u64` is not a
/// realistic magnitude and is rejected rather than silently truncated.
fn display_safe_count(raw: U256) -> Result<u64> {
    if raw > U256::from(u64::MAX) {
        return Err(anyhow!("value {raw} exceeds the displayable range"));
    }
    Ok(raw.as_u64())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
