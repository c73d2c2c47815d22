//! Backend commands queued from UI to backend worker.

use shared::domain::ProposalId;

pub enum BackendCommand {
    Connect {
        rpc_url: String,
        contract_address: String,
        wallet_key: String,
    },
    Disconnect,
    Refresh,
    CreateProposal { description: String },
    Vote { id: ProposalId },
    Pause { id: ProposalId },
    Unpause { id: ProposalId },
    Delete { id: ProposalId },
}
