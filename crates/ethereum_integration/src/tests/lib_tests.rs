use super::*;
use axum::{routing::post, Json, Router};
use ethers::core::abi::{encode, Token};
use ethers::utils::hex;
use serde_json::{json, Value};
use shared::domain::ProposalStatus;
use tokio::net::TcpListener;

const TEST_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
const TEST_ACCOUNT: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

#[test]
fn display_safe_count_is_identity_for_realistic_magnitudes() {
    for value in [0u64, 1, 42, 1_000_000, u64::MAX] {
        assert_eq!(
            display_safe_count(U256::from(value)).expect("in range"),
            value
        );
    }
}

#[test]
fn display_safe_count_rejects_values_beyond_u64() {
    let too_big = U256::from(u64::MAX) + U256::from(1);
    let err = display_safe_count(too_big).expect_err("must overflow");
    assert!(err.to_string().contains("displayable range"));
}

fn offline_gateway() -> EthereumLedgerGateway {
    let provider = Provider::<Http>::try_from("http://127.0.0.1:8545").expect("provider");
    let wallet: LocalWallet = TEST_KEY
        .trim_start_matches("0x")
        .parse()
        .expect("test wallet key");
    let middleware = Arc::new(SignerMiddleware::new(provider, wallet));
    EthereumLedgerGateway {
        contract: VotingPool::new(Address::zero(), Arc::clone(&middleware)),
        provider: middleware,
    }
}

#[test]
fn every_ledger_call_encodes_the_matching_contract_function() {
    let gateway = offline_gateway();
    let calls = [
        LedgerCall::CreateProposal {
            description: "fund the audit".to_string(),
        },
        LedgerCall::Vote { id: ProposalId(3) },
        LedgerCall::PauseProposal { id: ProposalId(3) },
        LedgerCall::UnpauseProposal { id: ProposalId(3) },
        LedgerCall::DeleteProposal { id: ProposalId(3) },
    ];

    for call in calls {
        let tx = gateway.contract_call(&call).tx;
        let calldata = tx.data().cloned().expect("mutating calls carry calldata");
        let expected = VOTINGPOOL_ABI
            .function(call.method_name())
            .expect("function present in ABI")
            .short_signature();
        assert_eq!(
            &calldata[..4],
            expected.as_slice(),
            "selector mismatch for {}",
            call.method_name()
        );
    }
}

async fn handle_rpc(Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();
    let result = match method {
        "eth_chainId" => json!("0x7a69"),
        "eth_call" => {
            let data_hex = request["params"][0]["data"].as_str().expect("calldata");
            let data = hex::decode(data_hex.trim_start_matches("0x")).expect("hex calldata");
            let count_fn = VOTINGPOOL_ABI.function("proposalCount").expect("abi");
            let get_fn = VOTINGPOOL_ABI.function("getProposal").expect("abi");
            let encoded = if data[..4] == count_fn.short_signature() {
                encode(&[Token::Uint(U256::from(2u64))])
            } else if data[..4] == get_fn.short_signature() {
                let tokens = get_fn
                    .decode_input(&data[4..])
                    .expect("decode getProposal input");
                let Token::Uint(requested) = tokens[0].clone() else {
                    panic!("getProposal takes a uint id");
                };
                match requested.as_u64() {
                    1 => encode(&[
                        Token::String("fund the audit".to_string()),
                        Token::Uint(U256::from(5u64)),
                        Token::Bool(false),
                        Token::Bool(false),
                    ]),
                    // Paused and deleted at once: deletion must dominate.
                    2 => encode(&[
                        Token::String("retired".to_string()),
                        Token::Uint(U256::from(7u64)),
                        Token::Bool(true),
                        Token::Bool(true),
                    ]),
                    other => panic!("unexpected proposal id {other}"),
                }
            } else {
                panic!("unexpected eth_call selector");
            };
            json!(format!("0x{}", hex::encode(encoded)))
        }
        other => panic!("unexpected rpc method {other}"),
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn spawn_fake_node() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new().route("/", post(handle_rpc));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn gateway_reads_decode_contract_state_from_the_node() {
    let rpc_url = spawn_fake_node().await;
    let settings = Settings {
        rpc_url,
        contract_address: "0x9ec3c33f8cc9721a91716d846fbf766abac62e6e".to_string(),
        wallet_key: Some(TEST_KEY.to_string()),
    };

    let session = connect(&settings).await.expect("connect");
    assert_eq!(session.account.0, TEST_ACCOUNT);

    let count = session.gateway.proposal_count().await.expect("count");
    assert_eq!(count, 2);

    let first = session
        .gateway
        .fetch_proposal(ProposalId(1))
        .await
        .expect("proposal 1");
    assert_eq!(first.description, "fund the audit");
    assert_eq!(first.vote_count, 5);
    assert_eq!(first.status(), ProposalStatus::Active);

    let second = session
        .gateway
        .fetch_proposal(ProposalId(2))
        .await
        .expect("proposal 2");
    assert_eq!(second.description, "retired");
    assert_eq!(second.vote_count, 7);
    assert_eq!(second.status(), ProposalStatus::Deleted);
}

#[tokio::test]
async fn connect_without_a_signing_key_is_refused_before_any_network_call() {
    let settings = Settings {
        rpc_url: "http://127.0.0.1:1".to_string(),
        contract_address: "0x9ec3c33f8cc9721a91716d846fbf766abac62e6e".to_string(),
        wallet_key: None,
    };
    let err = connect(&settings).await.expect_err("must refuse");
    assert!(err.to_string().contains("no wallet signing key"));

    let settings = Settings {
        wallet_key: Some("   ".to_string()),
        ..settings
    };
    let err = connect(&settings).await.expect_err("blank key must refuse");
    assert!(err.to_string().contains("no wallet signing key"));
}
