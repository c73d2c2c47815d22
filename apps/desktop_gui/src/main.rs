use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::VotingGuiApp;

#[derive(Parser, Debug)]
#[command(about = "Desktop client for the on-chain proposal voting pool")]
struct Args {
    /// JSON-RPC endpoint of the ledger node; overrides voting.toml/env.
    #[arg(long)]
    rpc_url: Option<String>,
    /// Address of the deployed voting contract; overrides voting.toml/env.
    #[arg(long)]
    contract_address: Option<String>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let mut settings = ethereum_integration::load_settings();
    if let Some(rpc_url) = args.rpc_url {
        settings.rpc_url = rpc_url;
    }
    if let Some(contract_address) = args.contract_address {
        settings.contract_address = contract_address;
    }

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Voting Pool Desktop")
            .with_inner_size([1080.0, 720.0])
            .with_min_inner_size([860.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Voting Pool Desktop",
        options,
        Box::new(move |_cc| Ok(Box::new(VotingGuiApp::new(cmd_tx, ui_rx, settings)))),
    )
}
