use std::thread;

use chrono::{DateTime, Local};
use client_core::{ClientEvent, GovernanceClient, MutationOutcome};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use ethereum_integration::Settings;
use shared::{
    domain::{AccountAddress, ActionKind, Proposal},
    protocol::LedgerCall,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{
    classify_connect_failure, UiError, UiErrorCategory, UiErrorContext, UiEvent,
};
use crate::controller::orchestration::dispatch_backend_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Connect,
    Proposals,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Wallet => "Wallet",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Contract => "Contract",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

fn status_color(proposal: &Proposal) -> egui::Color32 {
    use shared::domain::ProposalStatus;
    match proposal.status() {
        ProposalStatus::Active => egui::Color32::from_rgb(0x3b, 0xa5, 0x5d),
        ProposalStatus::Paused => egui::Color32::from_rgb(0xd8, 0xa0, 0x3d),
        ProposalStatus::Deleted => egui::Color32::from_rgb(0xb5, 0x4a, 0x4a),
    }
}

/// "0x7e5f4552...395bdf" for header display; full address stays in the
/// tooltip.
fn short_account(account: &AccountAddress) -> String {
    let raw = account.0.as_str();
    if raw.len() <= 14 {
        return raw.to_string();
    }
    format!("{}...{}", &raw[..10], &raw[raw.len() - 6..])
}

pub struct VotingGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view_state: AppViewState,
    status: String,
    status_banner: Option<StatusBanner>,

    rpc_url: String,
    contract_address: String,
    wallet_key: String,

    account: Option<AccountAddress>,
    proposals: Vec<Proposal>,
    draft_description: String,
    awaiting_confirmation: Option<String>,
    last_synced: Option<DateTime<Local>>,
}

impl VotingGuiApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: Settings,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view_state: AppViewState::Connect,
            status: "Not connected".to_string(),
            status_banner: None,
            rpc_url: settings.rpc_url,
            contract_address: settings.contract_address,
            wallet_key: settings.wallet_key.unwrap_or_default(),
            account: None,
            proposals: Vec::new(),
            draft_description: String::new(),
            awaiting_confirmation: None,
            last_synced: None,
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::ConnectOk { account } => {
                    self.account = Some(account);
                    self.view_state = AppViewState::Proposals;
                    self.status = "Connected".to_string();
                    self.status_banner = None;
                }
                UiEvent::Disconnected => {
                    self.account = None;
                    self.proposals.clear();
                    self.last_synced = None;
                    self.awaiting_confirmation = None;
                    self.view_state = AppViewState::Connect;
                    self.status = "Disconnected".to_string();
                }
                UiEvent::Info(message) => self.status = message,
                UiEvent::Proposals(proposals) => {
                    self.proposals = proposals;
                    self.last_synced = Some(Local::now());
                }
                UiEvent::MutationConfirmed { action, .. } => {
                    self.awaiting_confirmation = None;
                    self.status = match action {
                        ActionKind::Create => {
                            // The draft survives every failure; only a
                            // confirmed create clears it.
                            self.draft_description.clear();
                            "Proposal created".to_string()
                        }
                        ActionKind::Vote => "Vote submitted".to_string(),
                        ActionKind::Pause => "Proposal paused".to_string(),
                        ActionKind::Unpause => "Proposal unpaused".to_string(),
                        ActionKind::Delete => "Proposal deleted".to_string(),
                    };
                }
                UiEvent::ActionWithheld(reason) => {
                    self.awaiting_confirmation = None;
                    self.status = format!("Not performed: {reason}");
                }
                UiEvent::Error(err) => {
                    self.awaiting_confirmation = None;
                    self.status = if err.context() == UiErrorContext::Connect {
                        classify_connect_failure(err.message())
                    } else {
                        err.message().to_string()
                    };
                    self.status_banner = Some(StatusBanner {
                        message: format!("{}: {}", err_label(err.category()), err.message()),
                    });
                    // A session without a usable signing key cannot
                    // authorize anything; send the user back to connect.
                    if err.requires_reconnect() {
                        self.view_state = AppViewState::Connect;
                    }
                }
            }
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        let Some(banner) = self.status_banner.clone() else {
            return;
        };
        egui::Frame::NONE
            .fill(egui::Color32::from_rgb(0x4a, 0x22, 0x22))
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(&banner.message)
                            .color(egui::Color32::from_rgb(0xf0, 0xc8, 0xc8)),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("Dismiss").clicked() {
                            self.status_banner = None;
                        }
                    });
                });
            });
        ui.add_space(6.0);
    }

    fn try_connect(&mut self) {
        if self.wallet_key.trim().is_empty() {
            self.status = "A wallet signing key is required to connect".to_string();
            self.status_banner = Some(StatusBanner {
                message: "Wallet: no signing key provided; the ledger cannot authorize mutations \
                          without one"
                    .to_string(),
            });
            return;
        }
        self.status = "Connecting...".to_string();
        self.status_banner = None;
        let cmd = BackendCommand::Connect {
            rpc_url: self.rpc_url.trim().to_string(),
            contract_address: self.contract_address.trim().to_string(),
            wallet_key: self.wallet_key.trim().to_string(),
        };
        self.dispatch(cmd);
    }

    fn show_connect_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let card_width = avail.x.clamp(420.0, 540.0);
            ui.add_space((avail.y * 0.12).clamp(18.0, 90.0));

            ui.vertical_centered(|ui| {
                ui.set_width(card_width);

                egui::Frame::NONE
                    .fill(ui.visuals().faint_bg_color)
                    .corner_radius(14.0)
                    .stroke(egui::Stroke::new(
                        1.0,
                        ui.visuals().widgets.noninteractive.bg_stroke.color,
                    ))
                    .inner_margin(egui::Margin::symmetric(20, 18))
                    .show(ui, |ui| {
                        ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);

                        ui.heading("Voting Pool");
                        ui.weak("Connect a wallet to read and shape the proposal ledger.");
                        ui.add_space(8.0);
                        self.show_status_banner(ui);

                        ui.label(egui::RichText::new("Ledger endpoint").strong());
                        let endpoint_resp = ui.add(
                            egui::TextEdit::singleline(&mut self.rpc_url)
                                .hint_text("http://127.0.0.1:8545")
                                .desired_width(f32::INFINITY),
                        );

                        ui.label(egui::RichText::new("Contract address").strong());
                        let contract_resp = ui.add(
                            egui::TextEdit::singleline(&mut self.contract_address)
                                .hint_text("0x...")
                                .desired_width(f32::INFINITY),
                        );

                        ui.label(egui::RichText::new("Wallet signing key").strong());
                        let key_resp = ui.add(
                            egui::TextEdit::singleline(&mut self.wallet_key)
                                .hint_text("hex private key")
                                .password(true)
                                .desired_width(f32::INFINITY),
                        );

                        let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                        let field_focused = endpoint_resp.has_focus()
                            || contract_resp.has_focus()
                            || key_resp.has_focus();
                        if enter_pressed && field_focused {
                            self.try_connect();
                        }

                        ui.add_space(6.0);
                        let is_busy = self.status.starts_with("Connecting");
                        let connect_btn =
                            egui::Button::new(egui::RichText::new("Connect").strong().size(16.0))
                                .min_size(egui::vec2(ui.available_width(), 36.0));
                        if ui.add_enabled(!is_busy, connect_btn).clicked() {
                            self.try_connect();
                        }

                        ui.add_space(6.0);
                        ui.separator();
                        ui.horizontal_wrapped(|ui| {
                            ui.small("Status:");
                            ui.small(egui::RichText::new(&self.status).weak());
                        });
                    });
            });
        });
    }

    fn show_proposals_screen(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Voting Pool");
                if let Some(account) = &self.account {
                    ui.label(egui::RichText::new(short_account(account)).monospace())
                        .on_hover_text(account.0.clone());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Disconnect").clicked() {
                        self.dispatch(BackendCommand::Disconnect);
                    }
                    if ui.button("Refresh").clicked() {
                        self.dispatch(BackendCommand::Refresh);
                    }
                });
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status_line").show(ctx, |ui| {
            ui.add_space(2.0);
            ui.horizontal(|ui| {
                ui.small("Status:");
                ui.small(egui::RichText::new(&self.status).weak());
                if let Some(pending) = &self.awaiting_confirmation {
                    ui.small(egui::RichText::new(format!("({pending}...)")).weak());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(synced) = self.last_synced {
                        ui.small(format!("Last synced {}", synced.format("%H:%M:%S")));
                    }
                });
            });
            ui.add_space(2.0);
        });

        let mut queued: Vec<(BackendCommand, String)> = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);
            self.show_status_banner(ui);

            let busy = self.awaiting_confirmation.is_some();

            ui.horizontal(|ui| {
                let draft_resp = ui.add_sized(
                    [ui.available_width() - 140.0, 24.0],
                    egui::TextEdit::singleline(&mut self.draft_description)
                        .hint_text("Enter proposal description"),
                );
                let can_create = !busy && !self.draft_description.trim().is_empty();
                let submit_via_enter = draft_resp.lost_focus()
                    && ctx.input(|i| i.key_pressed(egui::Key::Enter))
                    && can_create;
                if ui
                    .add_enabled(can_create, egui::Button::new("Create Proposal"))
                    .clicked()
                    || submit_via_enter
                {
                    queued.push((
                        BackendCommand::CreateProposal {
                            description: self.draft_description.trim().to_string(),
                        },
                        "creating proposal".to_string(),
                    ));
                }
            });

            ui.add_space(8.0);
            ui.separator();
            ui.add_space(4.0);

            if self.proposals.is_empty() {
                ui.weak("No proposals yet.");
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    for proposal in &self.proposals {
                        proposal_card(ui, proposal, busy, &mut queued);
                        ui.add_space(6.0);
                    }
                });
        });

        for (cmd, label) in queued {
            self.awaiting_confirmation = Some(label);
            self.dispatch(cmd);
        }
    }
}

fn proposal_card(
    ui: &mut egui::Ui,
    proposal: &Proposal,
    busy: bool,
    queued: &mut Vec<(BackendCommand, String)>,
) {
    use shared::domain::ProposalStatus;

    let id = proposal.id;
    egui::Frame::NONE
        .fill(ui.visuals().faint_bg_color)
        .corner_radius(10.0)
        .stroke(egui::Stroke::new(
            1.0,
            ui.visuals().widgets.noninteractive.bg_stroke.color,
        ))
        .inner_margin(egui::Margin::symmetric(12, 10))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(format!("#{id}")).strong().monospace());
                ui.label(&proposal.description);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        egui::RichText::new(proposal.status().label())
                            .color(status_color(proposal))
                            .strong(),
                    );
                    ui.label(format!("{} votes", proposal.vote_count));
                });
            });

            let status = proposal.status();
            if status == ProposalStatus::Deleted {
                ui.weak("Archived; no further actions are possible.");
                return;
            }

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                // Only statuses that permit an action render its button;
                // the coordinator re-checks anyway.
                if status.permits(ActionKind::Vote)
                    && ui.add_enabled(!busy, egui::Button::new("Vote")).clicked()
                {
                    queued.push((
                        BackendCommand::Vote { id },
                        format!("voting on proposal {id}"),
                    ));
                }
                if status.permits(ActionKind::Pause)
                    && ui.add_enabled(!busy, egui::Button::new("Pause")).clicked()
                {
                    queued.push((
                        BackendCommand::Pause { id },
                        format!("pausing proposal {id}"),
                    ));
                }
                if status.permits(ActionKind::Unpause)
                    && ui
                        .add_enabled(!busy, egui::Button::new("Unpause"))
                        .clicked()
                {
                    queued.push((
                        BackendCommand::Unpause { id },
                        format!("unpausing proposal {id}"),
                    ));
                }
                if status.permits(ActionKind::Delete)
                    && ui.add_enabled(!busy, egui::Button::new("Delete")).clicked()
                {
                    queued.push((
                        BackendCommand::Delete { id },
                        format!("deleting proposal {id}"),
                    ));
                }
            });
        });
}

impl eframe::App for VotingGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        match self.view_state {
            AppViewState::Connect => self.show_connect_screen(ctx),
            AppViewState::Proposals => self.show_proposals_screen(ctx),
        }

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

pub fn start_backend_bridge(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = GovernanceClient::new();
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            let mut events = client.subscribe_events();
            let ui_tx_events = ui_tx.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let event = match event {
                        ClientEvent::SessionChanged(Some(account)) => {
                            UiEvent::ConnectOk { account }
                        }
                        ClientEvent::SessionChanged(None) => UiEvent::Disconnected,
                        ClientEvent::ProposalsUpdated(proposals) => UiEvent::Proposals(proposals),
                        ClientEvent::MutationConfirmed { action, target } => {
                            UiEvent::MutationConfirmed { action, target }
                        }
                        ClientEvent::Error(message) => {
                            UiEvent::Error(UiError::from_message(UiErrorContext::General, message))
                        }
                    };
                    let _ = ui_tx_events.try_send(event);
                }
            });

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Connect {
                        rpc_url,
                        contract_address,
                        wallet_key,
                    } => {
                        tracing::info!("backend: connect");
                        let settings = Settings {
                            rpc_url,
                            contract_address,
                            wallet_key: Some(wallet_key),
                        };
                        match ethereum_integration::connect(&settings).await {
                            Ok(session) => {
                                if let Err(err) =
                                    client.connect_session(session.gateway, session.account).await
                                {
                                    // Session is bound; the initial
                                    // snapshot read failed and was already
                                    // reported through the event stream.
                                    tracing::warn!(
                                        "backend: initial refresh after connect failed: {err}"
                                    );
                                }
                            }
                            Err(err) => {
                                tracing::error!("backend: connect failed: {err:#}");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::Connect,
                                    format!("{err:#}"),
                                )));
                            }
                        }
                    }
                    BackendCommand::Disconnect => {
                        tracing::info!("backend: disconnect");
                        client.disconnect_session().await;
                    }
                    BackendCommand::Refresh => {
                        tracing::info!("backend: refresh");
                        // Failures already reach the UI through the client
                        // event stream.
                        let _ = client.refresh_all().await;
                    }
                    BackendCommand::CreateProposal { description } => {
                        perform(
                            &client,
                            &ui_tx,
                            LedgerCall::CreateProposal { description },
                        )
                        .await;
                    }
                    BackendCommand::Vote { id } => {
                        perform(&client, &ui_tx, LedgerCall::Vote { id }).await;
                    }
                    BackendCommand::Pause { id } => {
                        perform(&client, &ui_tx, LedgerCall::PauseProposal { id }).await;
                    }
                    BackendCommand::Unpause { id } => {
                        perform(&client, &ui_tx, LedgerCall::UnpauseProposal { id }).await;
                    }
                    BackendCommand::Delete { id } => {
                        perform(&client, &ui_tx, LedgerCall::DeleteProposal { id }).await;
                    }
                }
            }
        });
    });
}

async fn perform(client: &GovernanceClient, ui_tx: &Sender<UiEvent>, call: LedgerCall) {
    let method = call.method_name();
    tracing::info!(method, "backend: perform");
    match client.perform(call).await {
        // Confirmation and the refreshed snapshot arrive through the
        // client event stream.
        Ok(MutationOutcome::Confirmed { .. }) => {}
        Ok(MutationOutcome::Denied(reason)) => {
            tracing::info!(method, "backend: action withheld: {reason}");
            let _ = ui_tx.try_send(UiEvent::ActionWithheld(reason.to_string()));
        }
        Err(err) => {
            tracing::error!("backend: {method} failed: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::Mutation,
                err.to_string(),
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{short_account, UiError, UiErrorCategory, UiErrorContext};
    use shared::domain::AccountAddress;

    #[test]
    fn shortens_long_account_addresses_for_the_header() {
        let account = AccountAddress("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".to_string());
        assert_eq!(short_account(&account), "0x7e5f4552...395bdf");

        let tiny = AccountAddress("0xabcdef".to_string());
        assert_eq!(short_account(&tiny), "0xabcdef");
    }

    #[test]
    fn classifies_missing_wallet_key_as_wallet_error() {
        let err = UiError::from_message(UiErrorContext::Connect, "no wallet signing key configured");
        assert_eq!(err.category(), UiErrorCategory::Wallet);
        assert!(err.requires_reconnect());
    }

    #[test]
    fn classifies_reverts_as_contract_errors() {
        let err = UiError::from_message(
            UiErrorContext::Mutation,
            "transaction 0xabc was not confirmed: transaction 0xabc reverted",
        );
        assert_eq!(err.category(), UiErrorCategory::Contract);
        assert!(!err.requires_reconnect());
    }

    #[test]
    fn classifies_unreachable_node_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::Connect,
            "ledger endpoint unreachable while reading chain id",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }
}
