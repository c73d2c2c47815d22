//! UI layer for the desktop client: app shell and backend worker entry.

pub mod app;

pub use app::VotingGuiApp;
