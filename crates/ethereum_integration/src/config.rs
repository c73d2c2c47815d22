use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

/// Address the original deployment of the voting contract lives at;
/// overridable per environment.
const DEFAULT_CONTRACT_ADDRESS: &str = "0x9ec3c33f8cc9721a91716d846fbf766abac62e6e";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub rpc_url: String,
    pub contract_address: String,
    /// Hex-encoded signing key. Left unset, the client starts without a
    /// wallet session and prompts for one.
    pub wallet_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            wallet_key: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = load_settings_from(Path::new("voting.toml"));

    if let Ok(v) = std::env::var("VOTING_RPC_URL") {
        settings.rpc_url = v;
    }
    if let Ok(v) = std::env::var("VOTING_CONTRACT_ADDRESS") {
        settings.contract_address = v;
    }
    if let Ok(v) = std::env::var("VOTING_WALLET_KEY") {
        if !v.trim().is_empty() {
            settings.wallet_key = Some(v);
        }
    }

    settings
}

fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("rpc_url") {
                settings.rpc_url = v.clone();
            }
            if let Some(v) = file_cfg.get("contract_address") {
                settings.contract_address = v.clone();
            }
            if let Some(v) = file_cfg.get("wallet_key") {
                if !v.trim().is_empty() {
                    settings.wallet_key = Some(v.clone());
                }
            }
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_a_local_node_without_a_wallet_key() {
        let settings = Settings::default();
        assert_eq!(settings.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(settings.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert!(settings.wallet_key.is_none());
    }

    #[test]
    fn file_values_override_the_defaults() {
        let path = std::env::temp_dir().join(format!(
            "voting-settings-test-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "rpc_url = \"http://10.0.0.5:8545\"\ncontract_address = \"0x00000000000000000000000000000000000000aa\"\n",
        )
        .expect("write settings file");

        let settings = load_settings_from(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(settings.rpc_url, "http://10.0.0.5:8545");
        assert_eq!(
            settings.contract_address,
            "0x00000000000000000000000000000000000000aa"
        );
        assert!(settings.wallet_key.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_settings_from(Path::new("/nonexistent/voting.toml"));
        assert_eq!(settings.rpc_url, Settings::default().rpc_url);
    }
}
