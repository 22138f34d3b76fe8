//! Persisted account roster.
//!
//! A JSON array of account objects, loaded once at startup and rewritten
//! after every account's lifecycle run so progress survives interruption.
//! Loading migrates the legacy `token` field into `apiKey`; saving never
//! re-emits `token`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One configured account and its last-known lifecycle state.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Account {
    pub name: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "battleId")]
    pub battle_id: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<String>,
    #[serde(rename = "agentName")]
    pub agent_name: Option<String>,
}

/// Wire shape on load: `apiKey` may still be spelled `token`, and the state
/// fields may be absent entirely.
#[derive(Debug, Deserialize)]
struct RawAccount {
    name: String,
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
    token: Option<String>,
    #[serde(rename = "battleId", default)]
    battle_id: Option<String>,
    #[serde(rename = "agentId", default)]
    agent_id: Option<String>,
    #[serde(rename = "agentName", default)]
    agent_name: Option<String>,
}

impl RawAccount {
    fn into_account(self) -> Result<Account> {
        // apiKey wins when both are present; token is the pre-rename field.
        let api_key = match self.api_key.or(self.token) {
            Some(key) => key,
            None => bail!("account '{}' has neither apiKey nor token", self.name),
        };
        Ok(Account {
            name: self.name,
            api_key,
            battle_id: self.battle_id,
            agent_id: self.agent_id,
            agent_name: self.agent_name,
        })
    }
}

/// Load the roster. A missing file is a startup precondition failure: the
/// operator needs to create one from the template first.
pub fn load(path: &Path) -> Result<Vec<Account>> {
    if !path.is_file() {
        bail!(
            "roster file {} not found; copy accounts.example.json there to get started",
            path.display()
        );
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Vec<RawAccount> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    raw.into_iter().map(RawAccount::into_account).collect()
}

/// Overwrite the roster. Write-temp-then-rename; a crash mid-write loses at
/// most this one save.
pub fn save(path: &Path, accounts: &[Account]) -> Result<()> {
    let json = serde_json::to_string_pretty(accounts).context("failed to serialize roster")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_fatal_with_template_hint() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load(&tmp.path().join("accounts.json")).unwrap_err();
        assert!(err.to_string().contains("accounts.example.json"));
    }

    #[test]
    fn legacy_token_migrates_to_api_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");
        fs::write(
            &path,
            r#"[{"name": "alpha", "token": "legacy-key"}]"#,
        )
        .unwrap();

        let accounts = load(&path).unwrap();
        assert_eq!(accounts[0].api_key, "legacy-key");
        assert_eq!(accounts[0].battle_id, None);
        assert_eq!(accounts[0].agent_id, None);
        assert_eq!(accounts[0].agent_name, None);
    }

    #[test]
    fn api_key_wins_over_token_when_both_present() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");
        fs::write(
            &path,
            r#"[{"name": "alpha", "apiKey": "current", "token": "stale"}]"#,
        )
        .unwrap();

        let accounts = load(&path).unwrap();
        assert_eq!(accounts[0].api_key, "current");
    }

    #[test]
    fn account_without_any_key_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");
        fs::write(&path, r#"[{"name": "alpha"}]"#).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("neither apiKey nor token"));
    }

    #[test]
    fn save_load_round_trip_preserves_fields_and_drops_token() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");
        fs::write(
            &path,
            r#"[
                {"name": "alpha", "token": "k-1", "agentName": "Ferrite"},
                {"name": "beta", "apiKey": "k-2", "battleId": "b-9", "agentId": "a-3"}
            ]"#,
        )
        .unwrap();

        let accounts = load(&path).unwrap();
        save(&path, &accounts).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("token"));
        assert!(written.contains("\"apiKey\": \"k-1\""));

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, accounts);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");
        let accounts = vec![Account {
            name: "alpha".to_string(),
            api_key: "k".to_string(),
            battle_id: None,
            agent_id: None,
            agent_name: None,
        }];

        save(&path, &accounts).unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());
    }
}
