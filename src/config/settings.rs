use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};

pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub user: UserSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct UserSettings {
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Staff,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_page_size() -> usize {
    15
}

impl Config {
    /// Reject values the client could never send successfully.
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LedgerError::InvalidConfig {
                key: "api.base_url".to_string(),
                reason: format!("'{url}' must start with http:// or https://"),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(LedgerError::InvalidConfig {
                key: "api.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.display.page_size == 0 || self.display.page_size > MAX_PAGE_SIZE {
            return Err(LedgerError::InvalidConfig {
                key: "display.page_size".to_string(),
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        Ok(())
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LEDGER_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup("LEDGER_API_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Config {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = parse("[api]\nbase_url = \"http://localhost:5000\"\n");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.display.page_size, 15);
        assert_eq!(config.display.currency_symbol, "$");
        assert_eq!(config.user.role, Role::Staff);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn admin_role_parses() {
        let config = parse("[api]\nbase_url = \"http://x\"\n[user]\nrole = \"admin\"\n");
        assert_eq!(config.user.role, Role::Admin);
    }

    #[test]
    fn rejects_bad_base_url_and_page_size() {
        let config = parse("[api]\nbase_url = \"localhost\"\n");
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidConfig { ref key, .. }) if key == "api.base_url"
        ));

        let config = parse("[api]\nbase_url = \"http://x\"\n[display]\npage_size = 0\n");
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidConfig { ref key, .. }) if key == "display.page_size"
        ));
    }

    #[test]
    fn env_overrides_replace_url_and_token() {
        let mut config = parse("[api]\nbase_url = \"http://a\"\n");
        config.apply_env_overrides(|key| match key {
            "LEDGER_API_URL" => Some("http://b".to_string()),
            "LEDGER_API_TOKEN" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://b");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = parse("[api]\nbase_url = \"http://a\"\n");
        config.apply_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.api.base_url, "http://a");
        assert!(config.api.token.is_none());
    }
}
