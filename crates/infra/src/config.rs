//! Ledger configuration.

use tracing::warn;

pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 3;
pub const DEFAULT_TRANSFER_PREFIX: &str = "Transfer to";

/// Tunables for [`crate::ledger_service::LedgerService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How many times a balance-checked append is attempted before a stream
    /// conflict is reported to the caller. Always at least 1.
    pub max_append_attempts: u32,
    /// Leading words of a transfer's sender-side description.
    pub transfer_description_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            transfer_description_prefix: DEFAULT_TRANSFER_PREFIX.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Read `LEDGER_MAX_APPEND_ATTEMPTS` and `LEDGER_TRANSFER_PREFIX`.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("LEDGER_MAX_APPEND_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(n) => config.max_append_attempts = n,
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "invalid LEDGER_MAX_APPEND_ATTEMPTS; using default"
                ),
            }
        }

        if let Some(raw) = lookup("LEDGER_TRANSFER_PREFIX") {
            let prefix = raw.trim();
            if prefix.is_empty() {
                warn!("empty LEDGER_TRANSFER_PREFIX; using default");
            } else {
                config.transfer_description_prefix = prefix.to_string();
            }
        }

        config.normalized()
    }

    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts;
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        self.max_append_attempts = self.max_append_attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(LedgerConfig::from_lookup(lookup(&[])), LedgerConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("LEDGER_MAX_APPEND_ATTEMPTS", "10"),
            ("LEDGER_TRANSFER_PREFIX", "Sent to"),
        ]));
        assert_eq!(config.max_append_attempts, 10);
        assert_eq!(config.transfer_description_prefix, "Sent to");
    }

    #[test]
    fn from_env_reads_process_environment() {
        // SAFETY: no other test touches the LEDGER_* variables.
        unsafe {
            std::env::set_var("LEDGER_MAX_APPEND_ATTEMPTS", " 7 ");
            std::env::remove_var("LEDGER_TRANSFER_PREFIX");
        }
        let config = LedgerConfig::from_env();
        unsafe {
            std::env::remove_var("LEDGER_MAX_APPEND_ATTEMPTS");
        }

        assert_eq!(config.max_append_attempts, 7);
        assert_eq!(config.transfer_description_prefix, DEFAULT_TRANSFER_PREFIX);
    }

    #[test]
    fn invalid_values_fall_back_and_attempts_clamp() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("LEDGER_MAX_APPEND_ATTEMPTS", "many"),
            ("LEDGER_TRANSFER_PREFIX", "   "),
        ]));
        assert_eq!(config, LedgerConfig::default());

        let config = LedgerConfig::from_lookup(lookup(&[("LEDGER_MAX_APPEND_ATTEMPTS", "0")]));
        assert_eq!(config.max_append_attempts, 1);
    }
}
