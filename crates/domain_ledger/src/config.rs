//! Ledger configuration

use serde::{Deserialize, Serialize};

use core_kernel::Timezone;

/// Runtime switches for the ledger core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// When false, real-time adapters skip posting (with a warning) and the
    /// business event commits without ledger rows
    pub posting_enabled: bool,
    /// Calendar used for accounting dates
    pub timezone: Timezone,
    /// Recorded as `created_by` on batches the core posts on its own behalf
    pub created_by: String,
    /// Attempts at allocating a free party sub-account code before giving up
    pub party_code_retry_limit: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            posting_enabled: true,
            timezone: Timezone::shop_default(),
            created_by: "system".to_string(),
            party_code_retry_limit: 5,
        }
    }
}

impl LedgerConfig {
    pub fn with_posting_enabled(mut self, enabled: bool) -> Self {
        self.posting_enabled = enabled;
        self
    }

    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn with_party_code_retry_limit(mut self, limit: u32) -> Self {
        self.party_code_retry_limit = limit.max(1);
        self
    }
}
