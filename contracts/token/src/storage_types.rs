use crate::error::{TokenError, TokenResult};
use crate::host::{Host, HostError, COMPOSITE_KEY_DELIMITER};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const APPROVAL_NAMESPACE: &str = "approval";
pub const BALANCE_NAMESPACE: &str = "balance";
pub const METADATA_NAMESPACE: &str = "metadata";

/// Where metadata and balances live in the host keyspace.
///
/// `Legacy` keeps them under the bare token name / address, which is what
/// already-deployed ledgers hold. `Namespaced` moves both under their own
/// composite namespace. Allowances are composite under either layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    #[default]
    Legacy,
    Namespaced,
}

impl FromStr for KeyLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "namespaced" => Ok(Self::Namespaced),
            other => Err(format!("unknown key layout {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DataKey<'a> {
    Metadata(&'a str),
    Balance(&'a str),
    Allowance { owner: &'a str, spender: &'a str },
}

impl DataKey<'_> {
    pub fn to_key<H: Host + ?Sized>(&self, host: &H, layout: KeyLayout) -> Result<String, HostError> {
        match (*self, layout) {
            (DataKey::Metadata(name), KeyLayout::Legacy) => Ok(name.to_string()),
            (DataKey::Balance(address), KeyLayout::Legacy) => Ok(address.to_string()),
            (DataKey::Metadata(name), KeyLayout::Namespaced) => {
                host.create_composite_key(METADATA_NAMESPACE, &[name])
            }
            (DataKey::Balance(address), KeyLayout::Namespaced) => {
                host.create_composite_key(BALANCE_NAMESPACE, &[address])
            }
            (DataKey::Allowance { owner, spender }, _) => {
                host.create_composite_key(APPROVAL_NAMESPACE, &[owner, spender])
            }
        }
    }
}

/// Identifiers share a keyspace with composite keys, so they may not be
/// empty or carry the composite delimiter.
pub fn validate_identifier(field: &'static str, value: &str) -> TokenResult<()> {
    if value.is_empty() {
        return Err(TokenError::Validation {
            field,
            reason: "cannot be empty".to_string(),
        });
    }
    if value.contains(COMPOSITE_KEY_DELIMITER) {
        return Err(TokenError::Validation {
            field,
            reason: "cannot contain a NUL character".to_string(),
        });
    }
    Ok(())
}
