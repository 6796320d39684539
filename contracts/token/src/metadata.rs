use crate::amount::parse_supply;
use crate::error::{TokenError, TokenResult};
use crate::host::Host;
use crate::storage_types::{DataKey, KeyLayout};
use serde::{Deserialize, Serialize};

/// Identity record of a token, stored as JSON under its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub owner: String,
    pub total_supply: u64,
}

impl TokenMetadata {
    /// Validate raw initialization parameters.
    pub fn new(name: &str, symbol: &str, owner: &str, total_supply: &str) -> TokenResult<Self> {
        let total_supply = parse_supply("totalSupply", total_supply)?;
        if name.is_empty() || symbol.is_empty() || owner.is_empty() {
            return Err(TokenError::Validation {
                field: "metadata",
                reason: "tokenName, symbol and owner cannot be empty".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            owner: owner.to_string(),
            total_supply,
        })
    }
}

pub fn write_metadata<H: Host + ?Sized>(
    e: &mut H,
    layout: KeyLayout,
    metadata: &TokenMetadata,
) -> TokenResult<()> {
    let key = DataKey::Metadata(&metadata.name).to_key(&*e, layout)?;
    let bytes = serde_json::to_vec(metadata).map_err(|source| TokenError::Encoding {
        what: "token metadata",
        source,
    })?;
    e.put_state(&key, &bytes)?;
    Ok(())
}

pub fn read_metadata<H: Host + ?Sized>(
    e: &H,
    layout: KeyLayout,
    name: &str,
) -> TokenResult<TokenMetadata> {
    let key = DataKey::Metadata(name).to_key(e, layout)?;
    let bytes = e.get_state(&key)?.ok_or_else(|| TokenError::NotFound {
        entity: "token metadata",
        key: name.to_string(),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| TokenError::conversion("token metadata", err.to_string()))
}

pub fn read_total_supply<H: Host + ?Sized>(e: &H, layout: KeyLayout, name: &str) -> TokenResult<u64> {
    Ok(read_metadata(e, layout, name)?.total_supply)
}
