use crate::amount::{decode_stored, encode, Amount};
use crate::error::{TokenError, TokenResult};
use crate::host::Host;
use crate::storage_types::{DataKey, KeyLayout};

/// Read the balance of `addr`.
///
/// A missing record reads as zero when `zero_if_missing` is set; otherwise
/// the account is reported as not found.
pub fn read_balance<H: Host + ?Sized>(
    e: &H,
    layout: KeyLayout,
    addr: &str,
    zero_if_missing: bool,
) -> TokenResult<Amount> {
    let key = DataKey::Balance(addr).to_key(e, layout)?;
    match e.get_state(&key)? {
        Some(bytes) => decode_stored(addr, &bytes),
        None if zero_if_missing => Ok(0),
        None => Err(TokenError::NotFound {
            entity: "account",
            key: addr.to_string(),
        }),
    }
}

pub fn write_balance<H: Host + ?Sized>(
    e: &mut H,
    layout: KeyLayout,
    addr: &str,
    amount: Amount,
) -> TokenResult<()> {
    let key = DataKey::Balance(addr).to_key(&*e, layout)?;
    e.put_state(&key, &encode(amount))?;
    Ok(())
}
