use crate::amount::{decode_stored, encode, Amount};
use crate::error::{TokenError, TokenResult};
use crate::event::Approval;
use crate::host::{Host, StateIterator};
use crate::storage_types::{DataKey, KeyLayout, APPROVAL_NAMESPACE};

pub fn read_allowance<H: Host + ?Sized>(
    e: &H,
    owner: &str,
    spender: &str,
    zero_if_missing: bool,
) -> TokenResult<Amount> {
    let key = DataKey::Allowance { owner, spender }.to_key(e, KeyLayout::default())?;
    match e.get_state(&key)? {
        Some(bytes) => decode_stored(&allowance_field(owner, spender), &bytes),
        None if zero_if_missing => Ok(0),
        None => Err(TokenError::NotFound {
            entity: "allowance",
            key: format!("{owner}/{spender}"),
        }),
    }
}

fn allowance_field(owner: &str, spender: &str) -> String {
    format!("allowance {owner}/{spender}")
}

pub fn write_allowance<H: Host + ?Sized>(
    e: &mut H,
    owner: &str,
    spender: &str,
    amount: Amount,
) -> TokenResult<()> {
    let key = DataKey::Allowance { owner, spender }.to_key(&*e, KeyLayout::default())?;
    e.put_state(&key, &encode(amount))?;
    Ok(())
}

/// Open a lazy scan over every allowance granted by `owner`.
pub fn list_allowances<'a, H: Host + ?Sized>(e: &'a H, owner: &str) -> TokenResult<Allowances<'a, H>> {
    let iter = e.get_state_by_partial_composite_key(APPROVAL_NAMESPACE, &[owner])?;
    Ok(Allowances {
        host: e,
        owner: owner.to_string(),
        iter: Some(iter),
    })
}

/// Allowances of one owner in store key order.
///
/// The scan handle is released when the sequence is exhausted, on the first
/// error, or when the value is dropped, whichever comes first. Once released
/// the sequence yields nothing more.
pub struct Allowances<'a, H: Host + ?Sized> {
    host: &'a H,
    owner: String,
    iter: Option<Box<dyn StateIterator + 'a>>,
}

impl<H: Host + ?Sized> Allowances<'_, H> {
    pub fn close(&mut self) -> TokenResult<()> {
        match self.iter.take() {
            Some(mut iter) => iter.close().map_err(TokenError::from),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: TokenError) -> Option<TokenResult<Approval>> {
        if let Err(close_err) = self.close() {
            tracing::warn!(owner = %self.owner, "failed to close allowance scan: {}", close_err);
        }
        Some(Err(err))
    }

    fn decode(&self, key: &str, value: &[u8]) -> TokenResult<Approval> {
        let (_, parts) = self.host.split_composite_key(key)?;
        let spender = match parts.as_slice() {
            [_, spender] => spender.clone(),
            _ => {
                return Err(TokenError::conversion(
                    "approval key",
                    format!("{key:?} does not hold an owner/spender pair"),
                ))
            }
        };
        let allowance = decode_stored(&allowance_field(&self.owner, &spender), value)?;
        Ok(Approval {
            owner: self.owner.clone(),
            spender,
            allowance,
        })
    }
}

impl<H: Host + ?Sized> Iterator for Allowances<'_, H> {
    type Item = TokenResult<Approval>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.iter.as_mut()?.next();
        match next {
            None => match self.close() {
                Ok(()) => None,
                Err(err) => Some(Err(err)),
            },
            Some(Err(err)) => self.fail(err.into()),
            Some(Ok(kv)) => match self.decode(&kv.key, &kv.value) {
                Ok(approval) => Some(Ok(approval)),
                Err(err) => self.fail(err),
            },
        }
    }
}

impl<H: Host + ?Sized> Drop for Allowances<'_, H> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(owner = %self.owner, "failed to close allowance scan: {}", err);
        }
    }
}
