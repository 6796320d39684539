use crate::amount::Amount;
use crate::error::{TokenError, TokenResult};
use crate::host::Host;
use serde::{Deserialize, Serialize};

pub const TRANSFER_EVENT: &str = "transferEvent";
pub const APPROVAL_EVENT: &str = "approvalEvent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
}

/// Approval event payload, also the entry type of an owner's approval list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: String,
    pub spender: String,
    pub allowance: Amount,
}

/// A payload ready to hand to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEvent {
    pub name: &'static str,
    pub payload: Vec<u8>,
}

impl TransferEvent {
    pub fn encode(&self) -> TokenResult<EncodedEvent> {
        encode_event(TRANSFER_EVENT, self)
    }
}

impl Approval {
    pub fn encode(&self) -> TokenResult<EncodedEvent> {
        encode_event(APPROVAL_EVENT, self)
    }
}

fn encode_event<T: Serialize>(name: &'static str, event: &T) -> TokenResult<EncodedEvent> {
    let payload = serde_json::to_vec(event).map_err(|source| TokenError::Encoding {
        what: name,
        source,
    })?;
    Ok(EncodedEvent { name, payload })
}

pub fn emit<H: Host + ?Sized>(e: &mut H, event: &EncodedEvent) -> TokenResult<()> {
    e.set_event(event.name, &event.payload)?;
    tracing::debug!(event = event.name, "event emitted");
    Ok(())
}
