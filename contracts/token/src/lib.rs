//! Accounting core of a fungible-token ledger.
//!
//! Balances, allowances and token metadata live in a host-provided key-value
//! store reached through [`Host`]. [`TokenLedger`] implements the operation
//! state machine on top of it; the host supplies the commit boundary of each
//! invocation.

mod allowance;
mod amount;
mod balance;
mod contract;
mod error;
mod event;
mod host;
mod metadata;
mod operation;
mod storage_types;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;



pub use crate::allowance::{list_allowances, read_allowance, write_allowance, Allowances};
pub use crate::amount::Amount;
pub use crate::balance::{read_balance, write_balance};
pub use crate::contract::{ReservedOps, TokenLedger, TokenTrait};
pub use crate::error::{TokenError, TokenResult};
pub use crate::event::{Approval, TransferEvent, APPROVAL_EVENT, TRANSFER_EVENT};
pub use crate::host::{
    create_composite_key, is_composite_key, split_composite_key, Host, HostError, KeyValue,
    StateIterator, COMPOSITE_KEY_DELIMITER,
};
pub use crate::metadata::{read_metadata, read_total_supply, write_metadata, TokenMetadata};
pub use crate::operation::{
    Call, InitArgs, Operation, Response, STATUS_ERROR, STATUS_NOT_FOUND, STATUS_OK,
};
pub use crate::storage_types::{
    DataKey, KeyLayout, APPROVAL_NAMESPACE, BALANCE_NAMESPACE, METADATA_NAMESPACE,
};
