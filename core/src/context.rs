//! Per-invocation view of the store.

use crate::node::{LedgerNode, NestedCall};
use crate::store::{RangeRead, RwSet, Version, VersionedStore};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;
use token_ledger::{Host, HostError, KeyValue, Response, StateIterator};

/// An event emitted by an invocation, tagged with its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEvent {
    pub tx_id: u64,
    pub name: String,
    pub payload: Vec<u8>,
}

/// The `Host` one invocation runs against.
///
/// Reads go to the committed store (or to this transaction's own pending
/// writes) and are recorded with the version they saw. Writes and events are
/// buffered until [`TxContext::finish`]; dropping the context discards them.
/// Calls into other ledgers are endorsed on the spot and held until commit.
pub struct TxContext<'s> {
    store: &'s VersionedStore,
    tx_id: u64,
    reads: RefCell<BTreeMap<String, Option<Version>>>,
    ranges: RefCell<Vec<RangeRead>>,
    writes: BTreeMap<String, Vec<u8>>,
    events: Vec<LedgerEvent>,
    open_iterators: Cell<usize>,
    peers: BTreeMap<String, Arc<LedgerNode>>,
    nested: Vec<NestedCall>,
}

impl<'s> TxContext<'s> {
    pub fn new(store: &'s VersionedStore, tx_id: u64) -> Self {
        Self {
            store,
            tx_id,
            reads: RefCell::default(),
            ranges: RefCell::default(),
            writes: BTreeMap::new(),
            events: Vec::new(),
            open_iterators: Cell::new(0),
            peers: BTreeMap::new(),
            nested: Vec::new(),
        }
    }

    /// Ledgers reachable through `invoke_ledger`, by name.
    pub fn with_peers(mut self, peers: BTreeMap<String, Arc<LedgerNode>>) -> Self {
        self.peers = peers;
        self
    }

    /// Successful calls into other ledgers, in call order.
    pub fn take_nested(&mut self) -> Vec<NestedCall> {
        std::mem::take(&mut self.nested)
    }

    pub fn open_iterators(&self) -> usize {
        self.open_iterators.get()
    }

    /// Close the transaction and hand back what it read, wrote and emitted.
    /// Refuses while a scan handle is still open.
    pub fn finish(self) -> Result<(RwSet, Vec<LedgerEvent>), HostError> {
        let open = self.open_iterators.get();
        if open > 0 {
            return Err(HostError::IteratorLeaked(open));
        }
        let rw_set = RwSet {
            reads: self.reads.into_inner(),
            ranges: self.ranges.into_inner(),
            writes: self.writes,
        };
        Ok((rw_set, self.events))
    }
}

impl Host for TxContext<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, HostError> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(Some(pending.clone()));
        }
        let committed = self.store.get(key);
        self.reads
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| committed.as_ref().map(|v| v.version));
        Ok(committed.map(|v| v.value))
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), HostError> {
        if key.is_empty() {
            return Err(HostError::Backend("key cannot be empty".to_string()));
        }
        self.writes.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_state_by_partial_composite_key(
        &self,
        namespace: &str,
        parts: &[&str],
    ) -> Result<Box<dyn StateIterator + '_>, HostError> {
        let prefix = self.create_composite_key(namespace, parts)?;
        let committed = self.store.scan_prefix(&prefix);

        self.ranges.borrow_mut().push(RangeRead {
            prefix: prefix.clone(),
            observed: committed.iter().map(|(k, v)| (k.clone(), v.version)).collect(),
        });

        let mut merged: BTreeMap<String, Vec<u8>> =
            committed.into_iter().map(|(k, v)| (k, v.value)).collect();
        for (key, value) in self.writes.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            merged.insert(key.clone(), value.clone());
        }

        self.open_iterators.set(self.open_iterators.get() + 1);
        Ok(Box::new(ScanIterator {
            entries: merged.into_iter(),
            open: &self.open_iterators,
            closed: false,
        }))
    }

    fn set_event(&mut self, name: &str, payload: &[u8]) -> Result<(), HostError> {
        self.events.push(LedgerEvent {
            tx_id: self.tx_id,
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn invoke_ledger(&mut self, name: &str, function: &str, params: &[&str]) -> Result<Response, HostError> {
        let node = self
            .peers
            .get(name)
            .ok_or_else(|| HostError::UnknownLedger(name.to_string()))?;
        let endorsement = node.endorse(function, params);
        let response = endorsement.response.clone();
        tracing::debug!(tx_id = self.tx_id, ledger = name, function, status = response.status, "nested call endorsed");
        if response.is_ok() {
            self.nested.push(NestedCall {
                ledger: name.to_string(),
                node: Arc::clone(node),
                endorsement,
            });
        }
        Ok(response)
    }
}

struct ScanIterator<'a> {
    entries: std::collections::btree_map::IntoIter<String, Vec<u8>>,
    open: &'a Cell<usize>,
    closed: bool,
}

impl Iterator for ScanIterator<'_> {
    type Item = Result<KeyValue, HostError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.entries
            .next()
            .map(|(key, value)| Ok(KeyValue { key, value }))
    }
}

impl StateIterator for ScanIterator<'_> {
    fn close(&mut self) -> Result<(), HostError> {
        if !self.closed {
            self.closed = true;
            self.open.set(self.open.get().saturating_sub(1));
        }
        Ok(())
    }
}
