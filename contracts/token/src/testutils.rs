//! In-memory host for exercising the ledger without a real store.
//!
//! `MockHost` keeps state in a `BTreeMap` so scans come back in key order,
//! records every emitted event, counts open scan handles and can inject
//! store failures. `mock_init` / `mock_invoke` wrap a call in a transaction:
//! when the response is not a success, state and events are rolled back, the
//! way a real host discards a failed invocation. Other ledgers reachable
//! through `invoke_ledger` are registered with `add_peer`; each peer call is
//! its own transaction on the peer.

use crate::contract::TokenLedger;
use crate::host::{Host, HostError, KeyValue, StateIterator};
use crate::operation::Response;
use std::cell::Cell;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

impl RecordedEvent {
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_writes: bool,
    fail_read_of: Option<String>,
    fail_scans: bool,
    fail_scan_item: Option<usize>,
    fail_close: bool,
}

#[derive(Debug, Default)]
pub struct MockHost {
    state: BTreeMap<String, Vec<u8>>,
    events: Vec<RecordedEvent>,
    open_iterators: Cell<usize>,
    opened_iterators: Cell<usize>,
    faults: Faults,
    peers: BTreeMap<String, (TokenLedger, MockHost)>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mock_init(&mut self, ledger: &TokenLedger, params: &[&str]) -> Response {
        self.transaction(|host| ledger.init(host, params))
    }

    pub fn mock_invoke(&mut self, ledger: &TokenLedger, function: &str, params: &[&str]) -> Response {
        self.transaction(|host| ledger.invoke(host, function, params))
    }

    fn transaction(&mut self, run: impl FnOnce(&mut Self) -> Response) -> Response {
        let state = self.state.clone();
        let events = self.events.len();
        let response = run(self);
        if !response.is_ok() {
            self.state = state;
            self.events.truncate(events);
        }
        response
    }

    pub fn state(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.state
    }

    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    pub fn put_raw(&mut self, key: &str, value: &[u8]) {
        self.state.insert(key.to_string(), value.to_vec());
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Scan handles opened but not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.get()
    }

    pub fn opened_iterators(&self) -> usize {
        self.opened_iterators.get()
    }

    /// Make `host`, running `ledger`, reachable under `name`.
    pub fn add_peer(&mut self, name: &str, ledger: TokenLedger, host: MockHost) {
        self.peers.insert(name.to_string(), (ledger, host));
    }

    pub fn peer(&self, name: &str) -> Option<&MockHost> {
        self.peers.get(name).map(|(_, host)| host)
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.faults.fail_writes = fail;
    }

    pub fn fail_read_of(&mut self, key: Option<&str>) {
        self.faults.fail_read_of = key.map(str::to_string);
    }

    pub fn fail_scans(&mut self, fail: bool) {
        self.faults.fail_scans = fail;
    }

    /// Make scans yield an error in place of their `index`-th entry.
    pub fn fail_scan_item(&mut self, index: Option<usize>) {
        self.faults.fail_scan_item = index;
    }

    pub fn fail_close(&mut self, fail: bool) {
        self.faults.fail_close = fail;
    }
}

impl Host for MockHost {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, HostError> {
        if self.faults.fail_read_of.as_deref() == Some(key) {
            return Err(HostError::Backend(format!("injected read failure on {key:?}")));
        }
        Ok(self.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), HostError> {
        if self.faults.fail_writes {
            return Err(HostError::Backend(format!("injected write failure on {key:?}")));
        }
        self.state.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_state_by_partial_composite_key(
        &self,
        namespace: &str,
        parts: &[&str],
    ) -> Result<Box<dyn StateIterator + '_>, HostError> {
        if self.faults.fail_scans {
            return Err(HostError::Backend("injected scan failure".to_string()));
        }
        let prefix = self.create_composite_key(namespace, parts)?;
        let entries: Vec<KeyValue> = self
            .state
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        self.open_iterators.set(self.open_iterators.get() + 1);
        self.opened_iterators.set(self.opened_iterators.get() + 1);
        Ok(Box::new(MockIterator {
            entries: entries.into_iter(),
            open: &self.open_iterators,
            closed: false,
            yielded: 0,
            fail_at: self.faults.fail_scan_item,
            fail_close: self.faults.fail_close,
        }))
    }

    fn set_event(&mut self, name: &str, payload: &[u8]) -> Result<(), HostError> {
        self.events.push(RecordedEvent {
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn invoke_ledger(&mut self, name: &str, function: &str, params: &[&str]) -> Result<Response, HostError> {
        let (ledger, host) = self
            .peers
            .get_mut(name)
            .ok_or_else(|| HostError::UnknownLedger(name.to_string()))?;
        Ok(host.mock_invoke(ledger, function, params))
    }
}

struct MockIterator<'a> {
    entries: std::vec::IntoIter<KeyValue>,
    open: &'a Cell<usize>,
    closed: bool,
    yielded: usize,
    fail_at: Option<usize>,
    fail_close: bool,
}

impl Iterator for MockIterator<'_> {
    type Item = Result<KeyValue, HostError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        let index = self.yielded;
        self.yielded += 1;
        if self.fail_at == Some(index) {
            return Some(Err(HostError::Backend(format!(
                "injected scan failure at entry {index}"
            ))));
        }
        self.entries.next().map(Ok)
    }
}

impl StateIterator for MockIterator<'_> {
    fn close(&mut self) -> Result<(), HostError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.open.set(self.open.get().saturating_sub(1));
        if self.fail_close {
            return Err(HostError::Backend("injected close failure".to_string()));
        }
        Ok(())
    }
}
