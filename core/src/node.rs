//! The front door: one transaction per invocation.
//!
//! An invocation is simulated against a [`TxContext`] (endorsement), then its
//! read/write set is validated and applied by the store (commit). `invoke`
//! does both back to back; `endorse` and `commit` are exposed separately so
//! callers can interleave several endorsements before committing them.
//!
//! Nodes can be connected to each other by name. A call into another ledger
//! is endorsed by that ledger during simulation and committed there just
//! before the calling transaction itself.

use crate::context::{LedgerEvent, TxContext};
use crate::store::{RwSet, Version, VersionedStore};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use token_ledger::{HostError, Operation, Response, TokenError, TokenLedger, STATUS_ERROR};

/// Reported when a transaction lost an MVCC race at commit.
pub const STATUS_CONFLICT: u16 = 409;

/// A simulated invocation waiting to be committed.
#[derive(Debug, Clone)]
pub struct Endorsement {
    pub tx_id: u64,
    pub function: String,
    pub response: Response,
    rw_set: RwSet,
    events: Vec<LedgerEvent>,
    nested: Vec<NestedCall>,
}

/// An endorsed call into another ledger, committed with its caller.
#[derive(Debug, Clone)]
pub struct NestedCall {
    pub ledger: String,
    pub node: Arc<LedgerNode>,
    pub endorsement: Endorsement,
}

/// One ledger replica: a token state machine over its own versioned store.
pub struct LedgerNode {
    ledger: TokenLedger,
    store: VersionedStore,
    events: Mutex<Vec<LedgerEvent>>,
    next_tx: AtomicU64,
    peers: RwLock<BTreeMap<String, Arc<LedgerNode>>>,
}

// Peers are listed by name only; connected nodes may refer back to us.
impl fmt::Debug for LedgerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerNode")
            .field("ledger", &self.ledger)
            .field("height", &self.store.height())
            .field("peers", &self.peers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn host_failure(err: &HostError) -> Response {
    let status = match err {
        HostError::MvccConflict(_) => STATUS_CONFLICT,
        _ => STATUS_ERROR,
    };
    Response {
        status,
        message: err.to_string(),
        payload: Vec::new(),
    }
}

impl LedgerNode {
    pub fn new(ledger: TokenLedger) -> Self {
        Self {
            ledger,
            store: VersionedStore::new(),
            events: Mutex::new(Vec::new()),
            next_tx: AtomicU64::new(1),
            peers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn store(&self) -> &VersionedStore {
        &self.store
    }

    pub fn height(&self) -> Version {
        self.store.height()
    }

    pub fn state_digest(&self) -> String {
        self.store.state_digest()
    }

    /// Committed events in commit order.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Make `peer` reachable from this ledger's invocations under `name`.
    /// Reconnecting a name replaces the previous node.
    pub fn connect(&self, name: &str, peer: Arc<LedgerNode>) {
        tracing::info!(ledger = name, "peer ledger connected");
        self.peers.write().insert(name.to_string(), peer);
    }

    pub fn init<S: AsRef<str>>(&self, params: &[S]) -> Response {
        let endorsement = self.simulate("init", |ctx| self.ledger.init(ctx, params));
        self.commit(endorsement)
    }

    pub fn invoke<S: AsRef<str>>(&self, function: &str, params: &[S]) -> Response {
        let endorsement = self.endorse(function, params);
        self.commit(endorsement)
    }

    /// Run `function` against current committed state without applying it.
    pub fn endorse<S: AsRef<str>>(&self, function: &str, params: &[S]) -> Endorsement {
        self.simulate(function, |ctx| self.ledger.invoke(ctx, function, params))
    }

    fn simulate(&self, function: &str, run: impl FnOnce(&mut TxContext<'_>) -> Response) -> Endorsement {
        let tx_id = self.next_tx.fetch_add(1, Ordering::SeqCst);
        // Snapshot so a nested call back into this node does not hold the lock.
        let peers = self.peers.read().clone();
        let mut ctx = TxContext::new(&self.store, tx_id).with_peers(peers);
        let response = run(&mut ctx);
        let nested = ctx.take_nested();

        let (rw_set, events, nested, response) = match ctx.finish() {
            Ok((rw_set, events)) => (rw_set, events, nested, response),
            Err(err) => {
                tracing::error!(tx_id, function, "transaction left a scan open: {}", err);
                (RwSet::default(), Vec::new(), Vec::new(), host_failure(&err))
            }
        };
        Endorsement {
            tx_id,
            function: function.to_string(),
            response,
            rw_set,
            events,
            nested,
        }
    }

    /// Validate and apply an endorsement. Failed invocations are discarded
    /// without touching the store; events are published only for commits.
    ///
    /// Nested calls commit first, each on its own ledger. If one is rejected
    /// the caller is not applied, but nested calls committed before it stay.
    pub fn commit(&self, endorsement: Endorsement) -> Response {
        let Endorsement {
            tx_id,
            function,
            response,
            rw_set,
            events,
            nested,
        } = endorsement;

        if !response.is_ok() {
            tracing::debug!(tx_id, function = %function, status = response.status, "transaction discarded");
            return response;
        }
        if function.parse::<Operation>().is_ok_and(|op| !op.is_mutating()) {
            return response;
        }

        for call in nested {
            let res = call.node.commit(call.endorsement);
            if !res.is_ok() {
                tracing::warn!(tx_id, function = %function, ledger = %call.ledger, "nested commit rejected: {}", res.message);
                let err = TokenError::CrossLedger {
                    ledger: call.ledger,
                    message: res.message,
                };
                return Response {
                    status: res.status,
                    message: err.to_string(),
                    payload: Vec::new(),
                };
            }
        }

        if rw_set.is_read_only() && events.is_empty() {
            return response;
        }

        // Holding the event log across the commit keeps it in commit order.
        let mut log = self.events.lock();
        match self.store.commit(&rw_set) {
            Ok(version) => {
                tracing::info!(
                    tx_id,
                    function = %function,
                    version,
                    writes = rw_set.writes.len(),
                    events = events.len(),
                    "transaction committed"
                );
                log.extend(events);
                response
            }
            Err(err) => {
                tracing::warn!(tx_id, function = %function, "commit rejected: {}", err);
                host_failure(&err)
            }
        }
    }
}
