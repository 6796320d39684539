//! Committed world state with per-key versions.
//!
//! Invocations never write here directly: they run against a
//! [`TxContext`](crate::context::TxContext), which records what it read and
//! buffers what it wants to write. [`VersionedStore::commit`] then re-checks
//! every recorded read under the write lock and applies the buffered writes
//! only if nothing it depended on has moved.

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use token_ledger::HostError;

/// Height of the commit that last wrote a key.
pub type Version = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Keys returned by one prefix scan, with the version each was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRead {
    pub prefix: String,
    pub observed: Vec<(String, Version)>,
}

/// Everything one invocation read and wants to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RwSet {
    /// Point reads; `None` records that the key was absent.
    pub reads: BTreeMap<String, Option<Version>>,
    pub ranges: Vec<RangeRead>,
    pub writes: BTreeMap<String, Vec<u8>>,
}

impl RwSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    entries: BTreeMap<String, VersionedValue>,
    height: Version,
}

impl StoreState {
    fn scan_prefix(&self, prefix: &str) -> impl Iterator<Item = (&String, &VersionedValue)> + '_ {
        let prefix = prefix.to_string();
        self.entries
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
    }

    fn validate(&self, rw_set: &RwSet) -> Result<(), HostError> {
        for (key, seen) in &rw_set.reads {
            let current = self.entries.get(key).map(|v| v.version);
            if current != *seen {
                return Err(HostError::MvccConflict(key.clone()));
            }
        }
        for range in &rw_set.ranges {
            let mut current = self.scan_prefix(&range.prefix);
            for (key, version) in &range.observed {
                match current.next() {
                    Some((k, v)) if k == key && v.version == *version => {}
                    Some((k, _)) => return Err(HostError::MvccConflict(k.clone())),
                    None => return Err(HostError::MvccConflict(key.clone())),
                }
            }
            // A key that appeared inside the range since the scan is a phantom.
            if let Some((k, _)) = current.next() {
                return Err(HostError::MvccConflict(k.clone()));
            }
        }
        Ok(())
    }
}

/// In-memory versioned key-value store shared by every transaction of a node.
#[derive(Debug, Default)]
pub struct VersionedStore {
    inner: RwLock<StoreState>,
}

impl VersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<VersionedValue> {
        self.inner.read().entries.get(key).cloned()
    }

    /// Snapshot of every committed key starting with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &str) -> Vec<(String, VersionedValue)> {
        self.inner
            .read()
            .scan_prefix(prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of commits applied so far.
    pub fn height(&self) -> Version {
        self.inner.read().height
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate `rw_set` against current state and apply its writes as one
    /// new version. On conflict nothing is applied.
    pub fn commit(&self, rw_set: &RwSet) -> Result<Version, HostError> {
        let mut state = self.inner.write();
        state.validate(rw_set)?;

        let version = state.height + 1;
        for (key, value) in &rw_set.writes {
            state.entries.insert(
                key.clone(),
                VersionedValue {
                    value: value.clone(),
                    version,
                },
            );
        }
        state.height = version;
        tracing::debug!(version, writes = rw_set.writes.len(), "commit applied");
        Ok(version)
    }

    /// Hex SHA-256 over every committed key/value pair in key order.
    ///
    /// Versions are left out, so two stores holding the same data agree
    /// regardless of how it got there.
    pub fn state_digest(&self) -> String {
        let state = self.inner.read();
        let mut hasher = Sha256::new();
        for (key, entry) in &state.entries {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((entry.value.len() as u64).to_be_bytes());
            hasher.update(&entry.value);
        }
        hex::encode(hasher.finalize())
    }
}
