//! The contract between the ledger core and the store that hosts it.
//!
//! The host owns persistence, versioning and the commit boundary of an
//! invocation. The core only reads and writes keys through [`Host`] and hands
//! finished event payloads to [`Host::set_event`].

use crate::operation::Response;
use thiserror::Error;

/// Separator and prefix byte of composite keys.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0}';

/// Errors raised by a host while serving the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid composite key: {0}")]
    InvalidCompositeKey(String),

    #[error("read conflict on key {0:?}")]
    MvccConflict(String),

    #[error("{0} state iterator(s) left open")]
    IteratorLeaked(usize),

    #[error("no ledger named {0:?} is reachable from this host")]
    UnknownLedger(String),
}

/// A single key/value pair returned by a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// A scan handle over host state.
///
/// Hosts may hold resources for the lifetime of the handle; callers release
/// them with [`StateIterator::close`]. Closing twice is allowed and must be
/// a no-op the second time.
pub trait StateIterator: Iterator<Item = Result<KeyValue, HostError>> {
    fn close(&mut self) -> Result<(), HostError>;
}

/// Key-value store and event bus consumed by the ledger core.
pub trait Host {
    /// Read the raw value stored under `key`, `None` when absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, HostError>;

    /// Stage a write of `value` under `key`.
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), HostError>;

    /// Open a scan over every key sharing the partial composite key built
    /// from `namespace` and `parts`, in lexicographic key order.
    fn get_state_by_partial_composite_key(
        &self,
        namespace: &str,
        parts: &[&str],
    ) -> Result<Box<dyn StateIterator + '_>, HostError>;

    /// Publish an event for the current invocation.
    fn set_event(&mut self, name: &str, payload: &[u8]) -> Result<(), HostError>;

    /// Invoke `function` on another ledger reachable by `name` and return its
    /// response. Hosts without peers report [`HostError::UnknownLedger`].
    fn invoke_ledger(
        &mut self,
        name: &str,
        _function: &str,
        _params: &[&str],
    ) -> Result<Response, HostError> {
        Err(HostError::UnknownLedger(name.to_string()))
    }

    fn create_composite_key(&self, namespace: &str, parts: &[&str]) -> Result<String, HostError> {
        create_composite_key(namespace, parts)
    }

    fn split_composite_key(&self, key: &str) -> Result<(String, Vec<String>), HostError> {
        split_composite_key(key)
    }
}

fn validate_composite_part(part: &str) -> Result<(), HostError> {
    if part.contains(COMPOSITE_KEY_DELIMITER) {
        return Err(HostError::InvalidCompositeKey(format!(
            "{part:?} contains the delimiter byte"
        )));
    }
    Ok(())
}

/// Build `\0namespace\0part1\0part2\0...`.
pub fn create_composite_key(namespace: &str, parts: &[&str]) -> Result<String, HostError> {
    if namespace.is_empty() {
        return Err(HostError::InvalidCompositeKey(
            "namespace cannot be empty".to_string(),
        ));
    }
    validate_composite_part(namespace)?;

    let mut key = String::with_capacity(
        2 + namespace.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_DELIMITER);
    key.push_str(namespace);
    key.push(COMPOSITE_KEY_DELIMITER);
    for part in parts {
        validate_composite_part(part)?;
        key.push_str(part);
        key.push(COMPOSITE_KEY_DELIMITER);
    }
    Ok(key)
}

/// Inverse of [`create_composite_key`].
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), HostError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_DELIMITER))
        .ok_or_else(|| HostError::InvalidCompositeKey(format!("{key:?} is not composite")))?;

    let mut components = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_string);
    let namespace = components
        .next()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| HostError::InvalidCompositeKey(format!("{key:?} has no namespace")))?;

    Ok((namespace, components.collect()))
}

/// Whether `key` lives in the composite keyspace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_layout() {
        let key = create_composite_key("approval", &["alice", "bob"]).unwrap();
        assert_eq!(key, "\u{0}approval\u{0}alice\u{0}bob\u{0}");
        assert!(is_composite_key(&key));
    }

    #[test]
    fn test_split_composite_key() {
        let key = create_composite_key("approval", &["alice", "bob"]).unwrap();
        let (ns, parts) = split_composite_key(&key).unwrap();
        assert_eq!(ns, "approval");
        assert_eq!(parts, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_split_keeps_empty_parts() {
        let key = create_composite_key("approval", &["alice", ""]).unwrap();
        let (_, parts) = split_composite_key(&key).unwrap();
        assert_eq!(parts, vec!["alice".to_string(), String::new()]);
    }

    #[test]
    fn test_split_namespace_only() {
        let key = create_composite_key("approval", &[]).unwrap();
        let (ns, parts) = split_composite_key(&key).unwrap();
        assert_eq!(ns, "approval");
        assert!(parts.is_empty());
    }

    #[test]
    fn test_delimiter_in_part_rejected() {
        let result = create_composite_key("approval", &["al\u{0}ice"]);
        assert!(matches!(result, Err(HostError::InvalidCompositeKey(_))));
    }

    #[test]
    fn test_plain_key_is_not_composite() {
        assert!(!is_composite_key("alice"));
        assert!(split_composite_key("alice").is_err());
    }

    #[test]
    fn test_owner_prefix_is_part_bounded() {
        // "al" must not be a byte prefix of alice's keys once terminated.
        let partial = create_composite_key("approval", &["al"]).unwrap();
        let full = create_composite_key("approval", &["alice", "bob"]).unwrap();
        assert!(!full.starts_with(&partial));
    }
}
