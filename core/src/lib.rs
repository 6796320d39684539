//! Reference host for the token ledger: an in-process versioned store with
//! optimistic concurrency control, run one transaction per invocation.

pub mod benchmarks;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod node;
pub mod store;

pub use crate::benchmarks::{run_token_benchmark, BenchmarkConfig, BenchmarkReport};
pub use crate::config::{load_config, AppConfig};
pub use crate::context::{LedgerEvent, TxContext};
pub use crate::errors::NodeError;
pub use crate::logging::{init_logging, LogFormat};
pub use crate::node::{Endorsement, LedgerNode, NestedCall, STATUS_CONFLICT};
pub use crate::store::{RangeRead, RwSet, Version, VersionedStore, VersionedValue};
