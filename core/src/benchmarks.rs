use crate::errors::NodeError;
use crate::node::{LedgerNode, STATUS_CONFLICT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use token_ledger::STATUS_OK;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BenchmarkConfig {
    pub accounts: usize,
    pub rounds: usize,
    pub workers: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerStats {
    pub invocations: u64,
    pub committed: u64,
    pub rejected: u64,
    pub conflicts: u64,
}

impl WorkerStats {
    fn record(&mut self, status: u16) {
        self.invocations += 1;
        match status {
            STATUS_OK => self.committed += 1,
            STATUS_CONFLICT => self.conflicts += 1,
            _ => self.rejected += 1,
        }
    }

    fn merge(&mut self, other: &WorkerStats) {
        self.invocations += other.invocations;
        self.committed += other.committed;
        self.rejected += other.rejected;
        self.conflicts += other.conflicts;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub config: BenchmarkConfig,
    pub stats: WorkerStats,
    pub elapsed_ms: u128,
    pub invocations_per_sec: f64,
    pub height: u64,
    pub events: usize,
    pub supply: i64,
    pub state_digest: String,
}

pub fn account_name(index: usize) -> String {
    format!("acct-{index:03}")
}

/// One random invocation over the benchmark accounts. Amounts are chosen so
/// that a share of calls fail on balance or allowance checks.
fn random_call(rng: &mut StdRng, accounts: usize) -> (&'static str, Vec<String>) {
    let pick = |rng: &mut StdRng| account_name(rng.gen_range(0..accounts));
    let a = pick(rng);
    let b = pick(rng);
    let amount = rng.gen_range(1..=250i64).to_string();

    match rng.gen_range(0..10) {
        0..=3 => ("transfer", vec![a, b, amount]),
        4 => ("approve", vec![a, b, amount]),
        5 | 6 => {
            let c = pick(rng);
            ("transferFrom", vec![a, b, c, amount])
        }
        7 => ("increaseAllowance", vec![a, b, amount]),
        8 => ("decreaseAllowance", vec![a, b, amount]),
        _ => ("balanceOf", vec![a]),
    }
}

fn query_amount(node: &LedgerNode, function: &str, params: &[&str]) -> Result<i64, NodeError> {
    let res = node.invoke(function, params);
    let unexpected = |message: String| NodeError::UnexpectedResponse {
        function: function.to_string(),
        message,
    };
    if !res.is_ok() {
        return Err(unexpected(res.message));
    }
    res.payload_str()
        .parse()
        .map_err(|e| unexpected(format!("payload {:?}: {e}", res.payload_str())))
}

/// Spread part of the owner's supply across the benchmark accounts.
fn fund_accounts(node: &LedgerNode, owner: &str, accounts: usize) -> Result<(), NodeError> {
    let supply = query_amount(node, "balanceOf", &[owner])?;
    let share = (supply / (2 * accounts.max(1) as i64)).max(1).to_string();
    for index in 0..accounts {
        let account = account_name(index);
        let res = node.invoke("transfer", &[owner, account.as_str(), share.as_str()]);
        if !res.is_ok() {
            return Err(NodeError::UnexpectedResponse {
                function: "transfer".to_string(),
                message: res.message,
            });
        }
    }
    Ok(())
}

/// Drive a random workload from several concurrent workers against one node
/// and check that the supply is still fully accounted for afterwards.
pub async fn run_token_benchmark(
    node: Arc<LedgerNode>,
    token_name: &str,
    owner: &str,
    config: BenchmarkConfig,
) -> Result<BenchmarkReport, NodeError> {
    let supply = query_amount(&node, "totalSupply", &[token_name])?;

    fund_accounts(&node, owner, config.accounts)?;
    tracing::info!(accounts = config.accounts, workers = config.workers, "accounts funded");

    let started = Instant::now();
    let mut handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let node = Arc::clone(&node);
        let seed = config.seed.wrapping_add(worker as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut stats = WorkerStats::default();
            for _ in 0..config.rounds {
                let (function, params) = random_call(&mut rng, config.accounts.max(1));
                stats.record(node.invoke(function, params.as_slice()).status);
            }
            tracing::debug!(worker, committed = stats.committed, conflicts = stats.conflicts, "worker finished");
            stats
        }));
    }

    let mut stats = WorkerStats::default();
    for handle in handles {
        stats.merge(&handle.await?);
    }
    let elapsed = started.elapsed();

    let mut total = query_amount(&node, "balanceOf", &[owner])?;
    for index in 0..config.accounts {
        total += query_amount(&node, "balanceOf", &[account_name(index).as_str()])?;
    }
    if total != supply {
        return Err(NodeError::ConservationViolated {
            expected: supply,
            actual: total,
        });
    }

    let secs = elapsed.as_secs_f64();
    let report = BenchmarkReport {
        config,
        invocations_per_sec: if secs > 0.0 { stats.invocations as f64 / secs } else { 0.0 },
        stats,
        elapsed_ms: elapsed.as_millis(),
        height: node.height(),
        events: node.events().len(),
        supply,
        state_digest: node.state_digest(),
    };
    tracing::info!(
        committed = report.stats.committed,
        rejected = report.stats.rejected,
        conflicts = report.stats.conflicts,
        elapsed_ms = report.elapsed_ms as u64,
        "benchmark finished"
    );
    Ok(report)
}
