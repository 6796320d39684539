use ledger_host::{init_logging, load_config, run_token_benchmark, LedgerNode, NodeError};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    // -------------------------------
    // Load configuration
    // -------------------------------
    let config = load_config()?;

    // -------------------------------
    // Initialize Tracing / Logging
    // -------------------------------
    init_logging(&config.rust_log, config.log_format());
    tracing::info!("Ledger host starting with config: {:?}", config);

    // -------------------------------
    // Genesis
    // -------------------------------
    let node = Arc::new(LedgerNode::new(config.ledger()?));
    let genesis = node.init(&config.genesis_params());
    if !genesis.is_ok() {
        return Err(NodeError::Genesis(genesis.message));
    }
    tracing::info!(
        token = %config.token_name,
        owner = %config.token_owner,
        supply = config.token_supply,
        layout = ?node.ledger().layout(),
        reserved_ops = ?node.ledger().reserved_ops(),
        "token initialized"
    );

    // -------------------------------
    // CLI Argument Handling (Benchmark)
    // -------------------------------
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "benchmark" {
        tracing::info!("Starting ledger benchmark...");
        let report = run_token_benchmark(
            Arc::clone(&node),
            &config.token_name,
            &config.token_owner,
            config.benchmark(),
        )
        .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tracing::info!(
        height = node.height(),
        digest = %node.state_digest(),
        "ledger ready; run with `benchmark` to drive a workload"
    );
    Ok(())
}
