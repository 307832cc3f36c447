use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use whois_lens::{Cli, QueryLoop};

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_level());

    let gateway = args.gateway();
    tracing::debug!(program = gateway.program(), timeout = ?args.lookup_timeout(), "starting session");

    let session = QueryLoop::new(gateway, args.presenter());
    let stdin = io::stdin();
    let summary = session
        .run(stdin.lock(), io::stdout().lock())
        .context("Terminal I/O failed")?;

    tracing::info!(
        queries = summary.queries,
        succeeded = summary.succeeded,
        failed = summary.failed,
        rejected = summary.rejected,
        "session finished"
    );
    Ok(())
}
