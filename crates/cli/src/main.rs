// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use gerrit_fetch::broker::env::ProcessEnv;
use gerrit_fetch::broker::SecretBroker;
use gerrit_fetch::config::{Config, FetchRequest};
use gerrit_fetch::error::FetchError;
use gerrit_fetch::exec::{CommandRunner, SystemRunner};
use gerrit_fetch::revision::FileRevisionSource;
use gerrit_fetch::run::run_in;

/// Exit status after an interrupting signal.
const SIGNAL_EXIT: i32 = 130;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match e.chain().find_map(|cause| cause.downcast_ref::<FetchError>()) {
                Some(fetch_err) => {
                    let code = fetch_err.code();
                    error!(code = code.as_str(), retryable = code.is_retryable(), "fatal: {e:#}");
                }
                None => error!("fatal: {e:#}"),
            }
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is reserved for the pipeline response.
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<i32> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await.context("failed to read request")?;
    let request: FetchRequest =
        serde_json::from_str(&input).context("invalid request on stdin")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let broker = Arc::new(Mutex::new(SecretBroker::new(
        &request.source,
        config.secret_root(),
        Arc::clone(&runner),
        Box::new(ProcessEnv),
    )));

    let job = {
        let broker = Arc::clone(&broker);
        let revisions = FileRevisionSource::new(config.revision.clone());
        let dir = config.dir.clone();
        tokio::task::spawn_blocking(move || {
            run_in(&request, &dir, &broker, &revisions, runner.as_ref())
        })
    };

    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
    let mut sigint =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

    let result = tokio::select! {
        joined = job => joined.context("fetch task failed"),
        _ = async {
            if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
        } => {
            info!("received SIGTERM");
            broker.lock().cleanup();
            return Ok(SIGNAL_EXIT);
        }
        _ = async {
            if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
        } => {
            info!("received SIGINT");
            broker.lock().cleanup();
            return Ok(SIGNAL_EXIT);
        }
    };

    broker.lock().cleanup();

    let outcome = result?.context("in failed")?;
    if let Some(ref target) = outcome.target {
        info!("fetched {} from {}", target.reference, target.url);
    }
    if let Some(ref link) = outcome.link {
        info!("revision link: {link}");
    }
    println!("{}", outcome.response());
    Ok(0)
}
