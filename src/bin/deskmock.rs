//! Helpdesk API emulator binary.
//!
//! Replays request scripts against a fresh in-memory engine, or serves the
//! engine over HTTP when built with the `test-server` feature.

use std::process::ExitCode;

use clap::Parser;
use deskmock::cli::{parse_script, Cli, Command};
use deskmock::output::{KindRow, PrettyPrint};
use deskmock::{EngineConfig, Fixtures, MockEngine, ResourceKind};
use tabled::Table;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: check DESKMOCK_URL, DESKMOCK_USERNAME and DESKMOCK_PAGE_SIZE");
            return ExitCode::FAILURE;
        }
    };

    match run(config, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> deskmock::Result<EngineConfig> {
    let config = EngineConfig::from_env()?;
    match &cli.url {
        Some(url) => config.with_base_url(url),
        None => Ok(config),
    }
}

async fn run(config: EngineConfig, cli: Cli) -> deskmock::Result<()> {
    match cli.command {
        Command::Run {
            script,
            seed,
            fail_fast,
        } => handle_run(&MockEngine::new(config)?, &script, seed, fail_fast, cli.json),
        Command::Kinds => {
            let rows: Vec<KindRow> = ResourceKind::ALL.into_iter().map(KindRow::from).collect();
            println!("{}", Table::new(rows));
            Ok(())
        }
        #[cfg(feature = "test-server")]
        Command::Serve { port, seed } => handle_serve(config, port, seed).await,
    }
}

fn handle_run(
    engine: &MockEngine,
    script: &std::path::Path,
    seed: bool,
    fail_fast: bool,
    json: bool,
) -> deskmock::Result<()> {
    let text = std::fs::read_to_string(script).map_err(|e| {
        deskmock::MockError::InvalidRequest(format!("cannot read {}: {e}", script.display()))
    })?;
    let requests = parse_script(&text)?;

    if seed {
        Fixtures::default_scenario(engine)?;
    }

    let mut failures = 0usize;
    for request in requests {
        let response = engine.handle(request);
        if json {
            println!("{}", serde_json::to_string(&response)?);
        } else {
            println!("{}\n", response.pretty_print());
        }

        if !response.is_success() {
            failures += 1;
            if fail_fast {
                break;
            }
        }
    }

    if failures > 0 {
        return Err(deskmock::MockError::InvalidRequest(format!(
            "{failures} request(s) failed"
        )));
    }
    Ok(())
}

#[cfg(feature = "test-server")]
async fn handle_serve(config: EngineConfig, port: u16, seed: bool) -> deskmock::Result<()> {
    use deskmock::mock_server::MockServer;

    let server = MockServer::bind(port, config).await?;
    if seed {
        Fixtures::default_scenario(server.engine())?;
    }
    eprintln!("Listening on {}", server.url());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| deskmock::MockError::InvalidRequest(format!("signal handler failed: {e}")))?;
    server.shutdown().await;
    Ok(())
}
