mod cli;
mod error;
mod host;
mod server;
#[cfg(test)]
mod testing;

use std::future::IntoFuture;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hubsync_api::HubClient;
use hubsync_config::Config;
use hubsync_core::{
    CoreError, IngestEndpoint, ReconcileReport, RefreshOutcome, RoutingPreferences, Scheduler,
    SyncEngine,
};

use crate::cli::{Cli, Command, ConfigCommand, SendArgs};
use crate::error::CliError;
use crate::host::LoggingHost;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_json);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.global.config.clone();
    match cli.command.unwrap_or(Command::Run) {
        // Config commands never touch the hub
        Command::Config(ConfigCommand::Path) => {
            println!(
                "{}",
                path.unwrap_or_else(hubsync_config::config_path).display()
            );
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let config = hubsync_config::load_config(path.as_deref())?;
            print!("{}", config.to_redacted_toml()?);
            Ok(())
        }

        cmd => {
            let config = hubsync_config::load_config(path.as_deref())?;
            config.validate()?;
            debug!(command = ?cmd, "dispatching command");
            match cmd {
                Command::Check => check(&config).await,
                Command::Send(args) => send(&config, &args).await,
                _ => serve(&config).await,
            }
        }
    }
}

fn build_engine(config: &Config) -> Result<SyncEngine<HubClient>, CliError> {
    let client = HubClient::new(
        config.app_url()?.as_str(),
        config.app_id()?,
        config.access_token()?,
        &config.transport_config(),
    )?;
    Ok(SyncEngine::new(
        Arc::new(client),
        Arc::new(LoggingHost::default()),
        config.to_engine_config(),
    ))
}

// ── run ─────────────────────────────────────────────────────────────

async fn serve(config: &Config) -> Result<(), CliError> {
    let engine = build_engine(config)?;
    let scheduler = Scheduler::new(engine.clone());

    match scheduler.start(engine.config().polling_interval).await {
        RefreshOutcome::Failed(err @ CoreError::Unauthorized { .. }) => {
            scheduler.shutdown().await;
            return Err(err.into());
        }
        RefreshOutcome::Failed(err) => {
            warn!(error = %err, "initial refresh failed; serving an empty cache");
        }
        RefreshOutcome::Completed(_) | RefreshOutcome::Coalesced => {}
    }

    let endpoint = IngestEndpoint::new(engine.clone(), config.to_ingest_config()?);
    let addr = listen_addr(config.direct_port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            scheduler.shutdown().await;
            return Err(CliError::Bind {
                addr: addr.to_string(),
                source,
            });
        }
    };
    info!(%addr, "direct-connect listener ready");

    if let Err(err) = engine
        .client()
        .send_start_direct(
            &config.direct_ip().to_string(),
            config.direct_port,
            env!("CARGO_PKG_VERSION"),
        )
        .await
    {
        warn!(error = %err, "could not announce the direct-connect endpoint");
    }

    let restart = engine.restart_signal();
    let outcome = tokio::select! {
        result = axum::serve(listener, server::router(endpoint)).into_future() => {
            result.map_err(CliError::Io)
        }
        () = restart.cancelled() => Err(CliError::RestartRequested),
        result = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            result.map_err(CliError::Io)
        }
    };

    engine.shutdown();
    scheduler.shutdown().await;
    outcome
}

/// All interfaces; `direct_ip` is only what we announce to the hub.
fn listen_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

// ── check ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CheckSummary {
    report: ReconcileReport,
    preferences: Arc<RoutingPreferences>,
}

async fn check(config: &Config) -> Result<(), CliError> {
    let engine = build_engine(config)?;
    let report = engine.run_cycle().await?;
    let summary = CheckSummary {
        report,
        preferences: engine.preferences(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

// ── command ─────────────────────────────────────────────────────────

async fn send(config: &Config, args: &SendArgs) -> Result<(), CliError> {
    let engine = build_engine(config)?;
    engine.run_cycle().await?;

    let values = parse_values(&args.values);
    engine
        .send_command(&args.device_id, &args.command, &values)
        .await?;
    println!("sent {} to {}", args.command, args.device_id);
    Ok(())
}

/// JSON where it parses, a plain string otherwise.
fn parse_values(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|v| serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn command_values_fall_back_to_strings() {
        let raw = ["40", "red", "{\"hue\":10}", "true"].map(String::from);
        assert_eq!(
            parse_values(&raw),
            vec![json!(40), json!("red"), json!({ "hue": 10 }), json!(true)]
        );
    }

    #[test]
    fn listener_binds_all_interfaces_regardless_of_announced_ip() {
        let addr = listen_addr(8123);
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8123);
    }
}
