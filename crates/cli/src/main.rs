// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! conductor - local operator CLI for the MCP server supervisor.
//!
//! This drives `conductor_mcp::Registry` directly in-process; it is a
//! smoke-test surface for the supervisor, not a client to a separate
//! long-running daemon (there isn't one).

mod config_paths;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use conductor_config::McpConfig;
use conductor_mcp::{LoggingEmitter, Registry, StdioConnector, Supervisor};

#[derive(Parser)]
#[command(name = "conductor", version, about = "MCP server supervisor")]
struct Cli {
    /// Path to mcp.yaml (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// MCP server supervision
    #[command(subcommand)]
    Mcp(McpCommand),
}

#[derive(Subcommand)]
enum McpCommand {
    /// Bring up every auto-start and previously-running server, and
    /// stay in the foreground until interrupted
    Run,
    /// Start one server and stay in the foreground until interrupted
    Start { name: String },
    /// Start one server, wait for it to report healthy, print its
    /// status, then stop it
    Status { name: String },
    /// Start one server, wait for it to report healthy, print its
    /// captured stdout/stderr log lines, then stop it
    Logs {
        name: String,
        /// Number of most recent log lines to print
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
    /// List servers known to the config, with their configured
    /// restart policy and auto-start flag
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let paths = config_paths::resolve(cli.config.clone())?;

    match cli.command {
        Commands::Mcp(McpCommand::List) => list(&paths),
        Commands::Mcp(McpCommand::Run) => run_foreground(&paths, None).await,
        Commands::Mcp(McpCommand::Start { name }) => run_foreground(&paths, Some(name)).await,
        Commands::Mcp(McpCommand::Status { name }) => status(&paths, &name).await,
        Commands::Mcp(McpCommand::Logs { name, lines }) => logs(&paths, &name, lines).await,
    }
}

fn load_config(paths: &config_paths::ConfigPaths) -> McpConfig {
    conductor_config::read_tolerant(&paths.mcp_config, |s| serde_yaml::from_str(s)).unwrap_or_default()
}

fn list(paths: &config_paths::ConfigPaths) -> Result<()> {
    let config = load_config(paths);
    let resolved = config.resolve_all().context("resolving mcp.yaml")?;
    if resolved.is_empty() {
        println!("no servers configured ({})", paths.mcp_config.display());
        return Ok(());
    }
    let mut names: Vec<&String> = resolved.keys().collect();
    names.sort();
    for name in names {
        let server = &resolved[name];
        println!(
            "{:<20} auto_start={:<5} restart={:?} command={}",
            name, server.auto_start, server.restart_policy, server.command
        );
    }
    Ok(())
}

fn build_registry(paths: &config_paths::ConfigPaths, config: McpConfig) -> Registry {
    let supervisor = Supervisor::new(Arc::new(StdioConnector), Arc::new(LoggingEmitter));
    Registry::new(supervisor, Arc::new(LoggingEmitter), config, paths.resume_state.clone())
}

async fn run_foreground(paths: &config_paths::ConfigPaths, only: Option<String>) -> Result<()> {
    let config = load_config(paths);
    let registry = build_registry(paths, config);

    match &only {
        Some(name) => registry.start_server(name).await.with_context(|| format!("starting '{name}'"))?,
        None => registry.start().await.context("starting registered servers")?,
    }

    println!("running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    println!("shutting down");
    match &only {
        Some(name) => registry.stop_server(name).await.with_context(|| format!("stopping '{name}'"))?,
        None => registry.stop().await.context("stopping registered servers")?,
    }
    Ok(())
}

/// Polls `ListAllServers` up to 5s for `name` to leave the `Starting` state.
async fn wait_until_settled(registry: &Registry, name: &str) -> Option<conductor_core::server_state::ServerStatus> {
    for _ in 0..100 {
        if let Some(status) = registry.list_all_servers().into_iter().find(|s| s.config.name == name) {
            if !matches!(
                status.status.as_ref().map(|s| s.state),
                Some(conductor_core::server_state::SupervisorState::Starting) | None
            ) {
                return status.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    None
}

async fn status(paths: &config_paths::ConfigPaths, name: &str) -> Result<()> {
    let config = load_config(paths);
    if !config.servers.contains_key(name) {
        bail!("server '{name}' is not registered in {}", paths.mcp_config.display());
    }
    let registry = build_registry(paths, config);

    registry.start_server(name).await.with_context(|| format!("starting '{name}'"))?;

    match wait_until_settled(&registry, name).await {
        Some(status) => println!(
            "{name}: state={:?} tool_count={:?} failure_count={} restart_count={}",
            status.state, status.tool_count, status.failure_count, status.restart_count
        ),
        None => println!("{name}: did not settle within 5s"),
    }

    registry.stop_server(name).await.with_context(|| format!("stopping '{name}'"))?;
    Ok(())
}

async fn logs(paths: &config_paths::ConfigPaths, name: &str, lines: usize) -> Result<()> {
    let config = load_config(paths);
    if !config.servers.contains_key(name) {
        bail!("server '{name}' is not registered in {}", paths.mcp_config.display());
    }
    let registry = build_registry(paths, config);

    registry.start_server(name).await.with_context(|| format!("starting '{name}'"))?;
    wait_until_settled(&registry, name).await;

    match registry.get_logs(name, lines) {
        Some(entries) if entries.is_empty() => println!("{name}: no log lines captured yet"),
        Some(entries) => {
            for entry in entries {
                println!("[{:?}] {} {}", entry.source, entry.timestamp.to_rfc3339(), entry.message);
            }
        }
        None => println!("{name}: not running"),
    }

    registry.stop_server(name).await.with_context(|| format!("stopping '{name}'"))?;
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
