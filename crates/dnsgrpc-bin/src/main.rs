//! CLI Entry Point for dnsgrpc
//!
//! Queries a gRPC DNS server and optionally keeps a watch open, printing a
//! fresh answer every time the server reports a change.
//!
//! # Usage
//!
//! One-shot query:
//! ```bash
//! dnsgrpc --server localhost:5553 example.org A
//! ```
//!
//! Query, then watch for changes over TLS:
//! ```bash
//! dnsgrpc -w --ca ca.pem --cert client.pem --key client.key example.org AAAA
//! ```

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod logging;
mod output;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dnsgrpc_client::{resolve_address, ClientConfig, DnsClient, TlsConfig, WatchResult};
use hickory_proto::rr::RecordType;
use tokio::signal;

use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "dnsgrpc")]
#[command(about = "Query a gRPC DNS server and watch for changes", long_about = None)]
struct Cli {
    /// Name to look up
    name: String,

    /// Record type
    #[arg(default_value = "A")]
    record_type: String,

    /// Log verbosely and print full messages
    #[arg(short, long)]
    verbose: bool,

    /// Start a watch after the initial query
    #[arg(short, long)]
    watch: bool,

    /// Server host:port (overrides config file and DNSGRPC_SERVER)
    #[arg(long)]
    server: Option<String>,

    /// TLS cert PEM file path
    #[arg(long)]
    cert: Option<PathBuf>,

    /// TLS key PEM file path
    #[arg(long)]
    key: Option<PathBuf>,

    /// TLS CA cert PEM file path
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Don't use TLS, even if TLS files are configured
    #[arg(long)]
    insecure: bool,

    /// Configuration file (TOML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::load().context("Failed to load config from environment")?,
    };
    config.validate()?;

    let record_type = parse_record_type(&cli.record_type)?;
    let address = resolve_address(cli.server.as_deref(), config.server.as_deref())
        .context("Invalid --server")?;
    let tls = select_tls(&cli, config.tls.clone());

    if cli.verbose {
        let action = if cli.watch {
            "Querying and setting a watch for"
        } else {
            "Querying for"
        };
        println!(
            "{action} {record_type} records for {} on server {address} ({})",
            cli.name,
            address.source()
        );
    }

    let client = DnsClient::connect(&address, &config.channel, tls.as_ref())
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;

    let reply = client
        .query_name_and_type(&cli.name, record_type)
        .await
        .context("Query failed")?;
    print!("{}", output::render(&reply, cli.verbose));

    if cli.watch {
        run_watch(&client, &cli.name, record_type, cli.verbose).await?;
    }

    Ok(())
}

/// Watch until the server ends it. Ctrl-C asks the server to cancel; a
/// second Ctrl-C gives up waiting for the acknowledgement.
async fn run_watch(
    client: &DnsClient,
    name: &str,
    record_type: RecordType,
    verbose: bool,
) -> Result<()> {
    let mut watch = client
        .watch_name_and_type(name, record_type)
        .await
        .context("Failed to start watch")?;
    if verbose {
        println!("Started watch {}", watch.id());
    }

    let mut stop_sent = false;
    loop {
        tokio::select! {
            result = watch.recv() => match result {
                Some(WatchResult::Resolved(message)) => print!("{}", output::render(&message, verbose)),
                Some(WatchResult::Error(err)) => println!("Error: {err}"),
                Some(WatchResult::End) => {
                    println!("Watch ended by server. Stopping.");
                    return Ok(());
                }
                None => {
                    tracing::debug!(watch_id = watch.id(), "Watch closed");
                    return Ok(());
                }
            },
            _ = signal::ctrl_c() => {
                if stop_sent {
                    tracing::warn!(watch_id = watch.id(), "No cancel acknowledgement, exiting");
                    return Ok(());
                }
                stop_sent = true;
                if let Err(e) = watch.stop() {
                    tracing::warn!(watch_id = watch.id(), error = %e, "Failed to cancel watch");
                    return Ok(());
                }
            }
        }
    }
}

fn parse_record_type(input: &str) -> Result<RecordType> {
    RecordType::from_str(&input.to_uppercase())
        .map_err(|_| anyhow!("Unknown record type: {input}"))
}

/// Command-line TLS files win over the config file; `--insecure` drops both.
fn select_tls(cli: &Cli, configured: Option<TlsConfig>) -> Option<TlsConfig> {
    if cli.insecure {
        return None;
    }
    TlsConfig::from_parts(cli.cert.clone(), cli.key.clone(), cli.ca.clone()).or(configured)
}
