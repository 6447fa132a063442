// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use clap::{Parser, Subcommand};
use serde_json::json;

use remote_resolver_proofs::config::GatewayConfig;
use remote_resolver_proofs::proofs::common::to_hex;
use remote_resolver_proofs::proofs::derive_slot;
use remote_resolver_proofs::telemetry::init_tracing;
use remote_resolver_proofs::types::{FieldKind, RecordKey, SubKey};
use remote_resolver_proofs::{server, Gateway};

#[derive(Parser)]
#[command(name = "resolver-gateway", version, about = "Storage-proof gateway for remote resolver records")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Config file; falls back to inline JSON in GATEWAY_CONFIG
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 8081)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },
    /// Answer a single request and print the response with its proofs
    Prove {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Resolver the call was sent to
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        calldata: Bytes,
    },
    /// Print the storage slot of a record (no RPC)
    Slot {
        #[arg(long)]
        context: Address,
        #[arg(long)]
        node: B256,
        /// text, addr, abi, contenthash, name, pubkey-x, pubkey-y, dns-record,
        /// has-dns-records, zonehash or interface
        #[arg(long)]
        field: String,
        /// Sub-key in the shape the field expects (dns-record: <namehash>:<resource>)
        #[arg(long)]
        sub_key: Option<String>,
        #[arg(long, default_value_t = 0)]
        version: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Command::Serve { config, port, host } => {
            let config = GatewayConfig::load(config.as_deref())?;
            let gateway = Gateway::from_config(&config).await?;
            server::serve(Arc::new(gateway), SocketAddr::new(host, port)).await?;
        }
        Command::Prove {
            config,
            sender,
            calldata,
        } => {
            let config = GatewayConfig::load(config.as_deref())?;
            let gateway = Gateway::from_config(&config).await?;
            let response = gateway.handle(sender, &calldata).await?;
            let out = json!({
                "data": to_hex(response.encode()?),
                "result": response.result,
                "proofs": response.proofs,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Slot {
            context,
            node,
            field,
            sub_key,
            version,
        } => {
            let field = FieldKind::from_str(&field)?;
            let sub_key = sub_key
                .map(|s| SubKey::parse_for(field, &s))
                .transpose()?;
            anyhow::ensure!(
                field.accepts(sub_key.as_ref()),
                "field {field} expects a different sub-key"
            );
            let key = RecordKey::new(context, node, field, sub_key, version);
            let slot = derive_slot(&key);
            println!("{}", to_hex(slot.as_bytes()));
        }
    }
    Ok(())
}
