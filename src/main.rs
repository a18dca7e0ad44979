//! RPC Gateway
//!
//! A failover gateway for JSON-RPC providers built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     RPC GATEWAY                       │
//!                    │                                                       │
//!   Client Request   │  ┌──────────┐    ┌──────────────┐    ┌────────────┐  │
//!   ─────────────────┼─▶│   http   │───▶│   routing    │───▶│  upstream  │──┼──▶ Target A
//!                    │  │  server  │    │   failover   │    │  pipeline  │──┼──▶ Target B
//!                    │  └──────────┘    └──────┬───────┘    └────────────┘──┼──▶ Target C
//!   Client Response  │        ▲                │                             │
//!   ◀────────────────┼────────┴── committed ◀──┘                             │
//!                    │                                                       │
//!                    │  ┌─────────────────────────────────────────────────┐  │
//!                    │  │              Cross-Cutting Concerns              │  │
//!                    │  │   config + reload   health   observability      │  │
//!                    │  │   resilience (timeouts)   lifecycle             │  │
//!                    │  └─────────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rpc-gateway", version, about = "Failover gateway for JSON-RPC providers")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    rpc_gateway::lifecycle::start(&cli.config).await?;
    Ok(())
}
