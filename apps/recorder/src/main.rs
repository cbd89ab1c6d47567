//! # Blueprint Recorder
//!
//! The main binary for the blueprint recorder.
//!
//! This application provides:
//! - HTTP server receiving the host's hook invocations (axum-based)
//! - Review page and playground handoff
//! - CLI interface for inspecting and exporting the blueprint
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/recorder (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  Presentation   │  │
//! │  │  (clap)     │    │   (axum)    │    │ (JSON, handoff) │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬────────┘  │
//! │         │                  │                    │           │
//! │         └──────────────────┼────────────────────┘           │
//! │                            ▼                                │
//! │                    ┌───────────────┐                        │
//! │                    │ recorder-core │                        │
//! │                    │  (THE LOGIC)  │                        │
//! │                    └───────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! recorder server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! recorder status
//! recorder apply -f hooks.json
//! recorder url --builder
//! ```

use clap::Parser;
use recorder::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // RECORDER_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("RECORDER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recorder=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┬  ┬ ┬┌─┐┌─┐┬─┐┬┌┐┌┌┬┐
  ├┴┐│  │ │├┤ ├─┘├┬┘││││ │
  └─┘┴─┘└─┘└─┘┴  ┴└─┴┘└┘ ┴  recorder v{}

  Hooks in, blueprint out
"#,
        env!("CARGO_PKG_VERSION")
    );
}
