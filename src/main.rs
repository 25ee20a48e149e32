//! Application entrypoint and state wiring.

mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use certledger::{storage, Ledger};

#[derive(Parser)]
#[command(name = "certledger", version, about = "Certificate ledger node")]
struct Cli {
    /// Address to serve the HTTP API on.
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Directory for persisted blocks.
    #[arg(short, long, default_value = "data", env = "CERTLEDGER_DATA_DIR")]
    data_dir: PathBuf,

    /// Run fully in-memory (no disk persistence; the chain resets on
    /// restart, invalidating previously stored block references).
    #[arg(short, long)]
    memory: bool,
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    /// `None` in memory mode.
    pub data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing();

    // Replay the persisted chain, or start fresh in memory mode.
    let ledger = if cli.memory {
        info!("memory mode: chain is not persisted and resets on restart");
        Ledger::new()
    } else {
        storage::load_ledger(&cli.data_dir).expect("load ledger from disk")
    };
    info!(blocks = ledger.len(), "ledger ready");

    let state = AppState {
        ledger: Arc::new(Mutex::new(ledger)),
        data_dir: (!cli.memory).then(|| cli.data_dir.clone()),
    };

    let app = Router::new()
        .route("/certificates", post(routes::issue_certificate))
        .route("/certificates/:id", get(routes::get_certificate))
        .route("/certificates/:id/verify", post(routes::verify_certificate))
        .route("/chain", get(routes::list_chain))
        .route("/chain/validate", get(routes::validate_chain))
        .route("/chain/stats", get(routes::chain_stats))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .expect("bind listener");
    info!(addr = %cli.listen, "certificate ledger API ready");
    axum::serve(listener, app).await.expect("serve");
}

/// Initialize the `tracing` subscriber.
///
/// Respects `RUST_LOG` if set, otherwise defaults to `info`.
fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["certledger"]).unwrap();
        assert_eq!(cli.listen, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.data_dir, PathBuf::from("data"));
        assert!(!cli.memory);
    }

    #[test]
    fn cli_memory_flag() {
        let cli = Cli::try_parse_from(["certledger", "--memory"]).unwrap();
        assert!(cli.memory);
    }

    #[test]
    fn cli_listen_override() {
        let cli = Cli::try_parse_from(["certledger", "--listen", "0.0.0.0:8080"]).unwrap();
        assert_eq!(cli.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }
}
