//! pwapush relay server
//!
//! HTTP service that stores browser push subscriptions and relays
//! notifications to them through the browsers' push services.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pwapush_core::{InMemorySubscriptionStore, SubscriptionRepository};
use pwapush_relay::notifications::transport::{DEFAULT_TTL_SECS, DEFAULT_VAPID_SUBJECT};
use pwapush_relay::notifications::{PushTransport, VapidKeys, WebPushTransport};
use pwapush_relay::routes::{AppState, RelayOptions, build_router};

#[derive(Parser, Debug)]
#[command(name = "pwapush-relay")]
#[command(
    version,
    about = "pwapush relay server - push subscription registry and Web Push fan-out"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Address to listen on. Overrides --port.
    #[arg(long, env = "LISTEN_ADDR")]
    addr: Option<SocketAddr>,

    /// Port to listen on (all interfaces).
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// VAPID public key (base64url, uncompressed P-256 point).
    #[arg(long, env = "PUBLIC_VAPID_KEY", hide_env_values = true)]
    public_vapid_key: Option<String>,

    /// VAPID private key (base64url, raw P-256 scalar).
    #[arg(long, env = "PRIVATE_VAPID_KEY", hide_env_values = true)]
    private_vapid_key: Option<String>,

    /// Contact URI sent to push services in the VAPID `sub` claim.
    #[arg(long, env = "VAPID_SUBJECT", default_value = DEFAULT_VAPID_SUBJECT)]
    vapid_subject: String,

    /// Per-subscription delivery timeout in seconds.
    #[arg(
        long,
        env = "PWAPUSH_DELIVERY_TIMEOUT_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    delivery_timeout_secs: u64,

    /// How long push services may hold an undelivered message, in seconds.
    #[arg(long, env = "PWAPUSH_TTL_SECS", default_value_t = DEFAULT_TTL_SECS)]
    ttl_secs: u32,

    /// Do not send a welcome notification to new subscriptions.
    #[arg(long, env = "PWAPUSH_NO_WELCOME")]
    no_welcome: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "PWAPUSH_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh VAPID keypair as environment assignments and exit.
    GenerateVapidKeys,
}

impl Args {
    fn listen_addr(&self) -> SocketAddr {
        self.addr
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if matches!(args.command, Some(Command::GenerateVapidKeys)) {
        print_vapid_keys(&VapidKeys::generate());
        return Ok(());
    }

    pwapush_core::tracing_init::init_tracing(
        "pwapush_relay=info,pwapush_core=info,tower_http=info",
        args.log_json,
    );

    // Missing or malformed key material stops the process before it binds.
    let keys = VapidKeys::from_base64url(
        args.public_vapid_key.as_deref().unwrap_or_default(),
        args.private_vapid_key.as_deref().unwrap_or_default(),
    )
    .context("set PUBLIC_VAPID_KEY and PRIVATE_VAPID_KEY (see `pwapush-relay generate-vapid-keys`)")?;

    let addr = args.listen_addr();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        public_key = %keys.public_key(),
        "Starting pwapush-relay"
    );

    let delivery_timeout = Duration::from_secs(args.delivery_timeout_secs);
    let public_key = keys.public_key().to_string();
    let transport: Arc<dyn PushTransport> = Arc::new(WebPushTransport::new(
        keys,
        args.vapid_subject.clone(),
        args.ttl_secs,
        delivery_timeout,
    )?);
    let store: Arc<dyn SubscriptionRepository> = Arc::new(InMemorySubscriptionStore::new());

    let state = AppState::new(
        Arc::clone(&store),
        transport,
        &public_key,
        RelayOptions {
            delivery_timeout,
            welcome: !args.no_welcome,
        },
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(subscriptions = store.count().await, "Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[allow(clippy::print_stdout)]
fn print_vapid_keys(keys: &VapidKeys) {
    println!("PUBLIC_VAPID_KEY={}", keys.public_key());
    println!("PRIVATE_VAPID_KEY={}", keys.private_key());
}
