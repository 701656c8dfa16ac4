use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use discovery_cluster::client::handlers::{
    handle_group_meta, handle_heartbeat, handle_inspect, handle_list_members, handle_routes,
    handle_stats,
};
use discovery_cluster::client::protocol::{
    ENDPOINT_GROUPS, ENDPOINT_HEARTBEAT, ENDPOINT_INSPECT, ENDPOINT_MEMBERS,
};
use discovery_cluster::config::DiscoveryConfig;
use discovery_cluster::gossip::driver::GossipDriver;
use discovery_cluster::gossip::handlers::handle_process_gossip;
use discovery_cluster::gossip::protocol::ENDPOINT_GOSSIP;
use discovery_cluster::registry::manager::GroupManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--peer <addr:port>]... [--self-address <addr:port>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:5000", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:5001 --peer 127.0.0.1:5000 --peer 127.0.0.1:5001",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut peer_addresses: Vec<String> = vec![];
    let mut self_address: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--peer" => {
                peer_addresses.push(args[i + 1].clone());
                i += 2;
            }
            "--self-address" => {
                self_address = Some(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");
    let self_address = self_address.unwrap_or_else(|| bind_addr.to_string());
    if !peer_addresses.contains(&self_address) {
        peer_addresses.push(self_address.clone());
    }

    let config = Arc::new(
        DiscoveryConfig {
            self_address,
            peer_addresses,
            ..DiscoveryConfig::default()
        }
        .apply_env_overrides(),
    );

    tracing::info!("Starting discovery server on {}", bind_addr);
    tracing::info!("Peer set: {:?}", config.peer_addresses);

    // 1. Registry + lease reaper:
    let manager = GroupManager::new();
    manager.clone().start();

    // 2. Gossip fan-out:
    let driver = GossipDriver::new(manager.clone(), config.clone());
    driver.start();

    // 3. HTTP router:
    let app = Router::new()
        .route("/health/routes", get(handle_routes))
        .route("/health/stats", get(handle_stats))
        // Client-facing routes
        .route(ENDPOINT_HEARTBEAT, post(handle_heartbeat))
        .route(
            &format!("{}/:group_id", ENDPOINT_MEMBERS),
            get(handle_list_members),
        )
        .route(
            &format!("{}/:group_id/meta", ENDPOINT_GROUPS),
            get(handle_group_meta),
        )
        .route(ENDPOINT_INSPECT, get(handle_inspect))
        // Peer-facing routes
        .route(ENDPOINT_GOSSIP, post(handle_process_gossip))
        .layer(Extension(manager.clone()))
        .layer(Extension(config.clone()));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
