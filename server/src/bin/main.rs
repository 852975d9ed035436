use std::sync::Arc;

use anyhow::Context;
use tcr_server::{
    auth::UserStore, catalog::TroopCatalog, config::settings, matchmaking::Lobby, net,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Configuration
    let cfg = settings();

    // Static data
    let catalog = TroopCatalog::load(&cfg.troop_specs)?;
    log::info!("Loaded {} troops: {}", catalog.len(), catalog.names().join(", "));
    let users = UserStore::load(&cfg.users_file)?;

    let lobby = Arc::new(Lobby::new(Arc::new(catalog), cfg.rules()));

    let listener = TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server_addr))?;
    log::info!(
        "Server listening on {} (match {:?}, mana tick {:?})",
        cfg.server_addr,
        cfg.match_duration,
        cfg.mana_interval
    );

    net::serve(listener, lobby, Arc::new(users)).await
}
