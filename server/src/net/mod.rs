//! TCP front door.

pub mod connection;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::{auth::UserStore, matchmaking::Lobby};

/// Accepts connections forever, one task per client.
pub async fn serve(
    listener: TcpListener,
    lobby: Arc<Lobby>,
    users: Arc<UserStore>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };
        log::info!("Connection from {peer}");

        let lobby = lobby.clone();
        let users = users.clone();
        tokio::spawn(async move {
            if let Err(e) = connection::handle_client(stream, lobby, users).await {
                log::warn!("connection {peer} ended with error: {e:?}");
            }
        });
    }
}
