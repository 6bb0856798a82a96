pub mod api;
pub mod relay;

use std::error::Error;
use std::net::SocketAddr;
use log::{ error, info };

use self::api::AppState;

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    tls: Option<(String, String)>,
}

impl Server {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state, tls: None }
    }

    /// Serve over TLS with the given PEM certificate and key.
    pub fn with_tls(mut self, cert_path: String, key_path: String) -> Self {
        self.tls = Some((cert_path, key_path));
        self
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let protocol = if self.tls.is_some() { "https" } else { "http" };
        info!("{} server listening on: {}", protocol.to_uppercase(), self.addr);

        api::start_http_server(self.addr, self.state, self.tls).await.map_err(|e| {
            error!("Chat server stopped: {}", e);
            e
        })
    }
}
