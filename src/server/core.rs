use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, CredentialStore};
use crate::client::{ControlChannel, Session};
use crate::config::ServerConfig;
use crate::navigate::LocalDirectoryStore;
use crate::protocol::{Reply, ReplyKind};
use crate::transfer::DataChannel;

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    credentials: Arc<dyn CredentialStore>,
    workers: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl Server {
    /// Binds the control listener.
    pub async fn bind(
        config: ServerConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> io::Result<Self> {
        let socket = config.control_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", listener.local_addr()?);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            workers: Arc::new(Semaphore::new(config.max_workers)),
            config: Arc::new(config),
            credentials,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Cancelling this token stops the server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts connections until shutdown, then drains running sessions.
    ///
    /// A worker permit is taken before each accept, so connections beyond
    /// `max_workers` wait in the listen backlog.
    pub async fn run(self) {
        info!(
            "Starting Bubble FTP server on {} (max {} sessions)",
            self.config.control_socket(),
            self.config.max_workers
        );

        let mut sessions = JoinSet::new();
        let mut next_id: u64 = 0;

        loop {
            while sessions.try_join_next().is_some() {}

            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed: {}", e);
                        break;
                    }
                },
            };

            let (stream, addr) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        continue;
                    }
                },
            };

            next_id += 1;
            let id = next_id;
            let config = Arc::clone(&self.config);
            let credentials = Arc::clone(&self.credentials);
            let shutdown = self.shutdown.child_token();

            sessions.spawn(async move {
                serve_connection(id, stream, addr, &config, credentials, shutdown).await;
                drop(permit);
            });
        }

        info!("Server stopped accepting connections");
        drop(self.listener);
        drain(sessions, self.config.shutdown_grace()).await;
    }
}

/// Builds a session for an accepted connection and runs it to completion.
async fn serve_connection(
    id: u64,
    stream: TcpStream,
    addr: SocketAddr,
    config: &ServerConfig,
    credentials: Arc<dyn CredentialStore>,
    shutdown: CancellationToken,
) {
    let mut control =
        ControlChannel::from_tcp(stream, config.max_command_length, config.idle_timeout());

    let store = match LocalDirectoryStore::open(
        &config.start_directory_path(),
        config.confine_to_start_directory,
    ) {
        Ok(store) => store,
        Err(e) => {
            error!(
                "Session #{} ({}): cannot open start directory {}: {}",
                id, addr, config.start_directory, e
            );
            let _ = control.write_reply(&Reply::of(ReplyKind::FatalError)).await;
            let _ = control.shutdown().await;
            return;
        }
    };

    Session::new(
        id,
        control,
        DataChannel::new(config.data_connect_timeout()),
        Authenticator::new(credentials),
        Box::new(store),
    )
    .with_peer(addr)
    .with_login_required(config.require_login)
    .with_shutdown(shutdown)
    .run()
    .await;
}

/// Waits for sessions to finish, aborting whatever is left after `grace`.
async fn drain(mut sessions: JoinSet<()>, grace: std::time::Duration) {
    if sessions.is_empty() {
        return;
    }

    info!("Waiting up to {:?} for {} sessions", grace, sessions.len());
    let finished = tokio::time::timeout(grace, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(
            "{} sessions still running after grace period, aborting",
            sessions.len()
        );
        sessions.abort_all();
        while sessions.join_next().await.is_some() {}
    }
}
