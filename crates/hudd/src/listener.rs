//! Unix datagram listener for hook events.
//!
//! Hooks fire one JSON object per datagram at the socket and never wait
//! for an answer. Each datagram is decoded and handed to the engine;
//! anything that does not decode is logged and dropped.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  datagram  ┌─────────────────┐  Ingest  ┌─────────────────┐
//! │   Hook Script   │───────────▶│IngestionListener│─────────▶│  EngineHandle   │
//! └─────────────────┘            │  UnixDatagram   │          └─────────────────┘
//!                                └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` in production code
//! - Receive errors back off briefly and the loop continues

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixDatagram;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hud_protocol::decode;

use crate::engine::{EngineError, EngineHandle};

/// Largest datagram read; longer payloads are truncated and fail to decode.
pub const MAX_DATAGRAM: usize = 4096;

/// Pause after a failed receive.
const RECV_BACKOFF: Duration = Duration::from_millis(10);

/// Socket file mode: owner read/write only.
const SOCKET_MODE: u32 = 0o600;

/// Receives hook datagrams and forwards them to the engine.
pub struct IngestionListener {
    socket_path: PathBuf,
    engine: EngineHandle,
    cancel_token: CancellationToken,
}

impl IngestionListener {
    pub fn new(
        socket_path: impl Into<PathBuf>,
        engine: EngineHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            engine,
            cancel_token,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket, replacing a stale socket file.
    ///
    /// # Errors
    ///
    /// `ListenerError::SocketSetup` if the directory, the bind or the
    /// permission change fails.
    pub fn bind(&self) -> Result<UnixDatagram, ListenerError> {
        let setup_error = |e: std::io::Error| ListenerError::SocketSetup {
            path: self.socket_path.clone(),
            error: e.to_string(),
        };

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(setup_error)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(setup_error)?;
            }
        }

        let socket = UnixDatagram::bind(&self.socket_path).map_err(setup_error)?;
        std::fs::set_permissions(
            &self.socket_path,
            std::fs::Permissions::from_mode(SOCKET_MODE),
        )
        .map_err(setup_error)?;

        Ok(socket)
    }

    /// Binds and serves until cancelled.
    pub async fn run(&self) -> Result<(), ListenerError> {
        let socket = self.bind()?;
        self.serve(socket).await;
        Ok(())
    }

    /// Serves an already bound socket until cancelled or the engine stops.
    ///
    /// Removes the socket file on the way out.
    pub async fn serve(&self, socket: UnixDatagram) {
        info!(socket = %self.socket_path.display(), "Ingestion listener ready");

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Listener shutdown requested");
                    break;
                }

                result = socket.recv(&mut buf) => {
                    match result {
                        Ok(len) => {
                            if let Err(EngineError::ChannelClosed) = self.handle_datagram(&buf[..len]).await {
                                warn!("Engine stopped, listener exiting");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Datagram receive failed");
                            tokio::time::sleep(RECV_BACKOFF).await;
                        }
                    }
                }
            }
        }

        self.cleanup();
    }

    async fn handle_datagram(&self, bytes: &[u8]) -> Result<(), EngineError> {
        let message = match decode(bytes) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(len = bytes.len(), "Ignoring datagram of unknown type");
                return Ok(());
            }
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "Dropping malformed datagram");
                return Ok(());
            }
        };

        let outcome = self.engine.ingest(message).await?;
        debug!(?outcome, "Datagram applied");
        Ok(())
    }

    fn cleanup(&self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(
                    socket = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }
        info!("Listener cleanup complete");
    }
}

/// Errors that stop the listener from starting.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to setup socket at {path}: {error}")]
    SocketSetup { path: PathBuf, error: String },
}
