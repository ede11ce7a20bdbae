// ─── Launcher Handshake ───
// The client connects back to a loopback port and writes one line. Only the
// exact line "Done" means it finished starting.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

pub const READY_MESSAGE: &str = "Done";

/// Most bytes read from a handshake connection.
const MAX_HANDSHAKE_BYTES: u64 = 64;

/// One-shot listener on an OS-assigned loopback port.
pub struct HandshakeListener {
    listener: TcpListener,
    port: u16,
}

impl HandshakeListener {
    pub async fn bind() -> LauncherResult<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .map_err(|err| LauncherError::Other(format!("Cannot open handshake port: {err}")))?;
        let port = listener
            .local_addr()
            .map_err(|err| LauncherError::Other(format!("Cannot read handshake port: {err}")))?
            .port();
        debug!("Handshake listener bound on 127.0.0.1:{}", port);

        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept one connection and read one line on a background task. The
    /// listener and the connection close when that task ends.
    pub fn spawn(self) -> ReadyHandle {
        let (tx, rx) = oneshot::channel();
        let port = self.port;

        tokio::spawn(async move {
            match read_handshake(self.listener).await {
                Ok(true) => {
                    debug!("Client signalled ready on port {}", port);
                    let _ = tx.send(());
                }
                Ok(false) => debug!("Client handshake on port {} was not a ready signal", port),
                Err(err) => warn!("Handshake on port {} failed: {}", port, err),
            }
        });

        ReadyHandle { rx }
    }
}

async fn read_handshake(listener: TcpListener) -> io::Result<bool> {
    let (stream, peer) = listener.accept().await?;
    drop(listener);
    debug!("Handshake connection from {}", peer);

    let mut line = String::new();
    let read = BufReader::new(stream.take(MAX_HANDSHAKE_BYTES))
        .read_line(&mut line)
        .await?;
    Ok(read > 0 && line.trim_end_matches(['\r', '\n']) == READY_MESSAGE)
}

/// Resolves once the handshake task is done.
#[derive(Debug)]
pub struct ReadyHandle {
    rx: oneshot::Receiver<()>,
}

impl ReadyHandle {
    /// `true` only when the client sent the ready line.
    pub async fn ready(self) -> bool {
        self.rx.await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn handshake_with(payload: Option<&[u8]>) -> bool {
        let listener = HandshakeListener::bind().await.unwrap();
        let port = listener.port();
        let handle = listener.spawn();

        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        if let Some(payload) = payload {
            stream.write_all(payload).await.unwrap();
        }
        drop(stream);

        handle.ready().await
    }

    #[tokio::test]
    async fn done_line_signals_ready() {
        assert!(handshake_with(Some(b"Done\n")).await);
        assert!(handshake_with(Some(b"Done\r\n")).await);
        assert!(handshake_with(Some(b"Done")).await);
    }

    #[tokio::test]
    async fn other_lines_are_ignored() {
        assert!(!handshake_with(Some(b"Starting\n")).await);
        assert!(!handshake_with(Some(b"done\n")).await);
        assert!(!handshake_with(Some(b" Done\nDone\n")).await);
    }

    #[tokio::test]
    async fn disconnect_without_writing_is_no_signal() {
        assert!(!handshake_with(None).await);
    }

    #[tokio::test]
    async fn endless_line_is_cut_off() {
        let listener = HandshakeListener::bind().await.unwrap();
        let port = listener.port();
        let handle = listener.spawn();

        // The connection stays open and never sends a newline.
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        stream.write_all(b"Done").await.unwrap();
        stream.write_all(&[b'x'; 4096]).await.unwrap();

        let ready = tokio::time::timeout(std::time::Duration::from_secs(10), handle.ready())
            .await
            .unwrap();
        assert!(!ready);
        drop(stream);
    }

    #[tokio::test]
    async fn port_is_assigned_by_the_os() {
        let listener = HandshakeListener::bind().await.unwrap();
        assert_ne!(listener.port(), 0);
    }
}
