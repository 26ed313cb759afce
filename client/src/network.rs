use crate::error::ClientError;
use bincode::serialize;
use log::{debug, error, warn};
use shared::codec::{read_frame, write_frame};
use shared::Packet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Interval at which an idle client should send `Heartbeat`.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// TCP connection to the game server.
///
/// Incoming frames are decoded by a background task and queued, so `recv`
/// can be used inside `tokio::select!` without losing partial frames.
pub struct Client {
    writer: OwnedWriteHalf,
    incoming: mpsc::UnboundedReceiver<Packet>,
    server_addr: SocketAddr,
}

impl Client {
    pub async fn connect(server_addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let server_addr = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        tokio::spawn(receive_loop(reader, incoming_tx));

        debug!("Connected to {}", server_addr);
        Ok(Client {
            writer,
            incoming,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<(), ClientError> {
        write_frame(&mut self.writer, packet).await?;
        Ok(())
    }

    /// Waits for the next packet from the server.
    pub async fn recv(&mut self) -> Result<Packet, ClientError> {
        self.incoming.recv().await.ok_or(ClientError::ConnectionClosed)
    }

    /// Like `recv`, but gives up after `wait` and returns `None`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Packet>, ClientError> {
        match timeout(wait, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Writes a frame whose payload is not a valid packet. Used to exercise
    /// the server's handling of corrupt input.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        self.writer
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Sends `Leave` and shuts down the write side.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.send(&Packet::Leave).await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

async fn receive_loop(mut reader: OwnedReadHalf, incoming: mpsc::UnboundedSender<Packet>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(packet) => {
                if incoming.send(packet).is_err() {
                    return;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!("Ignoring malformed packet from server: {}", e);
            }
            Err(e) => {
                debug!("Receive loop ended: {}", e);
                return;
            }
        }
    }
}

/// Size of a packet on the wire, including the length prefix.
pub fn wire_size(packet: &Packet) -> usize {
    match serialize(packet) {
        Ok(payload) => payload.len() + 4,
        Err(e) => {
            error!("Failed to encode {}: {}", packet.name(), e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Coord;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_and_recv_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let echo = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let packet = read_frame(&mut stream).await.unwrap();
            write_frame(&mut stream, &packet).await.unwrap();
        });

        let mut client = Client::connect(&addr.to_string()).await.unwrap();
        let packet = Packet::move_between(Coord::new(0, 1), Coord::new(0, 2));
        client.send(&packet).await.unwrap();

        assert_eq!(client.recv().await.unwrap(), packet);
        echo.await.unwrap();
        assert!(matches!(
            client.recv().await,
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_recv_timeout_returns_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = Client::connect(&addr.to_string()).await.unwrap();
        let _server_side = listener.accept().await.unwrap();

        let result = client
            .recv_timeout(Duration::from_millis(20))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_wire_size_includes_prefix() {
        assert_eq!(wire_size(&Packet::Leave), serialize(&Packet::Leave).unwrap().len() + 4);
    }
}
