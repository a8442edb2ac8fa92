//! TCP transport with V2GTP framing
//!
//! Each envelope is preceded by the 8-byte V2GTP header: protocol version,
//! inverted version, payload type (big endian u16) and payload length
//! (big endian u32). The payload is the JSON envelope, carried under the
//! manufacturer-specific payload type.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::{Transport, TransportError};
use crate::messages::V2gMessage;

/// Default SECC port for ISO 15118 over TCP
pub const DEFAULT_PORT: u16 = 15118;

pub const V2GTP_VERSION: u8 = 0x01;
pub const V2GTP_HEADER_LEN: usize = 8;

/// Manufacturer-specific payload type carrying JSON envelopes
pub const PAYLOAD_TYPE_JSON: u16 = 0xA000;

/// Maximum payload size
const MAX_MSG_SIZE: usize = 65536;

/// Encode a V2GTP header for `len` payload bytes
pub fn encode_header(payload_type: u16, len: usize) -> Result<[u8; V2GTP_HEADER_LEN], TransportError> {
    if len > MAX_MSG_SIZE {
        return Err(TransportError::TooLarge(len));
    }

    let mut header = [0u8; V2GTP_HEADER_LEN];
    header[0] = V2GTP_VERSION;
    header[1] = !V2GTP_VERSION;
    header[2..4].copy_from_slice(&payload_type.to_be_bytes());
    header[4..8].copy_from_slice(&(len as u32).to_be_bytes());
    Ok(header)
}

/// Decode a V2GTP header, returning the payload length
pub fn decode_header(header: &[u8; V2GTP_HEADER_LEN]) -> Result<usize, TransportError> {
    if header[0] != V2GTP_VERSION || header[1] != !V2GTP_VERSION {
        return Err(TransportError::InvalidHeader(format!(
            "version {:#04x}/{:#04x}",
            header[0], header[1]
        )));
    }

    let payload_type = u16::from_be_bytes([header[2], header[3]]);
    if payload_type != PAYLOAD_TYPE_JSON {
        return Err(TransportError::InvalidHeader(format!(
            "unsupported payload type {:#06x}",
            payload_type
        )));
    }

    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > MAX_MSG_SIZE {
        return Err(TransportError::TooLarge(len));
    }
    Ok(len)
}

/// Plain TCP connection to a SECC
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to SECC at {}", addr);
        Ok(Self { stream, peer: addr })
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, msg: &V2gMessage) -> Result<(), TransportError> {
        let payload = msg.to_bytes()?;
        let header = encode_header(PAYLOAD_TYPE_JSON, payload.len())?;

        debug!("Sending {} ({} bytes) to {}", msg.kind(), payload.len(), self.peer);
        self.stream.write_all(&header).await?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<V2gMessage, TransportError> {
        let mut header = [0u8; V2GTP_HEADER_LEN];
        match self.stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(TransportError::Closed);
            }
            Err(e) => return Err(e.into()),
        }

        let len = decode_header(&header)?;
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;

        let msg = V2gMessage::from_bytes(&payload)?;
        debug!("Received {} from {}", msg.kind(), self.peer);
        Ok(msg)
    }

    fn peer(&self) -> String {
        self.peer.to_string()
    }

    fn is_tls(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{SessionId, SessionStopRes, ResponseCode};
    use tokio::net::TcpListener;

    #[test]
    fn test_header_layout() {
        let header = encode_header(PAYLOAD_TYPE_JSON, 0x0102).unwrap();
        assert_eq!(header, [0x01, 0xFE, 0xA0, 0x00, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(decode_header(&header).unwrap(), 0x0102);
    }

    #[test]
    fn test_bad_headers_rejected() {
        let mut header = encode_header(PAYLOAD_TYPE_JSON, 4).unwrap();
        header[1] = 0x00;
        assert!(matches!(decode_header(&header), Err(TransportError::InvalidHeader(_))));

        // EXI payload type is not understood
        let header = encode_header(0x8001, 4).unwrap();
        assert!(matches!(decode_header(&header), Err(TransportError::InvalidHeader(_))));

        let mut header = encode_header(PAYLOAD_TYPE_JSON, 0).unwrap();
        header[4] = 0xFF;
        assert!(matches!(decode_header(&header), Err(TransportError::TooLarge(_))));

        assert!(matches!(
            encode_header(PAYLOAD_TYPE_JSON, MAX_MSG_SIZE + 1),
            Err(TransportError::TooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut secc = TcpTransport::from_stream(stream).unwrap();
            let msg = secc.receive().await.unwrap();
            secc.send(&msg).await.unwrap();
        });

        let mut evcc = TcpTransport::connect(addr).await.unwrap();
        assert!(!evcc.is_tls());
        assert_eq!(evcc.peer(), addr.to_string());

        let msg = V2gMessage::new(
            SessionId(vec![9; 8]),
            SessionStopRes { response_code: ResponseCode::Ok },
        );
        evcc.send(&msg).await.unwrap();
        assert_eq!(evcc.receive().await.unwrap(), msg);

        server.await.unwrap();
        assert!(matches!(evcc.receive().await, Err(TransportError::Closed)));
    }
}
