//! Byte transports the link can run over.
//!
//! - Serial device (`/dev/ttyUSB0`, `COM3`): opened raw at the requested
//!   baud rate, 8 data bits, no parity, one stop bit, no flow control
//! - TCP (`tcp://host:port`): serial-over-network bridges like ser2net
//! - Unix socket (`unix:///path`, Unix only)
//!
//! # Example
//!
//! ```ignore
//! use gx8006_link::transport::{Endpoint, Transport};
//!
//! let endpoint = Endpoint::parse("tcp://127.0.0.1:4000")?;
//! let transport = Transport::connect(&endpoint, 921_600).await?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::error::{LinkError, Result};

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix://";

/// Where the link's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Serial device.
    Device(PathBuf),
    /// TCP `host:port`.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse an endpoint string.
    ///
    /// Strings without a recognised scheme are treated as device paths.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LinkError::InvalidEndpoint("empty endpoint".to_string()));
        }

        if let Some(addr) = s.strip_prefix(TCP_SCHEME) {
            if !addr.contains(':') {
                return Err(LinkError::InvalidEndpoint(format!(
                    "TCP endpoint {} has no port",
                    s
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }

        if let Some(path) = s.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(LinkError::InvalidEndpoint(format!(
                    "Unix endpoint {} has no path",
                    s
                )));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        Ok(Endpoint::Device(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Device(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "{}{}", TCP_SCHEME, addr),
            Endpoint::Unix(path) => write!(f, "{}{}", UNIX_SCHEME, path.display()),
        }
    }
}

/// A connected transport.
pub enum Transport {
    /// Serial port, polled through the reactor so reads never hold up writes.
    Serial(SerialStream),
    /// TCP stream.
    Tcp(TcpStream),
    /// Unix domain socket stream.
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Transport {
    /// Open the transport described by `endpoint`.
    ///
    /// `baudrate` applies to serial devices only.
    pub async fn connect(endpoint: &Endpoint, baudrate: u32) -> Result<Self> {
        match endpoint {
            Endpoint::Device(path) => {
                let port = tokio_serial::new(path.to_string_lossy().into_owned(), baudrate)
                    .data_bits(DataBits::Eight)
                    .parity(Parity::None)
                    .stop_bits(StopBits::One)
                    .flow_control(FlowControl::None)
                    .open_native_async()?;
                tracing::debug!("Opened {} at {} baud", path.display(), baudrate);
                Ok(Transport::Serial(port))
            }
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Transport::Unix(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(LinkError::InvalidEndpoint(
                "Unix sockets are not supported on this platform".to_string(),
            )),
        }
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(port) => Pin::new(port).poll_read(cx, buf),
            Transport::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Transport::Serial(port) => Pin::new(port).poll_write(cx, buf),
            Transport::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(port) => Pin::new(port).poll_flush(cx),
            Transport::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(port) => Pin::new(port).poll_shutdown(cx),
            Transport::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_device_path() {
        assert_eq!(
            Endpoint::parse("/dev/ttyUSB0").unwrap(),
            Endpoint::Device(PathBuf::from("/dev/ttyUSB0"))
        );
        assert_eq!(
            Endpoint::parse("COM54").unwrap(),
            Endpoint::Device(PathBuf::from("COM54"))
        );
    }

    #[test]
    fn test_parse_tcp() {
        assert_eq!(
            Endpoint::parse("tcp://127.0.0.1:4000").unwrap(),
            Endpoint::Tcp("127.0.0.1:4000".to_string())
        );
    }

    #[test]
    fn test_parse_tcp_without_port() {
        let result = Endpoint::parse("tcp://localhost");
        assert!(matches!(result, Err(LinkError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_parse_unix() {
        assert_eq!(
            Endpoint::parse("unix:///tmp/uart.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/uart.sock"))
        );
        assert!(Endpoint::parse("unix://").is_err());
    }

    #[test]
    fn test_parse_empty() {
        assert!(Endpoint::parse("   ").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["/dev/ttyUSB0", "tcp://10.0.0.2:7000", "unix:///run/gx.sock"] {
            let endpoint = Endpoint::parse(s).unwrap();
            assert_eq!(endpoint.to_string(), s);
        }
    }

    #[tokio::test]
    async fn test_connect_tcp_roundtrip() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = Endpoint::parse(&format!("tcp://{}", addr)).unwrap();

        let (transport, accepted) = tokio::join!(Transport::connect(&endpoint, 0), listener.accept());
        let mut transport = transport.unwrap();
        let (mut peer, _) = accepted.unwrap();

        peer.write_all(b"\x55\xAA").await.unwrap();
        let mut buf = [0u8; 2];
        transport.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x55\xAA");
    }

    #[tokio::test]
    async fn test_connect_missing_device_fails() {
        let endpoint = Endpoint::Device(PathBuf::from("/nonexistent/gx8006/tty"));
        let result = Transport::connect(&endpoint, 115_200).await;
        assert!(matches!(result, Err(LinkError::Serial(_))));
    }

    /// Pseudo-terminal pair; the slave path is opened as a device endpoint.
    #[cfg(unix)]
    fn pty_device() -> (SerialStream, Endpoint) {
        use tokio_serial::SerialPort;

        let (master, slave) = SerialStream::pair().unwrap();
        let path = slave.name().unwrap();
        drop(slave);
        (master, Endpoint::Device(PathBuf::from(path)))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connect_device_raw_bytes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut device, endpoint) = pty_device();
        let mut transport = Transport::connect(&endpoint, 115_200).await.unwrap();
        assert!(matches!(transport, Transport::Serial(_)));

        // Bytes that a cooked tty would translate or swallow.
        let bytes = [0x55, 0xAA, 0x0A, 0x0D, 0x03, 0x7F, 0x00];
        device.write_all(&bytes).await.unwrap();
        let mut buf = [0u8; 7];
        tokio::time::timeout(Duration::from_secs(2), transport.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, bytes);

        transport.write_all(&bytes).await.unwrap();
        let mut echoed = [0u8; 7];
        tokio::time::timeout(Duration::from_secs(2), device.read_exact(&mut echoed))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(echoed, bytes);
    }
}
