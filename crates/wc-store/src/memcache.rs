//! memcached text-protocol cache client and cluster auto-discovery.
//!
//! Discovery asks a cluster configuration endpoint for its node list:
//!
//! ```text
//! config get cluster\r\n
//! CONFIG cluster 0 134\r\n
//! 12\r\n
//! host1|10.0.0.1|11211 host2|10.0.0.2|11211\r\n
//! \r\n
//! END\r\n
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::sink::CacheClient;

/// Default timeout for connecting and for each request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// memcached rejects keys longer than this.
const MAX_KEY_LEN: usize = 250;

/// Upper bound on a discovery response.
const MAX_CONFIG_RESPONSE: usize = 64 * 1024;

const CONFIG_TERMINATOR: &[u8] = b"END\r\n";

/// One node of a discovered cache cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    pub host: String,
    pub ip: String,
    pub port: u16,
}

impl ClusterNode {
    /// `ip:port`, falling back to the host name when no IP was reported.
    pub fn address(&self) -> String {
        let host = if self.ip.is_empty() { &self.host } else { &self.ip };
        format!("{host}:{}", self.port)
    }
}

/// Parse a `config get cluster` response into its nodes.
///
/// The node list is the third line of the response.
pub fn parse_cluster_config(response: &str) -> wc_core::Result<Vec<ClusterNode>> {
    let invalid = |msg: String| wc_core::Error::Config(format!("cluster config: {msg}"));

    let mut lines = response.split('\n').map(|l| l.trim_end_matches('\r'));
    let header = lines.next().unwrap_or_default();
    if !header.starts_with("CONFIG cluster") {
        return Err(invalid(format!("unexpected header '{header}'")));
    }
    let _version = lines
        .next()
        .ok_or_else(|| invalid("missing config version".into()))?;
    let node_line = lines
        .next()
        .ok_or_else(|| invalid("missing node list".into()))?;

    node_line
        .split(' ')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split('|').collect();
            let [host, ip, port] = parts.as_slice() else {
                return Err(invalid(format!("malformed node '{entry}'")));
            };
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(format!("bad port in '{entry}'")))?;
            Ok(ClusterNode {
                host: host.to_string(),
                ip: ip.to_string(),
                port,
            })
        })
        .collect()
}

/// Query a cluster configuration endpoint (`host:port`) for its nodes.
pub async fn discover_cluster(
    endpoint: &str,
    timeout: Option<Duration>,
) -> wc_core::Result<Vec<ClusterNode>> {
    let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
    let io_err = |e: std::io::Error| wc_core::Error::notify(endpoint, e);

    let exchange = async {
        let mut stream = TcpStream::connect(endpoint).await.map_err(io_err)?;
        stream
            .write_all(b"config get cluster\r\n")
            .await
            .map_err(io_err)?;

        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        while !data.ends_with(CONFIG_TERMINATOR) {
            let n = stream.read(&mut buf).await.map_err(io_err)?;
            if n == 0 {
                return Err(wc_core::Error::notify(
                    endpoint,
                    "connection closed before END",
                ));
            }
            data.extend_from_slice(&buf[..n]);
            if data.len() > MAX_CONFIG_RESPONSE {
                return Err(wc_core::Error::notify(endpoint, "config response too large"));
            }
        }

        if let Err(e) = stream.write_all(b"quit\r\n").await {
            tracing::debug!(endpoint, "Failed to send quit: {e}");
        }
        Ok(data)
    };

    let data = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| wc_core::Error::Timeout(timeout))??;

    let nodes = parse_cluster_config(&String::from_utf8_lossy(&data))?;
    tracing::info!(endpoint, nodes = nodes.len(), "Discovered cache cluster");
    Ok(nodes)
}

/// Client for one memcached node.
///
/// The connection is opened lazily and dropped after any failure so the next
/// request reconnects.
pub struct MemcacheClient {
    addr: String,
    ttl_secs: u32,
    timeout: Duration,
    conn: Mutex<Option<BufStream<TcpStream>>>,
}

impl MemcacheClient {
    pub fn new(addr: impl Into<String>, ttl_secs: u32) -> Self {
        Self {
            addr: addr.into(),
            ttl_secs,
            timeout: DEFAULT_TIMEOUT,
            conn: Mutex::new(None),
        }
    }

    /// Resolve `endpoint` through cluster discovery and use its first node.
    pub async fn discover(endpoint: &str, ttl_secs: u32) -> wc_core::Result<Self> {
        let nodes = discover_cluster(endpoint, None).await?;
        let node = nodes
            .first()
            .ok_or_else(|| wc_core::Error::Config(format!("no cache nodes behind {endpoint}")))?;
        Ok(Self::new(node.address(), ttl_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn store(&self, key: &str, value: &str) -> wc_core::Result<()> {
        let io_err = |e: std::io::Error| wc_core::Error::notify(key, e);

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            let stream = TcpStream::connect(&self.addr).await.map_err(io_err)?;
            *guard = Some(BufStream::new(stream));
        }
        let Some(conn) = guard.as_mut() else {
            return Err(wc_core::Error::notify(key, "connection unavailable"));
        };

        let header = format!("set {key} 0 {} {}\r\n", self.ttl_secs, value.len());
        conn.write_all(header.as_bytes()).await.map_err(io_err)?;
        conn.write_all(value.as_bytes()).await.map_err(io_err)?;
        conn.write_all(b"\r\n").await.map_err(io_err)?;
        conn.flush().await.map_err(io_err)?;

        let mut reply = String::new();
        let n = conn.read_line(&mut reply).await.map_err(io_err)?;
        if n == 0 {
            *guard = None;
            return Err(wc_core::Error::notify(key, "connection closed"));
        }
        match reply.trim_end() {
            "STORED" => Ok(()),
            other => Err(wc_core::Error::notify(key, format!("server replied '{other}'"))),
        }
    }
}

fn check_key(key: &str) -> wc_core::Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(wc_core::Error::notify(key, "key length out of range"));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(wc_core::Error::notify(key, "key contains whitespace or control characters"));
    }
    Ok(())
}

#[async_trait]
impl CacheClient for MemcacheClient {
    async fn set(&self, key: &str, value: &str) -> wc_core::Result<()> {
        check_key(key)?;
        let result = tokio::time::timeout(self.timeout, self.store(key, value))
            .await
            .unwrap_or(Err(wc_core::Error::Timeout(self.timeout)));
        if result.is_err() {
            // Drop a connection that may be mid-reply.
            *self.conn.lock().await = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;

    const SAMPLE: &str = "CONFIG cluster 0 134\r\n12\r\nmyCluster.001.cache.amazonaws.com|10.82.235.120|11211 myCluster.002.cache.amazonaws.com|10.80.249.27|11211\r\n\r\nEND\r\n";

    #[test]
    fn parses_node_list() {
        let nodes = parse_cluster_config(SAMPLE).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].host, "myCluster.001.cache.amazonaws.com");
        assert_eq!(nodes[0].ip, "10.82.235.120");
        assert_eq!(nodes[1].port, 11211);
        assert_eq!(nodes[1].address(), "10.80.249.27:11211");
    }

    #[test]
    fn address_falls_back_to_host() {
        let node = ClusterNode {
            host: "cache.local".into(),
            ip: String::new(),
            port: 11211,
        };
        assert_eq!(node.address(), "cache.local:11211");
    }

    #[test]
    fn rejects_bad_header() {
        assert_matches!(parse_cluster_config("ERROR\r\n"), Err(wc_core::Error::Config(_)));
    }

    #[test]
    fn rejects_malformed_node() {
        let bad = "CONFIG cluster 0 10\r\n1\r\nhost|10.0.0.1\r\n\r\nEND\r\n";
        assert!(parse_cluster_config(bad).is_err());
        let bad_port = "CONFIG cluster 0 10\r\n1\r\nhost|10.0.0.1|port\r\n\r\nEND\r\n";
        assert!(parse_cluster_config(bad_port).is_err());
    }

    #[test]
    fn key_validation() {
        assert!(check_key("track-01").is_ok());
        assert!(check_key("has space").is_err());
        assert!(check_key("").is_err());
        assert!(check_key(&"k".repeat(251)).is_err());
    }

    #[tokio::test]
    async fn discovery_against_local_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = socket.read(&mut buf).await.unwrap();
            // Reply in two chunks to exercise the read loop.
            let (a, b) = SAMPLE.as_bytes().split_at(40);
            socket.write_all(a).await.unwrap();
            socket.write_all(b).await.unwrap();
            let _ = socket.read(&mut buf).await;
        });

        let nodes = discover_cluster(&addr, Some(Duration::from_secs(2))).await.unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn set_speaks_text_protocol() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut stream = BufStream::new(socket);
            let mut header = String::new();
            stream.read_line(&mut header).await.unwrap();
            let mut body = String::new();
            stream.read_line(&mut body).await.unwrap();
            stream.write_all(b"STORED\r\n").await.unwrap();
            stream.flush().await.unwrap();
            (header, body)
        });

        let client = MemcacheClient::new(addr, 60);
        client.set("track-01", "{\"type\":\"error\"}").await.unwrap();

        let (header, body) = server.await.unwrap();
        assert_eq!(header, "set track-01 0 60 16\r\n");
        assert_eq!(body, "{\"type\":\"error\"}\r\n");
    }

    #[tokio::test]
    async fn set_reports_server_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut stream = BufStream::new(socket);
            let mut line = String::new();
            stream.read_line(&mut line).await.unwrap();
            line.clear();
            stream.read_line(&mut line).await.unwrap();
            stream.write_all(b"SERVER_ERROR out of memory\r\n").await.unwrap();
            stream.flush().await.unwrap();
        });

        let client = MemcacheClient::new(addr, 0);
        let err = client.set("k", "v").await.unwrap_err();
        assert!(err.to_string().contains("SERVER_ERROR"), "got: {err}");
    }
}
