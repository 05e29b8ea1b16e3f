//! Control-plane client for a running Murmur agent.
//!
//! The agent speaks JSON over plain HTTP. A connection is established with
//! a health probe, used for a single request, and released when dropped.

use std::error::Error as _;

use async_trait::async_trait;
use reqwest::StatusCode;

use murmur_common::constants::routes;
use murmur_common::{ErrorResponse, MurmurError, StatusResponse, UpdateStatusRequest};

/// Operations the control plane offers against one node
#[async_trait]
pub trait ControlClient: Send + Sync {
    /// Current status token of the node
    async fn status(&self) -> Result<String, MurmurError>;

    /// Replace the node's status with `new` if it currently matches
    /// `expected`. The comparison happens on the node, in one round trip.
    async fn update_status(&self, expected: &str, new: &str) -> Result<(), MurmurError>;
}

/// Opens a [`ControlClient`] to an agent address
#[async_trait]
pub trait Connect: Send + Sync {
    type Client: ControlClient;

    async fn connect(&self, rpc_addr: &str) -> Result<Self::Client, MurmurError>;
}

/// Connector producing HTTP clients
#[derive(Debug, Default)]
pub struct HttpConnector;

#[async_trait]
impl Connect for HttpConnector {
    type Client = RpcClient;

    async fn connect(&self, rpc_addr: &str) -> Result<RpcClient, MurmurError> {
        let base_url = base_url(rpc_addr);

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MurmurError::Connection(e.to_string()))?;

        let probe = http
            .get(format!("{base_url}{}", routes::HEALTH))
            .send()
            .await
            .map_err(|e| MurmurError::Connection(format!("{base_url}: {}", describe(&e))))?;

        if !probe.status().is_success() {
            return Err(MurmurError::Connection(format!(
                "{base_url} answered health probe with HTTP {}",
                probe.status()
            )));
        }

        tracing::debug!(url = %base_url, "Connected to agent");

        Ok(RpcClient { http, base_url })
    }
}

/// HTTP client bound to one agent
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        tracing::debug!(url = %self.base_url, "Released agent connection");
    }
}

#[async_trait]
impl ControlClient for RpcClient {
    async fn status(&self) -> Result<String, MurmurError> {
        let resp = self
            .http
            .get(self.url(routes::STATUS))
            .send()
            .await
            .map_err(|e| MurmurError::Rpc(describe(&e)))?;

        if !resp.status().is_success() {
            return Err(decode_error(resp, None).await);
        }

        let body: StatusResponse = resp
            .json()
            .await
            .map_err(|e| MurmurError::Rpc(format!("malformed status response: {e}")))?;

        Ok(body.status)
    }

    async fn update_status(&self, expected: &str, new: &str) -> Result<(), MurmurError> {
        let request = UpdateStatusRequest {
            expected: expected.to_string(),
            new: new.to_string(),
        };

        let resp = self
            .http
            .post(self.url(routes::STATUS))
            .json(&request)
            .send()
            .await
            .map_err(|e| MurmurError::Rpc(describe(&e)))?;

        if !resp.status().is_success() {
            return Err(decode_error(resp, Some(expected)).await);
        }

        tracing::debug!(expected = %expected, new = %new, "Agent accepted status update");

        Ok(())
    }
}

/// Accepts `host:port` or a full `http://` URL
fn base_url(rpc_addr: &str) -> String {
    let addr = rpc_addr.trim_end_matches('/');
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}

/// Turn a non-success response into an error, keeping the agent's message
async fn decode_error(resp: reqwest::Response, expected: Option<&str>) -> MurmurError {
    let code = resp.status();

    match (resp.json::<ErrorResponse>().await, expected) {
        (
            Ok(ErrorResponse {
                current: Some(current),
                ..
            }),
            Some(expected),
        ) if code == StatusCode::CONFLICT => MurmurError::StatusMismatch {
            expected: expected.to_string(),
            current,
        },
        (Ok(body), _) => MurmurError::Rpc(format!("agent returned HTTP {code}: {}", body.error)),
        (Err(_), _) => MurmurError::Rpc(format!("agent returned HTTP {code}")),
    }
}

/// reqwest's Display hides the root cause; append the source chain
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const HEALTHY: (u16, &str) = (200, r#"{"status":"ok"}"#);

    /// Serve canned responses, one per connection, in order
    async fn stub_agent(replies: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (code, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {code} Stub\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });

        addr.to_string()
    }

    /// Consume headers and body so the client sees a clean close
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn test_base_url_adds_scheme() {
        assert_eq!(base_url("127.0.0.1:7373"), "http://127.0.0.1:7373");
        assert_eq!(base_url("http://10.0.0.5:7373/"), "http://10.0.0.5:7373");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_connection_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpConnector.connect(&addr.to_string()).await;

        match result {
            Err(MurmurError::Connection(msg)) => assert!(msg.contains(&addr.to_string())),
            Err(other) => panic!("expected connection error, got {other:?}"),
            Ok(_) => panic!("connected to a closed port"),
        }
    }

    #[tokio::test]
    async fn test_unhealthy_agent_is_connection_error() {
        let addr = stub_agent(vec![(503, r#"{"error":"starting"}"#)]).await;

        match HttpConnector.connect(&addr).await {
            Err(MurmurError::Connection(msg)) => {
                assert!(msg.contains("health probe"));
                assert!(msg.contains("503"));
            }
            Err(other) => panic!("expected connection error, got {other:?}"),
            Ok(_) => panic!("unhealthy agent accepted"),
        }
    }

    #[tokio::test]
    async fn test_status_reads_body() {
        let addr = stub_agent(vec![HEALTHY, (200, r#"{"status":"alive"}"#)]).await;

        let client = HttpConnector.connect(&addr).await.unwrap();

        assert_eq!(client.status().await.unwrap(), "alive");
    }

    #[tokio::test]
    async fn test_malformed_status_body_is_rpc_error() {
        let addr = stub_agent(vec![HEALTHY, (200, "alive")]).await;

        let client = HttpConnector.connect(&addr).await.unwrap();

        match client.status().await {
            Err(MurmurError::Rpc(msg)) => assert!(msg.starts_with("malformed status response")),
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflict_maps_to_status_mismatch() {
        let addr = stub_agent(vec![
            HEALTHY,
            (409, r#"{"error":"current status is \"dead\"","current":"dead"}"#),
        ])
        .await;

        let client = HttpConnector.connect(&addr).await.unwrap();

        match client.update_status("alive", "left").await {
            Err(MurmurError::StatusMismatch { expected, current }) => {
                assert_eq!(expected, "alive");
                assert_eq!(current, "dead");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_error_body_keeps_agent_message() {
        let addr = stub_agent(vec![HEALTHY, (400, r#"{"error":"Invalid status: empty"}"#)]).await;

        let client = HttpConnector.connect(&addr).await.unwrap();

        match client.update_status("alive", " ").await {
            Err(MurmurError::Rpc(msg)) => {
                assert_eq!(
                    msg,
                    format!("agent returned HTTP {}: Invalid status: empty", StatusCode::BAD_REQUEST)
                );
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_reports_code_only() {
        let addr = stub_agent(vec![HEALTHY, (502, "upstream gone")]).await;

        let client = HttpConnector.connect(&addr).await.unwrap();

        match client.status().await {
            Err(MurmurError::Rpc(msg)) => {
                assert_eq!(msg, format!("agent returned HTTP {}", StatusCode::BAD_GATEWAY));
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }
}
