//! Core types shared across Murmur components.

use serde::{Deserialize, Serialize};

/// Case-insensitive status comparison.
///
/// Status tokens are opaque labels, so the only rule is that case does not
/// matter: both sides are lowercased char by char. Whitespace is significant.
pub fn statuses_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Response body of `GET /v1/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Request body of `POST /v1/status`.
///
/// The agent applies `new` only if its current status matches `expected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub expected: String,
    pub new: String,
}

/// Error body returned by the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Node's status at the time of a rejected compare-and-set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// One node as seen from the agent answering `GET /v1/members`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub node_id: String,
    pub status: String,
    pub incarnation: u64,
    /// False once the peer has been silent past the timeout
    pub healthy: bool,
    /// Unix timestamp of the last packet heard (our own clock for self)
    pub last_seen: i64,
}

/// Response body of `GET /v1/members`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersResponse {
    pub local: MemberInfo,
    pub peers: Vec<MemberInfo>,
    pub isolated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_match_ignores_case() {
        assert!(statuses_match("alive", "Alive"));
        assert!(statuses_match("DEGRADED", "degraded"));
        assert!(statuses_match("ÉTAT", "état"));
    }

    #[test]
    fn test_statuses_match_is_exact_otherwise() {
        assert!(!statuses_match("alive", "dead"));
        assert!(!statuses_match("alive", " alive"));
        assert!(!statuses_match("alive", "alive\n"));
        assert!(!statuses_match("alive", "aliv"));
        assert!(statuses_match("", ""));
    }

    #[test]
    fn test_error_response_omits_missing_current() {
        let body = ErrorResponse {
            error: "Invalid status: empty".to_string(),
            current: None,
        };

        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Invalid status: empty"}"#);

        let parsed: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert!(parsed.current.is_none());
    }
}
