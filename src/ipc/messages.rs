//! Event messages pushed by the agent process

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::server::HEADER_TERMINATOR;
use crate::types::Performance;

/// One decoded event
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Request {
    /// Event type, e.g. `assistant_response` or `agent_state`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub payload: Payload,
}

/// Sparse payload: each field is acted upon only when present
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(rename = "tool_info", default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,

    /// Raw agent state; unknown values are rejected by the engine, not here,
    /// so the rest of the payload still applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_mouse: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
}

/// Body of a message: everything after the first blank line, or the whole
/// message when no header block is present
pub fn extract_body(message: &str) -> &str {
    match message.split_once(HEADER_TERMINATOR) {
        Some((_headers, body)) => body,
        None => message,
    }
}

/// Decode one raw message (minimal HTTP or bare JSON)
pub fn decode(raw: &[u8]) -> Result<Request> {
    let text = std::str::from_utf8(raw).context("Message is not valid UTF-8")?;
    let body = extract_body(text).trim();
    serde_json::from_str(body).context("Failed to decode request JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Face;

    #[test]
    fn test_extract_body_http_framing() {
        let msg = "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\r\n{\"type\":\"x\"}";
        assert_eq!(extract_body(msg), "{\"type\":\"x\"}");
    }

    #[test]
    fn test_extract_body_bare_json() {
        assert_eq!(extract_body("{\"type\":\"x\"}"), "{\"type\":\"x\"}");
    }

    #[test]
    fn test_extract_body_keeps_later_blank_lines() {
        // Only the first blank line separates headers from body
        let msg = "H: v\r\n\r\n{\"type\":\"assistant_response\",\"payload\":{\"content\":\"a\r\n\r\nb\"}}";
        assert_eq!(
            extract_body(msg),
            "{\"type\":\"assistant_response\",\"payload\":{\"content\":\"a\r\n\r\nb\"}}"
        );
    }

    #[test]
    fn test_decode_full_payload() {
        let raw = br#"POST /event HTTP/1.1
Content-Type: application/json

"#;
        // Build with CRLF framing the way curl sends it
        let mut msg = String::from_utf8(raw.to_vec()).unwrap().replace('\n', "\r\n");
        msg.push_str(
            r#"{"type":"assistant_response","payload":{"content":"hi","tool_info":{"name":"search"},
               "performance":{"face":"joy","action":"wave"},"follow_mouse":false}}"#,
        );

        let req = decode(msg.as_bytes()).unwrap();
        assert_eq!(req.kind, "assistant_response");
        assert_eq!(req.payload.content.as_deref(), Some("hi"));
        assert_eq!(req.payload.tool.as_ref().map(|t| t.name.as_str()), Some("search"));
        let perf = req.payload.performance.unwrap();
        assert_eq!(perf.face, Face::Joy);
        assert_eq!(perf.intensity, 1.0);
        assert_eq!(perf.action.as_deref(), Some("wave"));
        assert_eq!(req.payload.follow_mouse, Some(false));
    }

    #[test]
    fn test_decode_bare_json_with_whitespace() {
        let req = decode(b"  \n{\"type\":\"agent_state\",\"payload\":{\"state\":\"thinking\"}}\n").unwrap();
        assert_eq!(req.kind, "agent_state");
        assert_eq!(req.payload.state.as_deref(), Some("thinking"));
    }

    #[test]
    fn test_decode_missing_payload_is_empty() {
        let req = decode(b"{\"type\":\"ping\"}").unwrap();
        assert_eq!(req.payload, Payload::default());
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let req = decode(b"{\"type\":\"agent_state\",\"extra\":1,\"payload\":{\"state\":\"idle\",\"mood\":\"ok\"}}").unwrap();
        assert_eq!(req.payload.state.as_deref(), Some("idle"));
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode(b"{\"type\":").is_err());
        assert!(decode(b"{\"payload\":{}}").is_err());
        assert!(decode(b"not json").is_err());
        assert!(decode(&[0xff, 0xfe, 0x7b]).is_err());
    }
}
