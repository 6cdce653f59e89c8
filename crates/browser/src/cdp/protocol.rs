//! CDP wire types.
//!
//! Only the shapes the driver actually exchanges with the browser. Domain
//! payloads stay as raw `serde_json::Value` - typing every CDP struct buys
//! nothing here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing per connection.
pub type RequestId = u64;

/// Target ID assigned by the browser.
pub type TargetId = String;

/// Session ID for an attached target.
pub type SessionId = String;

/// Outgoing CDP command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Response to a command, matched by `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ProtocolError>,
}

/// Error object carried inside a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Unsolicited event pushed by the browser (no request ID).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Any frame coming off the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
    Response(CdpResponse),
    Event(CdpEvent),
}

/// Subset of `GET /json/version` the resolver cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser", default)]
    pub browser: Option<String>,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Target description from `Target.getTargets` / `Target.getTargetInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
    #[serde(default)]
    pub browser_context_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
    pub target_infos: Vec<TargetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
    pub session_id: SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_and_event_frames_disambiguate() {
        let resp = r#"{"id":3,"result":{"ok":true}}"#;
        match serde_json::from_str::<CdpMessage>(resp).unwrap() {
            CdpMessage::Response(r) => assert_eq!(r.id, 3),
            CdpMessage::Event(_) => panic!("parsed response as event"),
        }

        let ev = r#"{"method":"Page.domContentEventFired","params":{"timestamp":1.0},"sessionId":"S1"}"#;
        match serde_json::from_str::<CdpMessage>(ev).unwrap() {
            CdpMessage::Event(e) => {
                assert_eq!(e.method, "Page.domContentEventFired");
                assert_eq!(e.session_id.as_deref(), Some("S1"));
            }
            CdpMessage::Response(_) => panic!("parsed event as response"),
        }
    }

    #[test]
    fn version_info_tolerates_missing_ws_url() {
        let info: VersionInfo = serde_json::from_str(r#"{"Browser":"Edg/120.0"}"#).unwrap();
        assert!(info.web_socket_debugger_url.is_none());
        assert_eq!(info.browser.as_deref(), Some("Edg/120.0"));
    }

    #[test]
    fn request_omits_empty_fields() {
        let req = CdpRequest {
            id: 1,
            method: "Target.getTargets".into(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
        assert!(!json.contains("sessionId"));
    }
}
