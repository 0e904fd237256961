//! CDP wire messages and discovery types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Page info from the `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
}

impl PageInfo {
    pub fn is_page(&self) -> bool {
        self.page_type == "page"
    }
}

/// Browser version info.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = CdpRequest {
            id: 7,
            method: "Runtime.evaluate".to_string(),
            params: None,
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sessionId"], "S1");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_event_and_error_parsing() {
        let event: CdpResponse =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{},"sessionId":"S1"}"#).unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));

        let error: CdpResponse =
            serde_json::from_str(r#"{"id":3,"error":{"code":-32000,"message":"No node"}}"#).unwrap();
        assert_eq!(error.error.map(|e| e.code), Some(-32000));
    }

    #[test]
    fn test_discovery_parsing() {
        let version: BrowserVersion = serde_json::from_str(
            r#"{"Browser":"Chrome/131.0","Protocol-Version":"1.3","webSocketDebuggerUrl":"ws://localhost:9222/devtools/browser/abc"}"#,
        )
        .unwrap();
        assert!(version.web_socket_debugger_url.starts_with("ws://"));

        let pages: Vec<PageInfo> = serde_json::from_str(
            r#"[{"id":"T1","type":"page","title":"Home / X","url":"https://x.com/home"},
                {"id":"T2","type":"service_worker","title":"sw","url":"https://x.com/sw.js"}]"#,
        )
        .unwrap();
        assert!(pages[0].is_page());
        assert!(!pages[1].is_page());
    }
}
