//! Minimal Chrome DevTools Protocol client.
//!
//! Connects to Chrome over WebSocket and speaks the CDP JSON-RPC protocol.
//! Start Chrome with `--remote-debugging-port=9222`, then:
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222").await?;
//! let page = client.attach_page(&target_id).await?;
//! page.navigate("https://x.com/alice").await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
pub use session::PageSession;
