//! # followloop-page-cdp
//!
//! [`PageDriver`](followloop_protocols::PageDriver) implementation that
//! drives a Chrome tab over the DevTools Protocol.

pub mod cdp;
mod driver;
pub mod scripts;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use driver::CdpPageDriver;
