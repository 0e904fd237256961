//! Error types shared across followloop crates.

mod channel;
mod page;
mod store;

pub use channel::*;
pub use page::*;
pub use store::*;
