//! Infrastructure Layer
//!
//! Adapters around the application core: the HTTP driver and the
//! JSON-lines replay feed.

pub mod http;
pub mod replay;
