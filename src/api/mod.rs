//! HTTP access to the Tethered API.
//!
//! [`Dispatcher`] issues one call at a time against
//! `{base_url}/v{API_VERSION}/{endpoint}` and always hands back a
//! [`RequestResult`]; transport and decoding failures are recorded on it, never
//! returned as errors. [`payloads`] holds the request bodies of the public
//! operations.

pub mod dispatcher;
pub mod payloads;

// Re-export commonly used items
pub use dispatcher::{Dispatcher, Method, RequestInfo, RequestResult};
pub use payloads::Page;
