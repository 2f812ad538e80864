//! Source side of the pipeline: HTTP fetch and pagination.

pub mod extract;
pub mod http;

pub use extract::Extractor;
pub use http::{Fetch, HttpFetcher};
