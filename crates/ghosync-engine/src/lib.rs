//! Extract-transform-load engine for a single health indicator series.
//!
//! The pipeline pages through the WHO GHO OData API, checkpointing after
//! every page, cleans the accumulated batch into canonical records, and
//! upserts them into PostgreSQL inside one transaction. A failed run
//! leaves a `failed` checkpoint behind so the next run resumes at the
//! page that broke.
//!
//! Everything is strictly sequential; the only suspension points are
//! network I/O, the inter-page courtesy delay, and the load transaction.

pub mod config;
pub mod dest;
pub mod errors;
pub mod runner;
pub mod source;
pub mod transform;

mod checkpoint;
