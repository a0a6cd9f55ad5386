//! Shared runtime for the three pipeline services: queue protocol,
//! idempotency registry, job envelope/codec, configuration helpers,
//! structured JSON logging, and normalisation primitives.
//!
//! Each binary (`pipeline-scraper`, `pipeline-summarizer`, `pipeline-worker`)
//! depends on this crate and supplies its own queue wiring, handlers, and
//! persistence layer on top of it.

pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod idempotency;
pub mod lifecycle;
pub mod logging;
pub mod normalize;
pub mod queue;

pub use error::{CoreError, CoreResult};
pub use queue::{PopEnd, Queue};
