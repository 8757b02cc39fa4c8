//! Core types: sources, event times, normalized events, tracing

pub mod event;
pub mod source;
pub mod time;
pub mod tracing;

pub use event::{NormalizedEvent, UNTITLED_EVENT};
pub use source::Source;
pub use time::EventTime;
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
