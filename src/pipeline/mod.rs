//! Query orchestration pipeline
//!
//! - `event`: the typed event stream and its NDJSON wire form
//! - `chunk`: fixed-size audio chunking
//! - `state`: pipeline states
//! - `orchestrator`: drives one query through every stage

mod chunk;
mod event;
mod orchestrator;
mod state;

pub use chunk::{chunk_audio, chunk_count};
pub use event::{ndjson_lines, Event};
pub use orchestrator::{PipelineOutcome, QueryOrchestrator};
pub use state::PipelineState;
