use std::fmt;

/// Where a query pipeline is. Each non-terminal state suspends on one remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Fetching,
    Transcribing,
    Answering,
    Synthesizing,
    Streaming,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Fetching => "fetching",
            PipelineState::Transcribing => "transcribing",
            PipelineState::Answering => "answering",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::Streaming => "streaming",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}
