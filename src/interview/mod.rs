//! Client-side interview flow: sections, conversation state, persistence,
//! and the calls it makes through the guardrail proxy.

pub mod client;
pub mod journey;
pub mod prompt;
pub mod report;
pub mod sections;
pub mod state;
pub mod store;

pub use client::{ClientError, GenerationBackend, GenerationRequest, ProxyClient};
pub use journey::{
    ConsentChecks, Journey, JourneyError, MAX_AI_RESPONSES, SendOutcome, SynthesisOutcome,
};
pub use report::SynthesisReport;
pub use state::{ChatMessage, JourneyState, Role};
pub use store::{JsonFileStore, MemoryStore, ProgressStore, StoreError};
