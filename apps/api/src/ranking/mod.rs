//! Resume ranking engine.
//!
//! `vocabulary` holds the fixed keyword lists, `entity_extractor` and `requirements`
//! turn text into structured facts, `signals` and `composite` score them, and
//! `orchestrator` runs a whole batch.

pub mod composite;
pub mod entity_extractor;
pub mod orchestrator;
pub mod requirements;
pub mod signals;
pub mod vocabulary;

pub use composite::{RankedCandidate, ScoreBreakdown};
pub use orchestrator::{
    DroppedResume, RankError, RankingEngine, RankingOutcome, ResumeDocument, ResumeInput,
};
