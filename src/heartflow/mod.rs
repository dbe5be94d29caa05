pub mod admin;
pub mod debounce;
pub mod energy;
pub mod engine;
pub mod gate;
pub mod judge;
pub mod prompt_cache;
pub mod weights;

pub use admin::{AdminCommand, CacheReport, CacheReportEntry, EnergyBand, StatusReport};
pub use debounce::DebounceCoordinator;
pub use energy::{ChatEnergyTracker, ChatState};
pub use engine::{Heartflow, MessageOutcome};
pub use gate::GateDecision;
pub use judge::{JudgeModel, JudgeResult, JudgmentEngine, JudgmentRequest};
pub use prompt_cache::{PromptCacheEntry, PromptSummaryCache};
pub use weights::{DimensionScores, ScoreWeights};
