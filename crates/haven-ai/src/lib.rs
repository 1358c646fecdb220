//! AI analysis for the Haven pipeline.
//!
//! This crate provides:
//! - The `AiProvider` trait with per-provider capability sets
//! - Gemini and OpenAI HTTP clients
//! - Token/cost accounting (reported or estimated)
//! - The `AnalysisOrchestrator` fallback state machine
//!   (video_native → multi_frame → single_frame)

pub mod cost;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod providers;

pub use cost::{finalize_usage, MediaUnits, ProviderRates};
pub use error::{AiError, AiResult};
pub use orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
pub use provider::{AiProvider, ProviderCapabilities, ProviderResponse, ReportedTokens};
pub use providers::{GeminiProvider, OpenAiProvider};
