//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Capability routing by instrument class
//! - Ordered fallback with per-call metrics
//! - Per-request diagnostics of the fallback chain

mod diagnostics;
mod provider_registry;
mod settings;

pub use diagnostics::{AttemptOutcome, FetchDiagnostics, ProviderAttempt, SkipReason};
pub use provider_registry::ProviderRegistry;
pub use settings::ProviderSettings;
