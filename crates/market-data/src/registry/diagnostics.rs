//! Per-request record of the fallback chain, for logging.

use crate::models::ProviderId;

/// Why a provider was not called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The request was cancelled before this provider's turn.
    Cancelled,
}

/// Result of one step of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed(String),
    Skipped(SkipReason),
}

/// Record of a single provider step during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub outcome: AttemptOutcome,
}

/// Ordered trace of a fetch across the fallback chain.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.push(provider_id, AttemptOutcome::Success);
    }

    pub fn record_error(&mut self, provider_id: ProviderId, error: String) {
        self.push(provider_id, AttemptOutcome::Failed(error));
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.push(provider_id, AttemptOutcome::Skipped(reason));
    }

    fn push(&mut self, provider_id: ProviderId, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            outcome,
        });
    }

    /// Number of providers actually called.
    pub fn called(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
            .count()
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Success => format!("{}: SUCCESS", a.provider_id),
                AttemptOutcome::Failed(err) => format!("{}: ERROR ({})", a.provider_id, err),
                AttemptOutcome::Skipped(reason) => {
                    format!("{}: SKIPPED ({:?})", a.provider_id, reason)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = FetchDiagnostics::new();
        diag.record_error(Cow::Borrowed("BRAPI"), "[BRAPI] No results for symbol: XXXX4".to_string());
        diag.record_success(Cow::Borrowed("YAHOO_FINANCE"));
        diag.record_skip(Cow::Borrowed("ALPHA_VANTAGE"), SkipReason::Cancelled);

        assert_eq!(
            diag.summary(),
            "BRAPI: ERROR ([BRAPI] No results for symbol: XXXX4) -> YAHOO_FINANCE: SUCCESS -> ALPHA_VANTAGE: SKIPPED (Cancelled)"
        );
    }

    #[test]
    fn test_called_excludes_skips() {
        let mut diag = FetchDiagnostics::new();
        diag.record_error(Cow::Borrowed("A"), "boom".to_string());
        diag.record_skip(Cow::Borrowed("B"), SkipReason::Cancelled);
        assert_eq!(diag.called(), 1);

        diag.record_success(Cow::Borrowed("C"));
        assert_eq!(diag.called(), 2);
        assert_eq!(diag.attempts.last().map(|a| &a.outcome), Some(&AttemptOutcome::Success));
    }
}
