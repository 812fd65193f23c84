//! Gas limit policy per call site.

use serde::{Deserialize, Serialize};

use crate::ledger::types::{LedgerError, LedgerResult};

/// Safety margin applied to a simulated gas estimate.
///
/// The padded limit is `estimate * multiplier + cushion`. When simulation
/// fails, `fallback_limit` is used instead; without one the failure is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GasPolicy {
    pub multiplier: u64,
    pub cushion: u64,
    pub fallback_limit: Option<u64>,
}

impl GasPolicy {
    pub const fn new(multiplier: u64, cushion: u64, fallback_limit: Option<u64>) -> Self {
        Self {
            multiplier,
            cushion,
            fallback_limit,
        }
    }

    /// Apply the margin to a raw estimate.
    pub fn pad(&self, estimate: u64) -> u64 {
        estimate
            .saturating_mul(self.multiplier.max(1))
            .saturating_add(self.cushion)
    }

    /// Pick the limit to submit with, given the simulation result.
    pub fn resolve(&self, estimate: LedgerResult<u64>) -> LedgerResult<GasDecision> {
        match estimate {
            Ok(estimate) => Ok(GasDecision::Estimated {
                estimate,
                limit: self.pad(estimate),
            }),
            Err(e) => match self.fallback_limit {
                Some(limit) => Ok(GasDecision::Fallback {
                    limit,
                    reason: e.to_string(),
                }),
                None => Err(LedgerError::Estimation(e.to_string())),
            },
        }
    }
}

/// How a gas limit was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasDecision {
    Estimated { estimate: u64, limit: u64 },
    Fallback { limit: u64, reason: String },
}

impl GasDecision {
    pub fn limit(&self) -> u64 {
        match self {
            GasDecision::Estimated { limit, .. } | GasDecision::Fallback { limit, .. } => *limit,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GasDecision::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(GasPolicy::new(2, 0, None).pad(45_000), 90_000);
        assert_eq!(GasPolicy::new(1, 50_000, None).pad(45_000), 95_000);
        assert_eq!(GasPolicy::new(1, 100_000, None).pad(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_fallback_on_estimation_failure() {
        let policy = GasPolicy::new(2, 0, Some(2_000_000));
        let decision = policy
            .resolve(Err(LedgerError::Transport("execution reverted".into())))
            .unwrap();
        assert!(decision.is_fallback());
        assert_eq!(decision.limit(), 2_000_000);
    }

    #[test]
    fn test_no_fallback_is_fatal() {
        let policy = GasPolicy::new(1, 0, None);
        let err = policy
            .resolve(Err(LedgerError::Transport("execution reverted".into())))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Estimation(_)));
    }
}
