//! Onboarding phases — the closed set of setup steps an agent session walks.

use serde::{Deserialize, Serialize};

/// The next setup step a session must execute.
///
/// Progresses linearly: CollectPoolCatalog → CollectSetupInput →
/// CollectFundingToken → CollectDelegations → PrepareOperator → Ready.
/// Declaration order is the canonical phase order, so `Ord` compares how far
/// along a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingPhase {
    CollectPoolCatalog,
    CollectSetupInput,
    CollectFundingToken,
    CollectDelegations,
    PrepareOperator,
    Ready,
}

impl OnboardingPhase {
    /// Every phase, in canonical order.
    pub const ALL: [OnboardingPhase; 6] = [
        Self::CollectPoolCatalog,
        Self::CollectSetupInput,
        Self::CollectFundingToken,
        Self::CollectDelegations,
        Self::PrepareOperator,
        Self::Ready,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectPoolCatalog => "collect-pool-catalog",
            Self::CollectSetupInput => "collect-setup-input",
            Self::CollectFundingToken => "collect-funding-token",
            Self::CollectDelegations => "collect-delegations",
            Self::PrepareOperator => "prepare-operator",
            Self::Ready => "ready",
        }
    }

    /// Whether onboarding is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for OnboardingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
