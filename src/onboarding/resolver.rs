//! Phase resolution: map an inputs snapshot to the single next phase.
//!
//! The resolver is an ordered list of `(predicate, phase)` rules evaluated
//! first-match-wins, with `Ready` as the fallback. It never stores a phase
//! pointer; callers re-resolve from their current snapshot on every step, so
//! an external reset of any flag is picked up on the next call.

use super::inputs::OnboardingInputs;
use super::phase::OnboardingPhase;

/// One entry of the ordered rule list.
#[derive(Debug, Clone, Copy)]
pub struct PhaseRule {
    /// Stable name, reported by [`PhaseResolver::explain`].
    pub name: &'static str,
    pub phase: OnboardingPhase,
    /// Returns true when this rule claims the snapshot.
    pub applies: fn(&OnboardingInputs) -> bool,
}

/// Outcome of a resolution, including which rule fired (`None` for the
/// `Ready` fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub phase: OnboardingPhase,
    pub rule: Option<&'static str>,
}

/// Rule names for the standard list.
pub mod rules {
    pub const POOL_CATALOG: &str = "pool-catalog";
    pub const SETUP_INPUT: &str = "setup-input";
    pub const FUNDING_TOKEN: &str = "funding-token";
    pub const DELEGATIONS: &str = "delegations";
    pub const OPERATOR_CONFIG: &str = "operator-config";
    pub const SETUP_COMPLETE: &str = "setup-complete";
}

const STANDARD_RULES: [PhaseRule; 6] = [
    PhaseRule {
        name: rules::POOL_CATALOG,
        phase: OnboardingPhase::CollectPoolCatalog,
        applies: |i| i.requires_pool_catalog && !i.has_pool_catalog,
    },
    PhaseRule {
        name: rules::SETUP_INPUT,
        phase: OnboardingPhase::CollectSetupInput,
        applies: |i| !i.has_setup_input,
    },
    PhaseRule {
        name: rules::FUNDING_TOKEN,
        phase: OnboardingPhase::CollectFundingToken,
        applies: |i| !i.has_funding_token_input,
    },
    PhaseRule {
        name: rules::DELEGATIONS,
        phase: OnboardingPhase::CollectDelegations,
        applies: |i| i.requires_delegation_signing && !i.has_delegation_bundle,
    },
    PhaseRule {
        name: rules::OPERATOR_CONFIG,
        phase: OnboardingPhase::PrepareOperator,
        applies: |i| !i.has_operator_config,
    },
    // Self-loop: stays in PrepareOperator until the setup transaction lands.
    // Must come after OPERATOR_CONFIG.
    PhaseRule {
        name: rules::SETUP_COMPLETE,
        phase: OnboardingPhase::PrepareOperator,
        applies: |i| i.requires_setup_complete && !i.setup_complete,
    },
];

/// Evaluates an ordered rule list against an inputs snapshot.
#[derive(Debug, Clone)]
pub struct PhaseResolver {
    rules: Vec<PhaseRule>,
}

impl Default for PhaseResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl PhaseResolver {
    /// Catalog → setup → funding → delegations → operator → setup-complete.
    pub fn standard() -> Self {
        Self::with_rules(STANDARD_RULES.to_vec())
    }

    /// Build a resolver from a custom ordered rule list.
    pub fn with_rules(rules: Vec<PhaseRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PhaseRule] {
        &self.rules
    }

    /// Resolve the next phase for `inputs`.
    pub fn resolve(&self, inputs: &OnboardingInputs) -> OnboardingPhase {
        self.explain(inputs).phase
    }

    /// Resolve and report which rule decided.
    pub fn explain(&self, inputs: &OnboardingInputs) -> Resolution {
        let resolution = self
            .rules
            .iter()
            .find(|rule| (rule.applies)(inputs))
            .map(|rule| Resolution {
                phase: rule.phase,
                rule: Some(rule.name),
            })
            .unwrap_or(Resolution {
                phase: OnboardingPhase::Ready,
                rule: None,
            });
        tracing::trace!(
            phase = %resolution.phase,
            rule = resolution.rule.unwrap_or("fallback"),
            "Resolved onboarding phase"
        );
        resolution
    }
}

/// Resolve with the standard rule list.
pub fn resolve_phase(inputs: &OnboardingInputs) -> OnboardingPhase {
    PhaseResolver::standard().resolve(inputs)
}
