//! Snapshot of what a session has collected so far.

use serde::{Deserialize, Serialize};

use super::flavor::FlavorRequirements;

/// Flags describing which setup inputs and artifacts are present for a
/// session. Built by the caller from its persisted state before every
/// resolution; absent flags deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingInputs {
    /// Operator configuration (wallet address, pool or market selection) captured.
    pub has_setup_input: bool,
    /// A funding token was chosen or detected from an existing position.
    pub has_funding_token_input: bool,
    /// This flavor needs on-chain permission delegation at all.
    pub requires_delegation_signing: bool,
    /// Signed delegation artifacts are present.
    pub has_delegation_bundle: bool,
    /// A fully resolved, ready-to-execute configuration was derived.
    pub has_operator_config: bool,
    /// A final "setup transaction confirmed" gate applies.
    pub requires_setup_complete: bool,
    pub setup_complete: bool,
    /// A market/pool catalog must be fetched before setup input is requested.
    pub requires_pool_catalog: bool,
    pub has_pool_catalog: bool,
}

impl OnboardingInputs {
    /// Overlay a flavor's `requires*` flags, keeping every collected flag.
    pub fn with_requirements(mut self, requirements: FlavorRequirements) -> Self {
        self.requires_pool_catalog = requirements.pool_catalog;
        self.requires_delegation_signing = requirements.delegation_signing;
        self.requires_setup_complete = requirements.setup_complete;
        self
    }
}
