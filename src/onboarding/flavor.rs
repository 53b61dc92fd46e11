//! Agent flavors and the setup requirements each one brings.
//!
//! All flavors share the standard rule list; they only differ in which
//! optional gates apply.

use serde::{Deserialize, Serialize};

use super::resolver::PhaseResolver;

/// The agent implementations that go through onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentFlavor {
    /// Concentrated-liquidity pool management.
    Clmm,
    /// Pendle yield rotation.
    Pendle,
    /// GMX perpetuals.
    Gmx,
    /// Polymarket arbitrage. Trades through exchange API keys, so there is
    /// no catalog fetch and no delegation signing.
    Polymarket,
}

/// Which optional gates apply to a flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorRequirements {
    pub pool_catalog: bool,
    pub delegation_signing: bool,
    pub setup_complete: bool,
}

impl AgentFlavor {
    pub const ALL: [AgentFlavor; 4] = [Self::Clmm, Self::Pendle, Self::Gmx, Self::Polymarket];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clmm => "clmm",
            Self::Pendle => "pendle",
            Self::Gmx => "gmx",
            Self::Polymarket => "polymarket",
        }
    }

    pub fn requirements(&self) -> FlavorRequirements {
        match self {
            Self::Clmm => FlavorRequirements {
                pool_catalog: true,
                delegation_signing: true,
                setup_complete: false,
            },
            Self::Pendle | Self::Gmx => FlavorRequirements {
                pool_catalog: true,
                delegation_signing: true,
                setup_complete: true,
            },
            Self::Polymarket => FlavorRequirements::default(),
        }
    }

    pub fn resolver(&self) -> PhaseResolver {
        PhaseResolver::standard()
    }
}

impl std::fmt::Display for AgentFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a flavor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent flavor: {0}")]
pub struct ParseFlavorError(pub String);

impl std::str::FromStr for AgentFlavor {
    type Err = ParseFlavorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flavor| flavor.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFlavorError(s.to_string()))
    }
}
