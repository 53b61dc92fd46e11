//! Onboarding — decides which setup step an agent session runs next.
//!
//! A session collects a pool catalog, operator setup input, a funding token,
//! signed delegations and a derived operator config before its agent may
//! trade. The phase to run is always re-derived from the flags collected so
//! far; the session driver adds persistence and per-thread serialization.

pub mod checkpoint;
pub mod flavor;
pub mod inputs;
pub mod phase;
pub mod resolver;
pub mod routes;
pub mod session;

pub use checkpoint::{AwaitingInput, TaskState, should_persist};
pub use flavor::{AgentFlavor, FlavorRequirements, ParseFlavorError};
pub use inputs::OnboardingInputs;
pub use phase::OnboardingPhase;
pub use resolver::{PhaseResolver, PhaseRule, Resolution, resolve_phase};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{OnboardingSessions, SessionRecord, StepUpdate, Suspension};
