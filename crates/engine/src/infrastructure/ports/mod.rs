//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The hosted row store (could swap the REST backend for a direct database)
//! - Clock (for testing)

mod error;
mod repos;
mod testing;
pub mod types;

// =============================================================================
// Repository Ports
// =============================================================================
pub use error::RepoError;
pub use repos::*;
pub use types::{InteractionKind, InteractionRecord};

// =============================================================================
// Test-Only Mock Repositories (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{
    MockCharacterRepo, MockInteractionLogRepo, MockMediaRepo, MockProgressionRepo,
    MockRewardRepo, MockStepRepo, MockStoryRepo,
};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;
