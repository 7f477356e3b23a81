//! Error types for the simulation kernel.
//!
//! Errors fall into three categories:
//!
//! - [`KernelError`]: invariant violations. These indicate that the
//!   simulation has already left a valid state. They propagate to the tick
//!   driver and must be treated as fatal for the session (a desync).
//! - [`RulesError`]: malformed external data. Detected at load or lookup
//!   time, logged, and the offending entry is skipped.
//! - [`ConfigError`]: configuration loading failures.
//!
//! Rejected player actions are not errors at all; the command-facing helpers
//! on [`Simulation`](crate::simulation::Simulation) report them as `false`.

use crate::entity::{EntityId, EntityKind};
use crate::player::PlayerId;

/// Invariant violation raised by the kernel's mutating API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// An identity was registered in the world twice.
    #[error("duplicate identity: entity {0} is already registered")]
    DuplicateId(EntityId),

    /// An entity was removed from the world while not registered.
    #[error("entity {0} is not registered")]
    NotRegistered(EntityId),

    /// A lookup by identity found nothing.
    #[error("entity {0} not found")]
    NotFound(EntityId),

    /// `destroy` was called on an entity that is already destroyed.
    #[error("entity {0} is already destroyed")]
    AlreadyDestroyed(EntityId),

    /// A required capability was absent from a trait registry.
    #[error("missing required capability: {0}")]
    MissingCapability(String),

    /// `unlimbo` was called without prior limbo data.
    #[error("entity {0} has no limbo data")]
    NotInLimbo(EntityId),

    /// The entity must be spawned for this transition.
    #[error("entity {0} is not spawned")]
    NotSpawned(EntityId),

    /// The entity is already spawned.
    #[error("entity {0} is already spawned")]
    AlreadySpawned(EntityId),

    /// The entity is in limbo and must be unlimboed instead.
    #[error("entity {0} is in limbo")]
    InLimbo(EntityId),

    /// The entity has been disposed and can no longer transition.
    #[error("entity {0} is disposed")]
    Disposed(EntityId),

    /// A player reference does not resolve.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

/// Malformed rules data.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The rules document could not be parsed at all.
    #[error("failed to parse rules: {0}")]
    Parse(#[from] serde_json::Error),

    /// No rules entry exists for the requested object.
    #[error("no rules for {kind} {name:?}")]
    MissingRules {
        /// Requested object name.
        name: String,
        /// Requested object kind.
        kind: EntityKind,
    },

    /// A rules entry failed validation.
    #[error("invalid rules entry {name:?}: {reason}")]
    InvalidEntry {
        /// Offending entry name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
