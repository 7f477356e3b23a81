//! Scenario tests that drive the whole kernel through its public API.
//!
//! - `lifecycle.rs`: entity transitions and their notification order
//! - `scheduler.rs`: tick step ordering and deferred work
//! - `determinism.rs`: replay and lockstep hash agreement
//! - `helpers.rs`: rules fixtures and recording traits

mod determinism;
mod helpers;
