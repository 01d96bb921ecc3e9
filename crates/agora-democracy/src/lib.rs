//! # agora-democracy
//!
//! The liquid-democracy engine. Everything here is synchronous and pure: it
//! works over immutable snapshots ([`ScopeTree`], [`GraphSnapshot`],
//! [`DecisionSet`], [`AccessIndex`]) that the storage layer loads in one read.
//!
//! - [`scope`]: containment and specificity over the scope tree
//! - [`graph`]: active delegation edges at an instant
//! - [`resolver`]: chain walking with a cycle guard, represented counts
//! - [`decision`]: direct votes combined with delegated stance
//! - [`tally`]: weighted poll aggregation and the pass rule
//! - [`access`]: group permissions per scope

pub mod access;
pub mod decision;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod scope;
pub mod tally;

pub use access::AccessIndex;
pub use decision::{DecisionSet, EffectiveDecision, effective_decision};
pub use error::DemocracyError;
pub use graph::{DelegationGraph, GraphSnapshot};
pub use resolver::{Resolution, Resolver, Walk};
pub use scope::ScopeTree;
pub use tally::{Outcome, Tally, TallyPolicy, tally};
