//! # agora-core
//!
//! Core types, ID prefixes, and error types for Agora.
//!
//! This crate provides the foundational types shared across all Agora crates:
//! - Entity structs for all domain objects (users, scopes, delegations, polls, decisions)
//! - Enums for groups, permissions, poll kinds, and audit actions
//! - ID prefix constants
//! - Validated value types (`Locale`, `Credential`)
//! - Cross-cutting error types
//! - Audit detail sub-types

pub mod audit_detail;
pub mod credentials;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod locale;
