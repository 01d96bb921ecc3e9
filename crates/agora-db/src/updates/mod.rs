//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some`
//! fields generate SET clauses in the dynamic UPDATE SQL, and the serialized
//! update (changed fields only) becomes the audit detail.

pub mod user;
