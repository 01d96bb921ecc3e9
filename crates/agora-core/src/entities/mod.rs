//! Entity structs for all Agora domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `agora-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON roundtrip and schema validation.

mod audit;
mod decision;
mod delegation;
mod membership;
mod poll;
mod scope;
mod user;

pub use audit::AuditEntry;
pub use decision::Decision;
pub use delegation::Delegation;
pub use membership::Membership;
pub use poll::Poll;
pub use scope::Scope;
pub use user::User;
