//! Repository modules implementing the store and engine operations.
//!
//! Each module adds methods to `AgoraService` via `impl AgoraService` blocks.
//! Public methods take the service gate; `*_in` helpers run on a caller
//! supplied connection or transaction and take no gate.

pub mod audit;
pub mod decision;
pub mod delegation;
pub mod membership;
pub mod poll;
pub mod scope;
pub mod tally;
pub mod user;
