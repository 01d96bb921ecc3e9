mod delegation;
mod poll;
mod position;
mod scope;
mod user;

pub use delegation::DelegationCommands;
pub use poll::PollCommands;
pub use position::PositionCommands;
pub use scope::ScopeCommands;
pub use user::UserCommands;
