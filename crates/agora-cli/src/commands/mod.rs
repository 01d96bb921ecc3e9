pub mod audit;
pub mod delegation;
pub mod dispatch;
pub mod poll;
pub mod position;
pub mod resolve;
pub mod scope;
pub mod shared;
pub mod tally;
pub mod user;
pub mod vote;
