//! CLI command implementations.

pub mod inspect;
pub mod ledger;
pub mod pull;
pub mod push;
