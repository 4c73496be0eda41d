//! Protocol-agnostic domain model for remote file shares: addresses, entry
//! metadata, sorting and query predicates.

pub mod domain;

pub use domain::*;
