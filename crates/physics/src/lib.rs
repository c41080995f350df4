//! Camera physics for isleview: gravity and ground contact against a height query.

pub mod body;

pub use body::*;
