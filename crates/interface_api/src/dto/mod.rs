//! Request and response bodies

pub mod account;
pub mod batch;
pub mod posting;
pub mod query;
