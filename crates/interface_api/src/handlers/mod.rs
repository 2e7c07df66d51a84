//! Request handlers

pub mod accounts;
pub mod batches;
pub mod health;
pub mod migration;
pub mod posting;
pub mod reports;
