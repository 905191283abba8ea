//! Points ledger service
//!
//! Accounts sign up and sign in, admins record point-granting activities,
//! and accounts transfer or spend their balance. Procedures are exposed as
//! XRPC-style JSON endpoints over HTTP.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod crypto;
pub mod db;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod rate_limit;
pub mod server;
