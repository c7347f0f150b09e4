//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and persistence so route handlers stay
//! focused on request parsing, permission checks and status mapping. Every
//! money movement goes through the `wallet` ledger helpers inside a single
//! Postgres transaction.

pub mod access;
pub mod auth;
pub mod catalog;
pub mod matches;
pub mod notification;
pub mod promo;
pub mod referral;
pub mod results;
pub mod session;
pub mod settings;
pub mod user;
pub mod wallet;
