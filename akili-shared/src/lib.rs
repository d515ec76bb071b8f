//! # Akili Shared Library
//!
//! Records, accounting rules, and gateway plumbing shared by the Akili API
//! server and the tutoring pipelines.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and schema migrations
//! - `models`: database records (users, courses, assessments, payments)
//! - `credits`: the credit ledger, the only writer of a user's balance
//! - `scoring`: answer scoring and pass thresholds
//! - `grading`: continuous-assessment and exam grade aggregation
//! - `referrals`: referral claims and daily-cap boosts
//! - `paystack`: payment gateway client, webhook signatures, credit tiers
//! - `auth`: bearer token validation and request identity

pub mod auth;
pub mod credits;
pub mod db;
pub mod grading;
pub mod models;
pub mod paystack;
pub mod referrals;
pub mod scoring;

/// Current version of the Akili shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
