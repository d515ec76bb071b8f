//! # Akili API Server Library
//!
//! HTTP surface of the Akili tutoring platform: course generation, lessons,
//! quizzes and exams, grades, credits, referrals and Paystack payments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Authentication, rate limiting, security headers
//! - `routes`: API route handlers
//! - `telemetry`: Tracing subscriber setup

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod telemetry;
