//! # Clubhouse API Server Library
//!
//! JSON backend for running a football club: accounts, squad, fixtures,
//! training sessions, finances and news.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Authentication and validating request extractors
//! - `middleware`: Security response headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
