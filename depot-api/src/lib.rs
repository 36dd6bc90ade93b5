//! # Depot API Server Library
//!
//! HTTP surface of the project depot: login, projects, memberships and users
//! over the transactional core in `depot-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: store selection and credential extractors
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
