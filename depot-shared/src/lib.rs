//! # Depot Shared Library
//!
//! Authorization and membership-management core of the project depot: the
//! rules deciding who may view or modify which project and user, the
//! canonicalization of client-supplied membership records, and the
//! transactional mutators that keep memberships consistent under concurrent
//! access.
//!
//! ## Module Organization
//!
//! - `error`: `DepotError`, the status/code taxonomy shared by everything
//! - `db`: connection pools, store selection, result-shape and retry helpers
//! - `models`: users, projects, roles, memberships and their SQL
//! - `auth`: password hashing, JWT, credential verification, gates
//! - `canonical`: membership record canonicalization
//! - `mutations`: serializable read-modify-write operations
//! - `queries`: unlocked read operations

pub mod auth;
pub mod canonical;
pub mod db;
pub mod error;
pub mod models;
pub mod mutations;
pub mod queries;

/// Current version of the depot shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
