//! HTTP route handlers for Passfold.
//!
//! Routes are organized by subsystem:
//! - `auth`: login and credential changes
//! - `folders`: folder tree CRUD, moves, cascading delete, breadcrumbs
//! - `credentials`: credential CRUD, bulk replace, moves
//! - `accounts`: user management
//! - `sys`: health check

pub mod accounts;
pub mod auth;
pub mod credentials;
pub mod folders;
pub mod sys;
