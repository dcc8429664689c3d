//! Core library for Passfold.
//!
//! Contains the secret codec (field-level encryption at rest), the folder
//! store with its tree invariants, the credential store, the organization
//! service that combines the two (moves, cascading deletes, breadcrumb
//! paths), and the account directory. This crate depends on
//! `passfold-storage` for the storage backend trait and knows nothing about
//! HTTP.

pub mod account;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod folder;
pub mod model;
pub mod organizer;
