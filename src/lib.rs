//! Course Archive
//!
//! Hierarchical document repository for academic course submissions. Every
//! folder is addressed by a canonical path that is both its metadata key and
//! its directory under the storage root.

pub mod academic;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod submission;
pub mod web;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{ArchiveError, FileViolation, Result};
