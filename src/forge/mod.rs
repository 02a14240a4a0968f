//! GitHub organization access.
//!
//! This module lists the repositories of a classroom organization so they
//! can be cloned for grading.

pub mod client;

pub use client::{filter_repositories, Credentials, ForgeClient};
