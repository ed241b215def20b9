//! # terminus-core
//!
//! Core types and utilities for talking to the Terminus management API.
//!
//! This crate provides the shared error taxonomy, validated client configuration,
//! and the HTTP request collaborator that resource collections fetch through.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`config`] - Configuration structures for Terminus clients
//! - [`client`] - HTTP client settings and defaults
//! - [`query`] - Query parameter builder
//! - [`request`] - The request collaborator and its reqwest implementation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod request;

// Re-export commonly used types
pub use error::{Error, Result};
pub use request::{ApiResponse, HttpRequester, RequestOptions, Requester};
