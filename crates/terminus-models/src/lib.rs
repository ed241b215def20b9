//! Lazily fetched resource collections for the Terminus API client.
//!
//! A [`Collection`] lists one kind of remote resource, builds a [`Model`] for each
//! entry, and caches the results by identifier. Concrete kinds are provided for
//! sites, their environments, and environment backups.

#![deny(missing_docs)]

pub mod backup;
pub mod collection;
pub mod environment;
pub mod model;
pub mod site;

pub use backup::{Backup, BackupAttributes, BackupElement, Backups};
pub use collection::{require_owner, Collection, CollectionConfig, CollectionKind, FetchState};
pub use environment::{Environment, EnvironmentAttributes, Environments};
pub use model::{Model, ModelFactory, ModelOptions, NoOwner, Record};
pub use site::{Site, SiteAttributes, Sites};

/// Convenient result alias that reuses the shared Terminus error type.
pub type Result<T> = terminus_core::Result<T>;
