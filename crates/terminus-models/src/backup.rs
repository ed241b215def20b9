//! Environment backups.

use crate::collection::{require_owner, Collection, CollectionConfig, CollectionKind};
use crate::environment::Environment;
use crate::model::{decode_attributes, Model, ModelOptions, Record};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use terminus_core::query::QueryParams;
use terminus_core::request::Requester;
use terminus_core::Error;

/// Part of an environment a backup archive holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupElement {
    /// Codebase.
    Code,
    /// Database dump.
    Database,
    /// Uploaded files.
    Files,
}

impl BackupElement {
    /// Wire name of the element.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Database => "database",
            Self::Files => "files",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "code" => Some(Self::Code),
            "database" => Some(Self::Database),
            "files" => Some(Self::Files),
            _ => None,
        }
    }
}

impl fmt::Display for BackupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backup attributes as listed in the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupAttributes {
    /// Folder grouping the archives of one backup run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Archive file name; absent while the backup is still running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Archive size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Completion time as fractional Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One archive in an environment's backup catalog.
#[derive(Debug, Clone)]
pub struct Backup {
    id: String,
    attributes: BackupAttributes,
    environment: Option<Arc<Environment>>,
}

impl Backup {
    /// Decoded attributes.
    #[must_use]
    pub fn attributes(&self) -> &BackupAttributes {
        &self.attributes
    }

    /// Environment the backup was taken from.
    #[must_use]
    pub fn environment(&self) -> Option<&Arc<Environment>> {
        self.environment.as_ref()
    }

    /// Archive type, taken from the identifier's last `_`-separated segment.
    #[must_use]
    pub fn element(&self) -> Option<BackupElement> {
        self.id
            .rsplit_once('_')
            .and_then(|(_, suffix)| BackupElement::from_name(suffix))
    }

    /// When the archive was completed.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .timestamp
            .and_then(|ts| DateTime::from_timestamp(ts.trunc() as i64, 0))
    }

    /// Whether the archive has been written.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.attributes.filename.is_some() && self.attributes.size.unwrap_or(0) > 0
    }
}

impl Model for Backup {
    type Owner = Environment;

    fn from_data(data: Record, options: ModelOptions<Environment>) -> Result<Self> {
        Ok(Self {
            id: options.id,
            attributes: decode_attributes(data, "Backup")?,
            environment: options.owner,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Backup catalog of an environment, optionally narrowed to one element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backups {
    element: Option<BackupElement>,
}

impl Backups {
    /// Catalog of every element.
    #[must_use]
    pub const fn new() -> Self {
        Self { element: None }
    }

    /// Only list archives of `element`.
    #[must_use]
    pub const fn with_element(mut self, element: BackupElement) -> Self {
        self.element = Some(element);
        self
    }

    /// Unfetched catalog of `environment`.
    #[must_use]
    pub fn collection(
        self,
        environment: Arc<Environment>,
        requester: Arc<dyn Requester>,
    ) -> Collection<Self> {
        Collection::new(
            self,
            requester,
            CollectionConfig::new().with_owner(environment),
        )
    }
}

impl CollectionKind for Backups {
    type Owner = Environment;
    type Model = Backup;

    const MEMBER_NAME: &'static str = "Backup";
    const OWNER_NAME: Option<&'static str> = Some("environment");

    fn fetch_url(&self, owner: Option<&Environment>) -> Result<String> {
        let environment = require_owner(owner, "environment")?;
        let site = environment
            .site()
            .ok_or_else(|| Error::MissingOwner("site".to_string()))?;
        Ok(format!(
            "sites/{}/environments/{}/backups/catalog",
            site.id(),
            environment.id()
        ))
    }

    fn fetch_args(&self, _owner: Option<&Environment>) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("element", self.element);
        params
    }
}
