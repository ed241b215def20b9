//! Site environments.

use crate::backup::Backups;
use crate::collection::{require_owner, Collection, CollectionConfig, CollectionKind};
use crate::model::{decode_attributes, Model, ModelOptions, Record};
use crate::site::Site;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use terminus_core::request::Requester;

/// Environments every site has; anything else is a multidev.
pub const STANDARD_ENVIRONMENTS: [&str; 3] = ["dev", "test", "live"];

/// Environment attributes as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentAttributes {
    /// Creation timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub environment_created: Option<DateTime<Utc>>,
    /// DNS zone the environment's hostnames live under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_zone: Option<String>,
    /// SFTP mode when `true`, git mode otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_server_development: Option<bool>,
    /// HTTP basic-auth lock settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<Value>,
    /// Git ref the environment tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One environment of a site.
#[derive(Debug, Clone)]
pub struct Environment {
    id: String,
    attributes: EnvironmentAttributes,
    site: Option<Arc<Site>>,
    options: Record,
}

impl Environment {
    /// Decoded attributes.
    #[must_use]
    pub fn attributes(&self) -> &EnvironmentAttributes {
        &self.attributes
    }

    /// Site this environment belongs to.
    #[must_use]
    pub fn site(&self) -> Option<&Arc<Site>> {
        self.site.as_ref()
    }

    /// Caller-supplied options.
    #[must_use]
    pub fn options(&self) -> &Record {
        &self.options
    }

    /// Whether this is a multidev rather than dev, test or live.
    #[must_use]
    pub fn is_multidev(&self) -> bool {
        !STANDARD_ENVIRONMENTS.contains(&self.id.as_str())
    }

    /// Whether the environment is in SFTP mode.
    #[must_use]
    pub fn is_sftp_mode(&self) -> bool {
        self.attributes.on_server_development.unwrap_or(false)
    }

    /// The environment's backup catalog, not yet fetched.
    #[must_use]
    pub fn backups(self: &Arc<Self>, requester: Arc<dyn Requester>) -> Collection<Backups> {
        Collection::new(
            Backups::new(),
            requester,
            CollectionConfig::new().with_owner(Arc::clone(self)),
        )
    }
}

impl Model for Environment {
    type Owner = Site;

    fn from_data(data: Record, options: ModelOptions<Site>) -> Result<Self> {
        Ok(Self {
            id: options.id,
            attributes: decode_attributes(data, "Environment")?,
            site: options.owner,
            options: options.extra,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Environments of a site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environments;

impl CollectionKind for Environments {
    type Owner = Site;
    type Model = Environment;

    const MEMBER_NAME: &'static str = "Environment";
    const OWNER_NAME: Option<&'static str> = Some("site");

    fn fetch_url(&self, owner: Option<&Site>) -> Result<String> {
        let site = require_owner(owner, "site")?;
        Ok(format!("sites/{}/environments", site.id()))
    }
}
