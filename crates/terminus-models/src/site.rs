//! Sites and the per-user site collection.

use crate::collection::{Collection, CollectionConfig, CollectionKind};
use crate::environment::Environments;
use crate::model::{decode_attributes, Model, ModelOptions, NoOwner, Record};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use terminus_core::request::Requester;

/// Site attributes as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteAttributes {
    /// Machine name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// CMS framework (drupal, wordpress, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Creation timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub created: Option<DateTime<Utc>>,
    /// Plan / service level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
    /// Upstream the site tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Value>,
    /// Whether the site is frozen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A hosted site.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    id: String,
    attributes: SiteAttributes,
    options: Record,
}

impl Site {
    /// Decoded attributes.
    #[must_use]
    pub fn attributes(&self) -> &SiteAttributes {
        &self.attributes
    }

    /// Machine name, if the API supplied one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes.name.as_deref()
    }

    /// Caller-supplied options the site was constructed with.
    #[must_use]
    pub fn options(&self) -> &Record {
        &self.options
    }

    /// Whether the site is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.attributes.frozen.unwrap_or(false)
    }

    /// The site's environments, scoped to this site and not yet fetched.
    #[must_use]
    pub fn environments(self: &Arc<Self>, requester: Arc<dyn Requester>) -> Collection<Environments> {
        Collection::new(
            Environments,
            requester,
            CollectionConfig::new().with_owner(Arc::clone(self)),
        )
    }
}

impl Model for Site {
    type Owner = NoOwner;

    fn from_data(data: Record, options: ModelOptions<NoOwner>) -> Result<Self> {
        Ok(Self {
            id: options.id,
            attributes: decode_attributes(data, "Site")?,
            options: options.extra,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Sites a user is a member of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sites {
    user_id: String,
}

impl Sites {
    /// Sites of the given user.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Unfetched collection of the user's sites.
    #[must_use]
    pub fn collection(self, requester: Arc<dyn Requester>) -> Collection<Self> {
        Collection::new(self, requester, CollectionConfig::new())
    }
}

impl CollectionKind for Sites {
    type Owner = NoOwner;
    type Model = Site;

    const MEMBER_NAME: &'static str = "Site";

    fn fetch_url(&self, _owner: Option<&NoOwner>) -> Result<String> {
        Ok(format!("users/{}/sites", self.user_id))
    }
}
