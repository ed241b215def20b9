//! The contract every fetched resource implements.

use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use terminus_core::Error;

/// Raw per-item data as received from the API, keys in upstream order.
pub type Record = Map<String, Value>;

/// Owner type for collections that are not scoped to a parent resource.
///
/// Uninhabited, so an `Option<Arc<NoOwner>>` is always `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOwner {}

/// Contextual options handed to a model when its collection constructs it.
pub struct ModelOptions<O> {
    /// Identifier the model is cached under.
    pub id: String,
    /// Parent resource of the constructing collection, when it declares one.
    pub owner: Option<Arc<O>>,
    /// Extra options supplied by the caller of [`Collection::add`](crate::Collection::add).
    pub extra: Record,
}

impl<O> ModelOptions<O> {
    /// Options carrying only an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            extra: Record::new(),
        }
    }

    /// Attach the owning resource.
    #[must_use]
    pub fn with_owner(mut self, owner: Arc<O>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Merge caller-supplied options; later keys overwrite earlier ones.
    #[must_use]
    pub fn with_extra(mut self, extra: Record) -> Self {
        self.extra.extend(extra);
        self
    }
}

impl<O> Clone for ModelOptions<O> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            owner: self.owner.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for ModelOptions<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("extra", &self.extra)
            .finish()
    }
}

/// A single remote resource constructible from fetched data.
pub trait Model: Sized + Send + Sync {
    /// Parent resource type injected by the constructing collection.
    type Owner: Send + Sync;

    /// Build the model from its raw record and contextual options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] when the record's attributes cannot be decoded.
    fn from_data(data: Record, options: ModelOptions<Self::Owner>) -> Result<Self>;

    /// Identifier the model is known by.
    fn id(&self) -> &str;
}

/// Constructor a collection uses to turn records into models.
///
/// Defaults to [`Model::from_data`]; a collection can be given a different one with
/// [`Collection::with_factory`](crate::Collection::with_factory).
pub type ModelFactory<M> = fn(Record, ModelOptions<<M as Model>::Owner>) -> Result<M>;

/// Decode a record into a typed attribute struct.
pub(crate) fn decode_attributes<T>(mut data: Record, member: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    data.remove("id");
    serde_json::from_value(Value::Object(data))
        .map_err(|err| Error::ParseError(format!("Invalid {member} attributes: {err}")))
}
