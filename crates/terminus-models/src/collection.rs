//! Lazily fetched, identifier-keyed collections of remote resources.
//!
//! A [`Collection`] issues one list request on first read, turns every entry of the
//! response's `data` into a [`Model`], and serves later reads from its cache. What to
//! fetch and which model to build are described by a [`CollectionKind`].
//!
//! Fetching is additive: [`Collection::fetch`] inserts or overwrites entries by
//! identifier and never clears the cache first, so entries missing from a later
//! response stay cached.

use crate::model::{Model, ModelFactory, ModelOptions, Record};
use crate::Result;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use terminus_core::query::QueryParams;
use terminus_core::request::{RequestOptions, Requester};
use terminus_core::Error;
use tracing::{debug, info};

/// Describes one kind of collection: where it is fetched from and what it holds.
pub trait CollectionKind: Send + Sync {
    /// Parent resource type scoping this collection, [`NoOwner`](crate::NoOwner) if none.
    type Owner: Send + Sync;

    /// Model type built for each entry.
    type Model: Model<Owner = Self::Owner>;

    /// Name of the member model, e.g. `"Site"` for a collection of sites.
    const MEMBER_NAME: &'static str;

    /// Property name the owner is known by, `None` for unscoped collections.
    ///
    /// When set, every constructed model receives the configured owner.
    const OWNER_NAME: Option<&'static str> = None;

    /// Path of the list endpoint, relative to the API host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOwner`] when the path needs an owner that is not set.
    fn fetch_url(&self, owner: Option<&Self::Owner>) -> Result<String>;

    /// Extra query arguments for the list request.
    fn fetch_args(&self, _owner: Option<&Self::Owner>) -> QueryParams {
        QueryParams::new()
    }
}

/// Fetch lifecycle of a collection.
///
/// Reads fetch only while the collection is `Unfetched` and its cache is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// No fetch has succeeded yet.
    Unfetched,
    /// At least one fetch succeeded; reads are served from the cache.
    Fetched,
}

/// Construction-time settings for a [`Collection`].
pub struct CollectionConfig<O> {
    /// Parent resource the collection is scoped to.
    pub owner: Option<Arc<O>>,
    /// Query arguments appended after the kind's own fetch arguments.
    pub fetch_args: QueryParams,
}

impl<O> CollectionConfig<O> {
    /// Empty configuration: no owner, no extra arguments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            owner: None,
            fetch_args: QueryParams::new(),
        }
    }

    /// Scope the collection to `owner`.
    #[must_use]
    pub fn with_owner(mut self, owner: Arc<O>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Append extra query arguments to every fetch.
    #[must_use]
    pub fn with_fetch_args(mut self, args: QueryParams) -> Self {
        self.fetch_args.extend(&args);
        self
    }
}

impl<O> Default for CollectionConfig<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrow a required owner or fail with [`Error::MissingOwner`].
///
/// # Errors
///
/// Returns [`Error::MissingOwner`] naming `name` when `owner` is `None`.
pub fn require_owner<'a, O>(owner: Option<&'a O>, name: &str) -> Result<&'a O> {
    owner.ok_or_else(|| Error::MissingOwner(name.to_string()))
}

/// A lazily populated cache of models keyed by identifier.
pub struct Collection<K: CollectionKind> {
    kind: K,
    requester: Arc<dyn Requester>,
    config: CollectionConfig<K::Owner>,
    factory: ModelFactory<K::Model>,
    models: IndexMap<String, Arc<K::Model>>,
    state: FetchState,
}

impl<K: CollectionKind> Collection<K> {
    /// Create an empty, unfetched collection.
    pub fn new(
        kind: K,
        requester: Arc<dyn Requester>,
        config: CollectionConfig<K::Owner>,
    ) -> Self {
        Self {
            kind,
            requester,
            config,
            factory: <K::Model as Model>::from_data,
            models: IndexMap::new(),
            state: FetchState::Unfetched,
        }
    }

    /// Replace the model constructor.
    #[must_use]
    pub fn with_factory(mut self, factory: ModelFactory<K::Model>) -> Self {
        self.factory = factory;
        self
    }

    /// All models, fetching first if nothing has been fetched or added yet.
    ///
    /// Models come back in the order the API listed them.
    ///
    /// # Errors
    ///
    /// Propagates any error from the triggered fetch.
    pub async fn all(&mut self) -> Result<Vec<&Arc<K::Model>>> {
        Ok(self.members().await?.values().collect())
    }

    /// Identifiers in the same order as [`Collection::all`].
    ///
    /// # Errors
    ///
    /// Propagates any error from the triggered fetch.
    pub async fn ids(&mut self) -> Result<Vec<&str>> {
        Ok(self.members().await?.keys().map(String::as_str).collect())
    }

    /// The model cached under `id`, or `None` if the collection has no such member.
    ///
    /// # Errors
    ///
    /// Propagates any error from the triggered fetch; an unknown `id` is not an error.
    pub async fn get(&mut self, id: &str) -> Result<Option<&Arc<K::Model>>> {
        Ok(self.members().await?.get(id))
    }

    /// Request the list endpoint and merge every entry into the cache.
    ///
    /// Always performs exactly one request. Entries are added or overwritten by
    /// identifier; cached entries absent from this response are kept. When an entry
    /// fails to build, the error is returned and entries added before it stay cached.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the requester unchanged,
    /// [`Error::MalformedResponse`] when the response lacks `data` or its entries are
    /// not records, and any error raised while constructing a model.
    pub async fn fetch(&mut self) -> Result<()> {
        let owner = self.config.owner.as_deref();
        let url = self.kind.fetch_url(owner)?;
        let mut args = self.kind.fetch_args(owner);
        args.extend(&self.config.fetch_args);
        let options = RequestOptions::get().with_query(args);

        let response = self.requester.request(&url, &options).await?;
        let data = response.data.ok_or_else(|| {
            Error::MalformedResponse(format!("response from `{url}` has no `data` field"))
        })?;

        let entries = normalize(data)?;
        let count = entries.len();

        for (key, model_data) in entries {
            let mut record = match model_data {
                Value::Object(record) => record,
                other => {
                    return Err(Error::MalformedResponse(format!(
                        "entry `{key}` from `{url}` is {}, expected a record",
                        value_kind(&other)
                    )))
                }
            };

            if !record.contains_key("id") {
                record.insert("id".to_string(), Value::String(key));
            }

            self.add(record, Record::new())?;
        }

        self.state = FetchState::Fetched;
        info!(
            member = K::MEMBER_NAME,
            url = %url,
            received = count,
            cached = self.models.len(),
            "Fetched collection"
        );

        Ok(())
    }

    /// Build a model from `model_data` and cache it under its `id`.
    ///
    /// `extra` is passed to the model as caller-supplied options; an `id` in `extra`
    /// overrides the model's identifier while the cache key stays the record's `id`.
    /// If the kind declares an owner, the configured owner is injected as well. An
    /// existing model with the same identifier is replaced in place.
    ///
    /// Adding does not mark the collection fetched, but a non-empty cache keeps reads
    /// from fetching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the record or `extra` has no usable `id`,
    /// [`Error::MissingOwner`] if the kind declares an owner that is not configured,
    /// and any error from the model factory.
    pub fn add(&mut self, model_data: Record, mut extra: Record) -> Result<&Arc<K::Model>> {
        let id = record_id(&model_data)?;
        let model_id = match extra.remove("id") {
            Some(value) => id_string(&value)?,
            None => id.clone(),
        };
        let mut options = ModelOptions::new(model_id).with_extra(extra);

        if let Some(owner_name) = K::OWNER_NAME {
            let owner = self
                .config
                .owner
                .clone()
                .ok_or_else(|| Error::MissingOwner(owner_name.to_string()))?;
            options = options.with_owner(owner);
        }

        let model = (self.factory)(model_data, options)?;
        let (index, _) = self.models.insert_full(id, Arc::new(model));
        Ok(&self.models[index])
    }

    /// Current fetch state.
    #[must_use]
    pub const fn state(&self) -> FetchState {
        self.state
    }

    /// Whether a fetch has succeeded.
    #[must_use]
    pub fn is_fetched(&self) -> bool {
        self.state == FetchState::Fetched
    }

    /// Number of cached models, without fetching.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the cache is empty, without fetching.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Parent resource this collection is scoped to.
    #[must_use]
    pub fn owner(&self) -> Option<&Arc<K::Owner>> {
        self.config.owner.as_ref()
    }

    /// Name of the member model type.
    #[must_use]
    pub const fn member_name(&self) -> &'static str {
        K::MEMBER_NAME
    }

    /// The collection kind.
    #[must_use]
    pub const fn kind(&self) -> &K {
        &self.kind
    }

    async fn members(&mut self) -> Result<&IndexMap<String, Arc<K::Model>>> {
        if self.state == FetchState::Unfetched && self.models.is_empty() {
            debug!(member = K::MEMBER_NAME, "Collection is empty, fetching");
            self.fetch().await?;
        }
        Ok(&self.models)
    }
}

/// Turn a response's `data` into `(key, entry)` pairs in upstream order.
///
/// Keyed maps yield their keys; lists are keyed by position.
fn normalize(data: Value) -> Result<Vec<(String, Value)>> {
    match data {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect()),
        other => Err(Error::MalformedResponse(format!(
            "`data` is {}, expected a keyed map or a list",
            value_kind(&other)
        ))),
    }
}

fn record_id(record: &Record) -> Result<String> {
    record
        .get("id")
        .ok_or_else(|| Error::MalformedResponse("record has no `id` field".to_string()))
        .and_then(id_string)
}

fn id_string(value: &Value) -> Result<String> {
    match value {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(Error::MalformedResponse(format!(
            "identifier is {}, expected a string or number",
            value_kind(other)
        ))),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a record",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoOwner;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use terminus_core::ApiResponse;

    mock! {
        pub Api {}

        #[async_trait]
        impl Requester for Api {
            async fn request(&self, path: &str, options: &RequestOptions) -> Result<ApiResponse>;
        }
    }

    #[derive(Debug)]
    struct Parent {
        id: String,
    }

    #[derive(Debug)]
    struct Widget {
        id: String,
        label: Option<String>,
        parent: Option<Arc<Parent>>,
        extra: Record,
    }

    impl Model for Widget {
        type Owner = Parent;

        fn from_data(data: Record, options: ModelOptions<Parent>) -> Result<Self> {
            Ok(Self {
                id: options.id,
                label: data.get("label").and_then(Value::as_str).map(str::to_string),
                parent: options.owner,
                extra: options.extra,
            })
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    struct Widgets;

    impl CollectionKind for Widgets {
        type Owner = Parent;
        type Model = Widget;

        const MEMBER_NAME: &'static str = "Widget";
        const OWNER_NAME: Option<&'static str> = Some("parent");

        fn fetch_url(&self, owner: Option<&Parent>) -> Result<String> {
            let parent = require_owner(owner, "parent")?;
            Ok(format!("parents/{}/widgets", parent.id))
        }

        fn fetch_args(&self, _owner: Option<&Parent>) -> QueryParams {
            QueryParams::new().with("expand", "all")
        }
    }

    #[derive(Debug)]
    struct Gadget {
        id: String,
    }

    impl Model for Gadget {
        type Owner = NoOwner;

        fn from_data(_data: Record, options: ModelOptions<NoOwner>) -> Result<Self> {
            Ok(Self { id: options.id })
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    struct Gadgets;

    impl CollectionKind for Gadgets {
        type Owner = NoOwner;
        type Model = Gadget;

        const MEMBER_NAME: &'static str = "Gadget";

        fn fetch_url(&self, _owner: Option<&NoOwner>) -> Result<String> {
            Ok("gadgets".to_string())
        }
    }

    fn parent() -> Arc<Parent> {
        Arc::new(Parent {
            id: "p1".to_string(),
        })
    }

    fn widgets(api: MockApi) -> Collection<Widgets> {
        Collection::new(
            Widgets,
            Arc::new(api),
            CollectionConfig::new().with_owner(parent()),
        )
    }

    fn gadgets(api: MockApi) -> Collection<Gadgets> {
        Collection::new(Gadgets, Arc::new(api), CollectionConfig::new())
    }

    fn respond_once(api: &mut MockApi, data: Value) {
        api.expect_request()
            .times(1)
            .returning(move |_, _| Ok(ApiResponse::with_data(data.clone())));
    }

    #[tokio::test]
    async fn does_not_fetch_until_first_read() {
        let mut api = MockApi::new();
        api.expect_request().times(0);

        let collection = gadgets(api);
        assert_eq!(collection.state(), FetchState::Unfetched);
        assert!(collection.is_empty());
        assert_eq!(collection.member_name(), "Gadget");
    }

    #[tokio::test]
    async fn repeated_reads_fetch_once() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"a": {}, "b": {}, "c": {}}));

        let mut collection = gadgets(api);
        let first: Vec<String> = collection
            .all()
            .await
            .unwrap()
            .iter()
            .map(|g| g.id().to_string())
            .collect();
        let second: Vec<String> = collection
            .all()
            .await
            .unwrap()
            .iter()
            .map(|g| g.id().to_string())
            .collect();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(collection.ids().await.unwrap(), vec!["a", "b", "c"]);
        assert!(collection.get("b").await.unwrap().is_some());
        assert!(collection.is_fetched());
    }

    #[tokio::test]
    async fn get_triggers_the_first_fetch() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"only": {}}));

        let mut collection = gadgets(api);
        let gadget = collection.get("only").await.unwrap().unwrap();
        assert_eq!(gadget.id(), "only");
    }

    #[tokio::test]
    async fn ids_follow_upstream_order() {
        let mut api = MockApi::new();
        respond_once(
            &mut api,
            json!({"C": {"label": "c"}, "A": {"label": "a"}, "B": {"label": "b"}}),
        );

        let mut collection = widgets(api);
        assert_eq!(collection.ids().await.unwrap(), vec!["C", "A", "B"]);

        let labels: Vec<Option<String>> = collection
            .all()
            .await
            .unwrap()
            .iter()
            .map(|w| w.label.clone())
            .collect();
        assert_eq!(
            labels,
            vec![Some("c".into()), Some("a".into()), Some("b".into())]
        );
    }

    #[tokio::test]
    async fn entry_key_becomes_missing_id() {
        let mut api = MockApi::new();
        respond_once(
            &mut api,
            json!({"abc123": {"label": "keyed"}, "xyz": {"id": "explicit"}}),
        );

        let mut collection = widgets(api);
        let keyed = collection.get("abc123").await.unwrap().unwrap();
        assert_eq!(keyed.id(), "abc123");

        assert!(collection.get("xyz").await.unwrap().is_none());
        assert!(collection.get("explicit").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn owner_is_injected_into_every_model() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"w1": {}, "w2": {}}));

        let owner = parent();
        let mut collection = Collection::new(
            Widgets,
            Arc::new(api),
            CollectionConfig::new().with_owner(Arc::clone(&owner)),
        );

        let all = collection.all().await.unwrap();
        assert_eq!(all.len(), 2);
        for widget in all {
            assert!(Arc::ptr_eq(widget.parent.as_ref().unwrap(), &owner));
        }
    }

    #[tokio::test]
    async fn fetch_merges_instead_of_replacing() {
        let mut api = MockApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_request()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(ApiResponse::with_data(
                    json!({"a": {"label": "old"}, "b": {}}),
                ))
            });
        api.expect_request()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(ApiResponse::with_data(
                    json!({"c": {}, "a": {"label": "new"}}),
                ))
            });

        let mut collection = widgets(api);
        collection.fetch().await.unwrap();
        collection.fetch().await.unwrap();

        assert_eq!(collection.ids().await.unwrap(), vec!["a", "b", "c"]);
        let a = collection.get("a").await.unwrap().unwrap();
        assert_eq!(a.label.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn unknown_id_is_absent_not_an_error() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"a": {}}));

        let mut collection = gadgets(api);
        let result = collection.get("nonexistent").await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn request_uses_owner_url_and_merged_args() {
        let mut api = MockApi::new();
        api.expect_request()
            .withf(|path, options| {
                path == "parents/p1/widgets"
                    && options.method == RequestOptions::get().method
                    && options.query
                        == vec![
                            ("expand".to_string(), "all".to_string()),
                            ("limit".to_string(), "5".to_string()),
                        ]
            })
            .times(1)
            .returning(|_, _| Ok(ApiResponse::with_data(json!([]))));

        let mut collection = Collection::new(
            Widgets,
            Arc::new(api),
            CollectionConfig::new()
                .with_owner(parent())
                .with_fetch_args(QueryParams::new().with("limit", 5)),
        );
        collection.fetch().await.unwrap();
        assert!(collection.is_fetched());
    }

    #[tokio::test]
    async fn empty_response_counts_as_fetched() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!([]));

        let mut collection = gadgets(api);
        assert!(collection.all().await.unwrap().is_empty());
        assert!(collection.all().await.unwrap().is_empty());
        assert!(collection.is_fetched());
    }

    #[tokio::test]
    async fn list_data_is_keyed_by_position() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!([{"label": "first"}, {"id": "named"}]));

        let mut collection = widgets(api);
        assert_eq!(collection.ids().await.unwrap(), vec!["0", "named"]);
    }

    #[tokio::test]
    async fn numeric_ids_are_stringified() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"x": {"id": 42}}));

        let mut collection = gadgets(api);
        assert_eq!(collection.ids().await.unwrap(), vec!["42"]);
    }

    #[tokio::test]
    async fn missing_data_is_malformed() {
        let mut api = MockApi::new();
        api.expect_request()
            .times(1)
            .returning(|_, _| Ok(ApiResponse::empty(200)));

        let mut collection = gadgets(api);
        let err = collection.all().await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
        assert_eq!(collection.state(), FetchState::Unfetched);
    }

    #[tokio::test]
    async fn scalar_data_is_malformed() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!("nope"));

        let mut collection = gadgets(api);
        let err = collection.fetch().await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(ref msg) if msg.contains("a string")));
    }

    #[tokio::test]
    async fn non_record_entry_is_malformed_and_keeps_earlier_entries() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"a": {}, "b": 7, "c": {}}));

        let mut collection = gadgets(api);
        let err = collection.fetch().await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(ref msg) if msg.contains("`b`")));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.state(), FetchState::Unfetched);

        // The partial cache is served as-is; reading does not fetch again.
        assert_eq!(collection.ids().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn transport_errors_propagate_unchanged() {
        let mut api = MockApi::new();
        api.expect_request()
            .times(2)
            .returning(|_, _| Err(Error::Timeout("deadline".to_string())));

        let mut collection = gadgets(api);
        assert_eq!(
            collection.all().await.unwrap_err(),
            Error::Timeout("deadline".to_string())
        );
        // Nothing was cached, so the next read fetches again.
        assert_eq!(
            collection.ids().await.unwrap_err(),
            Error::Timeout("deadline".to_string())
        );
    }

    #[tokio::test]
    async fn missing_owner_fails_before_requesting() {
        let mut api = MockApi::new();
        api.expect_request().times(0);

        let mut collection: Collection<Widgets> =
            Collection::new(Widgets, Arc::new(api), CollectionConfig::new());
        let err = collection.fetch().await.unwrap_err();
        assert_eq!(err, Error::MissingOwner("parent".to_string()));
    }

    #[test]
    fn add_passes_extra_options_and_overwrites_in_place() {
        let mut api = MockApi::new();
        api.expect_request().times(0);
        let mut collection = widgets(api);

        let mut first = Record::new();
        first.insert("id".into(), json!("w1"));
        first.insert("label".into(), json!("one"));
        let mut second = Record::new();
        second.insert("id".into(), json!("w2"));
        collection.add(first, Record::new()).unwrap();
        collection.add(second, Record::new()).unwrap();

        let mut replacement = Record::new();
        replacement.insert("id".into(), json!("w1"));
        replacement.insert("label".into(), json!("uno"));
        let mut extra = Record::new();
        extra.insert("source".into(), json!("manual"));
        let added = collection.add(replacement, extra).unwrap();

        assert_eq!(added.label.as_deref(), Some("uno"));
        assert_eq!(added.extra.get("source"), Some(&json!("manual")));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.state(), FetchState::Unfetched);
    }

    #[tokio::test]
    async fn added_models_keep_reads_from_fetching() {
        let mut api = MockApi::new();
        api.expect_request().times(0);
        let mut collection = gadgets(api);

        let mut record = Record::new();
        record.insert("id".into(), json!("manual"));
        collection.add(record, Record::new()).unwrap();

        assert_eq!(collection.ids().await.unwrap(), vec!["manual"]);
        assert!(collection.get("other").await.unwrap().is_none());
        assert_eq!(collection.state(), FetchState::Unfetched);
    }

    #[tokio::test]
    async fn explicit_fetch_after_add_still_requests() {
        let mut api = MockApi::new();
        respond_once(&mut api, json!({"z": {}}));
        let mut collection = gadgets(api);

        let mut record = Record::new();
        record.insert("id".into(), json!("manual"));
        collection.add(record, Record::new()).unwrap();
        collection.fetch().await.unwrap();

        assert_eq!(collection.ids().await.unwrap(), vec!["manual", "z"]);
        assert!(collection.is_fetched());
    }

    #[test]
    fn caller_id_overrides_model_id_but_not_cache_key() {
        let mut collection = widgets(MockApi::new());

        let mut record = Record::new();
        record.insert("id".into(), json!("w1"));
        let mut extra = Record::new();
        extra.insert("id".into(), json!("alias"));
        extra.insert("source".into(), json!("manual"));
        let added = collection.add(record, extra).unwrap();

        assert_eq!(added.id(), "alias");
        assert!(!added.extra.contains_key("id"));
        assert_eq!(added.extra.get("source"), Some(&json!("manual")));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.models.get_index_of("w1"), Some(0));
    }

    #[test]
    fn caller_id_must_be_string_or_number() {
        let mut collection = gadgets(MockApi::new());

        let mut record = Record::new();
        record.insert("id".into(), json!("g1"));
        let mut extra = Record::new();
        extra.insert("id".into(), json!(["bad"]));

        let err = collection.add(record, extra).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(ref msg) if msg.contains("a list")));
        assert!(collection.is_empty());
    }

    #[test]
    fn add_without_id_is_malformed() {
        let mut collection = gadgets(MockApi::new());
        let err = collection.add(Record::new(), Record::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn custom_factory_replaces_from_data() {
        fn shouting(_data: Record, options: ModelOptions<NoOwner>) -> Result<Gadget> {
            Ok(Gadget {
                id: options.id.to_uppercase(),
            })
        }

        let mut api = MockApi::new();
        respond_once(&mut api, json!({"abc": {}}));

        let mut collection = gadgets(api).with_factory(shouting);
        let gadget = collection.get("abc").await.unwrap().unwrap();
        assert_eq!(gadget.id(), "ABC");
    }

    #[tokio::test]
    async fn factory_errors_propagate() {
        fn failing(_data: Record, _options: ModelOptions<NoOwner>) -> Result<Gadget> {
            Err(Error::ParseError("bad gadget".to_string()))
        }

        let mut api = MockApi::new();
        respond_once(&mut api, json!({"abc": {}}));

        let mut collection = gadgets(api).with_factory(failing);
        let err = collection.all().await.unwrap_err();
        assert_eq!(err, Error::ParseError("bad gadget".to_string()));
    }
}
