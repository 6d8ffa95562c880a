//! Public entry points: the free `marshal*` functions over the global cache,
//! the [`Marshaller`] pipeline and the cache administration calls.

use std::io::Write;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::{self, CacheStats, FieldCache};
use crate::engine::{is_nil, Outcome, SerializeContext};
use crate::error::{JsonGroupError, Result};
use crate::options::Options;
use crate::reflect::{AsReflect, Reflect};

/// Key under which [`marshal_to_map`] places a root that is not an object.
pub const VALUE_KEY: &str = "value";

/// A conversion pipeline bound to a set of [`Options`] and a field cache.
///
/// The free functions ([`marshal`], [`marshal_to_map`], ...) use the default
/// options and the process-wide cache. A `Marshaller` is useful when a
/// component wants its own configuration or an isolated cache.
///
/// ```rust
/// use jsongroup::{GroupMode, GroupObject, Marshaller, Options};
///
/// #[derive(GroupObject)]
/// struct Article {
///     #[jsongroup(json = "title", groups = "public,editor")]
///     pub title: String,
///     #[jsongroup(json = "draft", groups = "editor")]
///     pub draft: bool,
/// }
///
/// let m = Marshaller::new(Options::default().with_group_mode(GroupMode::All));
/// let a = Article { title: "Hello".into(), draft: true };
/// assert_eq!(m.marshal(&a, &["public", "editor"]).unwrap(), br#"{"title":"Hello"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Marshaller {
    options: Options,
    cache: Arc<FieldCache>,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Marshaller {
    /// Creates a pipeline with its own cache sized by `options.cache_capacity`.
    pub fn new(options: Options) -> Self {
        let cache = Arc::new(FieldCache::new(options.cache_capacity));
        Self { options, cache }
    }

    /// Creates a pipeline sharing an existing cache.
    pub fn with_cache(options: Options, cache: Arc<FieldCache>) -> Self {
        Self { options, cache }
    }

    /// The options every call uses.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The cache backing this pipeline.
    pub fn cache(&self) -> &Arc<FieldCache> {
        &self.cache
    }

    /// Converts `value` to JSON bytes, keeping the fields selected by `groups`.
    pub fn marshal<T: AsReflect + ?Sized>(&self, value: &T, groups: &[&str]) -> Result<Vec<u8>> {
        marshal_in(value.as_reflect(), &self.options, &self.cache, groups)
    }

    /// Converts `value` and streams the JSON into `writer`.
    pub fn marshal_to_writer<T, W>(&self, writer: W, value: &T, groups: &[&str]) -> Result<()>
    where
        T: AsReflect + ?Sized,
        W: Write,
    {
        write_in(writer, value.as_reflect(), &self.options, &self.cache, groups)
    }

    /// Converts `value` to an object. See [`marshal_to_map`].
    pub fn marshal_to_map<T: AsReflect + ?Sized>(
        &self,
        value: &T,
        groups: &[&str],
    ) -> Result<Option<Map<String, Value>>> {
        to_map_in(value.as_reflect(), &self.options, &self.cache, groups)
    }

    /// Converts `value` to the JSON tree without encoding it. See [`to_value`].
    pub fn to_value<T: AsReflect + ?Sized>(&self, value: &T, groups: &[&str]) -> Result<Value> {
        convert(value.as_reflect(), &self.options, &self.cache, groups).map(into_value)
    }
}

// --- FREE FUNCTIONS ---

/// Converts `value` to JSON bytes with the default [`Options`], keeping the
/// fields whose groups match `groups` (all fields when `groups` is empty).
///
/// A nil root (`None`) produces `null`.
pub fn marshal<T: AsReflect + ?Sized>(value: &T, groups: &[&str]) -> Result<Vec<u8>> {
    marshal_with_options(value, &Options::default(), groups)
}

/// Converts `value` to JSON bytes with explicit options.
///
/// `options.top_level_key`, when set, wraps the output as `{"<key>": ...}`.
pub fn marshal_with_options<T: AsReflect + ?Sized>(
    value: &T,
    options: &Options,
    groups: &[&str],
) -> Result<Vec<u8>> {
    marshal_in(value.as_reflect(), options, cache::global(), groups)
}

/// Converts `value` and streams the JSON into `writer`.
pub fn marshal_to_writer<T, W>(writer: W, value: &T, options: &Options, groups: &[&str]) -> Result<()>
where
    T: AsReflect + ?Sized,
    W: Write,
{
    write_in(writer, value.as_reflect(), options, cache::global(), groups)
}

/// Converts `value` to a JSON object for further manipulation before encoding.
///
/// Returns `None` for a nil root. A root that does not convert to an object
/// is wrapped as `{"value": ...}`.
///
/// ```rust
/// use jsongroup::marshal_to_map;
///
/// let map = marshal_to_map(&42, &[]).unwrap().unwrap();
/// assert_eq!(map["value"], 42);
/// assert!(marshal_to_map(&None::<i32>, &[]).unwrap().is_none());
/// ```
pub fn marshal_to_map<T: AsReflect + ?Sized>(
    value: &T,
    groups: &[&str],
) -> Result<Option<Map<String, Value>>> {
    marshal_to_map_with_options(value, &Options::default(), groups)
}

/// [`marshal_to_map`] with explicit options.
pub fn marshal_to_map_with_options<T: AsReflect + ?Sized>(
    value: &T,
    options: &Options,
    groups: &[&str],
) -> Result<Option<Map<String, Value>>> {
    to_map_in(value.as_reflect(), options, cache::global(), groups)
}

/// Converts `value` to the JSON tree without encoding it. A dropped root
/// becomes `null`; the top-level key is not applied.
pub fn to_value<T: AsReflect + ?Sized>(value: &T, options: &Options, groups: &[&str]) -> Result<Value> {
    convert(value.as_reflect(), options, cache::global(), groups).map(into_value)
}

/// Counters of the process-wide field cache.
pub fn cache_stats() -> CacheStats {
    cache::global().stats()
}

/// Resizes the process-wide field cache, evicting down to `capacity` before
/// returning. `0` disables caching.
pub fn set_cache_capacity(capacity: usize) -> Result<()> {
    cache::global().set_capacity(capacity)
}

/// Empties the process-wide field cache and resets its counters.
pub fn clear_cache() {
    cache::global().clear()
}

// --- PIPELINE ---

fn convert(
    value: &dyn Reflect,
    options: &Options,
    cache: &FieldCache,
    groups: &[&str],
) -> Result<Outcome> {
    tracing::trace!(?groups, mode = ?options.group_mode, "converting value");
    let outcome = SerializeContext::new(options, cache, groups).to_ir(value);
    if let Err(e) = &outcome {
        tracing::trace!(error = %e, "conversion failed");
    }
    outcome
}

fn into_value(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Emit(value) => value,
        Outcome::Drop => Value::Null,
    }
}

fn root_is_nil(value: &dyn Reflect) -> bool {
    value.reflect().map(|k| is_nil(&k)).unwrap_or(false)
}

/// Builds the final document: nil roots stay `null`, anything else gets the
/// optional top-level key.
fn document(
    value: &dyn Reflect,
    options: &Options,
    cache: &FieldCache,
    groups: &[&str],
) -> Result<Value> {
    if root_is_nil(value) {
        return Ok(Value::Null);
    }
    let ir = into_value(convert(value, options, cache, groups)?);
    Ok(match &options.top_level_key {
        Some(key) => {
            let mut wrapped = Map::with_capacity(1);
            wrapped.insert(key.clone(), ir);
            Value::Object(wrapped)
        }
        None => ir,
    })
}

fn marshal_in(
    value: &dyn Reflect,
    options: &Options,
    cache: &FieldCache,
    groups: &[&str],
) -> Result<Vec<u8>> {
    let doc = document(value, options, cache, groups)?;
    serde_json::to_vec(&doc).map_err(|e| JsonGroupError::from_encoder(e, "", "serde_json::Value"))
}

fn write_in<W: Write>(
    mut writer: W,
    value: &dyn Reflect,
    options: &Options,
    cache: &FieldCache,
    groups: &[&str],
) -> Result<()> {
    let doc = document(value, options, cache, groups)?;
    serde_json::to_writer(&mut writer, &doc)
        .map_err(|e| JsonGroupError::from_encoder(e, "", "serde_json::Value"))?;
    writer.flush()?;
    Ok(())
}

fn to_map_in(
    value: &dyn Reflect,
    options: &Options,
    cache: &FieldCache,
    groups: &[&str],
) -> Result<Option<Map<String, Value>>> {
    if root_is_nil(value) {
        return Ok(None);
    }
    match into_value(convert(value, options, cache, groups)?) {
        Value::Object(map) => Ok(Some(map)),
        other => {
            let mut wrapped = Map::with_capacity(1);
            wrapped.insert(VALUE_KEY.to_owned(), other);
            Ok(Some(wrapped))
        }
    }
}
