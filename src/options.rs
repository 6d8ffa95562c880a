//! Per-call configuration.

use serde::{Deserialize, Serialize};

/// Default recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default number of struct types kept in a field cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default attribute key holding a field's group list.
pub const DEFAULT_TAG_KEY: &str = "groups";

/// How the requested groups are combined when deciding whether a field is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// The field must belong to at least one requested group.
    #[default]
    Any,
    /// The field must belong to every requested group.
    All,
}

/// Conversion options. Immutable once built; use the `with_*` methods to derive
/// a modified copy.
///
/// ```rust
/// use jsongroup::{GroupMode, Options};
///
/// let opts = Options::default()
///     .with_group_mode(GroupMode::All)
///     .with_max_depth(8)
///     .with_null_if_empty(true);
///
/// assert!(!opts.ignore_nil_pointers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Group combination policy.
    pub group_mode: GroupMode,
    /// When set, byte output is wrapped as `{ key: <value> }`.
    pub top_level_key: Option<String>,
    /// Attribute key read for group lists.
    pub tag_key: String,
    /// Emit `null` for empty and nil values instead of omitting or emitting an
    /// empty container. Overrides `omitempty`.
    pub null_if_empty: bool,
    /// Drop struct fields holding `None` entirely.
    pub ignore_nil_pointers: bool,
    /// Recursion limit, `0` means unlimited.
    pub max_depth: usize,
    /// Skip the visited-identity bookkeeping. Cyclic input will then only be
    /// stopped by `max_depth`.
    pub disable_circular_check: bool,
    /// Capacity of the cache a [`Marshaller`](crate::Marshaller) creates for itself.
    pub cache_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            group_mode: GroupMode::Any,
            top_level_key: None,
            tag_key: DEFAULT_TAG_KEY.to_owned(),
            null_if_empty: false,
            ignore_nil_pointers: true,
            max_depth: DEFAULT_MAX_DEPTH,
            disable_circular_check: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Options {
    /// Sets the group combination policy.
    #[must_use]
    pub fn with_group_mode(mut self, mode: GroupMode) -> Self {
        self.group_mode = mode;
        self
    }

    /// Wraps byte output under `key`. An empty key disables wrapping.
    #[must_use]
    pub fn with_top_level_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.top_level_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Reads group lists from `key` instead of `groups`.
    #[must_use]
    pub fn with_tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_key = key.into();
        self
    }

    /// Emits `null` for empty values. Enabling it turns nil-pointer suppression off.
    #[must_use]
    pub fn with_null_if_empty(mut self, enable: bool) -> Self {
        self.null_if_empty = enable;
        if enable {
            self.ignore_nil_pointers = false;
        }
        self
    }

    /// Drops `None` struct fields entirely.
    ///
    /// Has no effect while `null_if_empty` is on: null-for-empty wins.
    #[must_use]
    pub fn with_ignore_nil_pointers(mut self, enable: bool) -> Self {
        self.ignore_nil_pointers = enable && !self.null_if_empty;
        self
    }

    /// Whether nil struct fields are dropped, after `null_if_empty` has had its
    /// say. Options built from a struct literal or loaded through serde may
    /// carry both flags set; this is the value the traversal honours.
    pub fn drops_nil_pointers(&self) -> bool {
        self.ignore_nil_pointers && !self.null_if_empty
    }

    /// Sets the recursion limit; `0` disables it.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Turns cycle detection off.
    #[must_use]
    pub fn with_disable_circular_check(mut self, disable: bool) -> Self {
        self.disable_circular_check = disable;
        self
    }

    /// Capacity used when a [`Marshaller`](crate::Marshaller) builds its own cache.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
