//! Centralized error handling for jsongroup.
//!
//! Every public entry point returns either a complete result or exactly one
//! [`JsonGroupError`]. Faults raised while reflecting a value, resolving a
//! struct's field table or running the JSON encoder are all translated into
//! this closed set of variants before they reach the caller.
//!
//! ## Error Categories
//!
//! - **Depth exceeded** ([`JsonGroupError::DepthExceeded`]): the traversal went
//!   deeper than [`Options::max_depth`](crate::Options).
//! - **Circular reference** ([`JsonGroupError::CircularReference`]): a pointer,
//!   sequence or mapping was reached twice within one call.
//! - **Unsupported type** ([`JsonGroupError::UnsupportedType`]): the encoder
//!   could not represent a pass-through value.
//! - **Reflection** ([`JsonGroupError::Reflection`]): a value or type could not
//!   be inspected (a `RefCell` already mutably borrowed, a malformed shape).
//! - **Cache overflow** ([`JsonGroupError::CacheOverflow`]): the field cache
//!   found its index and eviction order out of sync. This is a bug report,
//!   not caller misuse.
//! - **Unknown** ([`JsonGroupError::Unknown`]): anything else, with the raw cause.
//!
//! ## Matching on the kind
//!
//! ```rust
//! use jsongroup::{marshal, ErrorKind, GroupObject};
//!
//! #[derive(GroupObject)]
//! struct Account {
//!     #[jsongroup(json = "id", groups = "public")]
//!     pub id: u64,
//! }
//!
//! match marshal(&Account { id: 7 }, &["public"]) {
//!     Ok(bytes) => assert_eq!(bytes, br#"{"id":7}"#),
//!     Err(e) if e.kind() == ErrorKind::CircularReference => eprintln!("cycle at {}", e.path()),
//!     Err(e) => eprintln!("failed: {e}"),
//! }
//! ```

use std::fmt;
use std::sync::Arc;

/// A specialized `Result` type for jsongroup operations.
pub type Result<T> = std::result::Result<T, JsonGroupError>;

/// Shared, cloneable error cause.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant of a [`JsonGroupError`], convenient for assertions and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Recursion went past the configured maximum depth.
    DepthExceeded,
    /// A reference was revisited within the same call.
    CircularReference,
    /// A value could not be represented in JSON.
    UnsupportedType,
    /// A value or type could not be inspected.
    Reflection,
    /// The field cache is internally inconsistent.
    CacheOverflow,
    /// Catch-all.
    Unknown,
}

/// Failure raised by a [`Reflect`](crate::Reflect) implementation or by the
/// resolver while inspecting a shape.
///
/// It carries no path: the traversal engine attaches the path when it wraps
/// the failure into [`JsonGroupError::Reflection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectError {
    message: String,
}

impl ReflectError {
    /// Creates a reflection failure with a human readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason given when the failure was raised.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReflectError {}

/// The master error enum covering every failure a conversion can surface.
///
/// Every variant carries the dotted/bracketed path of the value being
/// processed when the failure happened (`""` is the root), except
/// [`CacheOverflow`](JsonGroupError::CacheOverflow), which is not tied to a value.
#[derive(Debug, Clone)]
pub enum JsonGroupError {
    /// Recursion exceeded [`Options::max_depth`](crate::Options).
    DepthExceeded {
        /// Where the limit was hit.
        path: String,
        /// The configured limit.
        max_depth: usize,
    },

    /// A pointer, sequence or mapping identity was visited twice in one call.
    CircularReference {
        /// Path of the second visit.
        path: String,
        /// Path where the same identity was first recorded.
        first_seen: String,
    },

    /// The encoder could not represent a value.
    UnsupportedType {
        /// Where the value was found.
        path: String,
        /// Rust type name of the offending value.
        type_name: String,
        /// What the encoder reported, when available.
        cause: Option<Cause>,
    },

    /// Inspecting a value or type failed.
    Reflection {
        /// Where the inspection failed.
        path: String,
        /// The underlying failure.
        cause: ReflectError,
    },

    /// The field cache found its hash index and LRU order out of sync.
    CacheOverflow {
        /// Capacity in effect when the inconsistency was detected.
        capacity: usize,
        /// Which invariant broke.
        detail: String,
    },

    /// Internal fault that does not map to any other variant.
    Unknown {
        /// Where the fault happened.
        path: String,
        /// Short description.
        message: String,
        /// Raw cause, when available.
        cause: Option<Cause>,
    },
}

impl JsonGroupError {
    /// Returns the discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::CircularReference { .. } => ErrorKind::CircularReference,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::Reflection { .. } => ErrorKind::Reflection,
            Self::CacheOverflow { .. } => ErrorKind::CacheOverflow,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Path of the value being processed when the error happened.
    ///
    /// Empty for the root value and for cache errors.
    pub fn path(&self) -> &str {
        match self {
            Self::DepthExceeded { path, .. }
            | Self::CircularReference { path, .. }
            | Self::UnsupportedType { path, .. }
            | Self::Reflection { path, .. }
            | Self::Unknown { path, .. } => path,
            Self::CacheOverflow { .. } => "",
        }
    }

    pub(crate) fn reflection(path: &str, cause: ReflectError) -> Self {
        Self::Reflection {
            path: path.to_owned(),
            cause,
        }
    }

    /// Translates a `serde_json` failure raised while encoding the value at `path`.
    ///
    /// I/O failures become [`Unknown`](Self::Unknown). Every other category
    /// means the encoder refused the value itself (a map with non-string keys,
    /// a failing `Serialize` impl) and becomes [`UnsupportedType`](Self::UnsupportedType).
    pub fn from_encoder(err: serde_json::Error, path: &str, type_name: &str) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Io => Self::Unknown {
                path: path.to_owned(),
                message: "encoder failure".to_owned(),
                cause: Some(Arc::new(err)),
            },
            Category::Data | Category::Syntax | Category::Eof => Self::UnsupportedType {
                path: path.to_owned(),
                type_name: type_name.to_owned(),
                cause: Some(Arc::new(err)),
            },
        }
    }

    /// Fills in `path` on errors raised without one (resolver failures).
    pub(crate) fn at(mut self, at: &str) -> Self {
        match &mut self {
            Self::DepthExceeded { path, .. }
            | Self::CircularReference { path, .. }
            | Self::UnsupportedType { path, .. }
            | Self::Reflection { path, .. }
            | Self::Unknown { path, .. }
                if path.is_empty() =>
            {
                at.clone_into(path);
            }
            _ => {}
        }
        self
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, path: &str) -> fmt::Result {
    if path.is_empty() {
        Ok(())
    } else {
        write!(f, " at path '{path}'")
    }
}

impl fmt::Display for JsonGroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded { path, max_depth } => {
                write!(f, "maximum depth of {max_depth} exceeded")?;
                write_path(f, path)
            }
            Self::CircularReference { path, first_seen } => {
                f.write_str("circular reference detected")?;
                write_path(f, path)?;
                if first_seen.is_empty() {
                    f.write_str(" (first seen at root)")
                } else {
                    write!(f, " (first seen at '{first_seen}')")
                }
            }
            Self::UnsupportedType {
                path,
                type_name,
                cause,
            } => {
                write!(f, "unsupported type: {type_name}")?;
                write_path(f, path)?;
                match cause {
                    Some(c) => write!(f, ": {c}"),
                    None => Ok(()),
                }
            }
            Self::Reflection { path, cause } => {
                f.write_str("reflection error")?;
                write_path(f, path)?;
                write!(f, ": {cause}")
            }
            Self::CacheOverflow { capacity, detail } => {
                write!(f, "field cache inconsistent (capacity {capacity}): {detail}")
            }
            Self::Unknown {
                path,
                message,
                cause,
            } => {
                f.write_str(message)?;
                write_path(f, path)?;
                match cause {
                    Some(c) => write!(f, ": {c}"),
                    None => Ok(()),
                }
            }
        }
    }
}

impl std::error::Error for JsonGroupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reflection { cause, .. } => Some(cause),
            Self::UnsupportedType {
                cause: Some(c), ..
            }
            | Self::Unknown {
                cause: Some(c), ..
            } => Some(c.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JsonGroupError {
    fn from(err: std::io::Error) -> Self {
        Self::Unknown {
            path: String::new(),
            message: "I/O error".to_owned(),
            cause: Some(Arc::new(err)),
        }
    }
}
