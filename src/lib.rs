//! # jsongroup
//!
//! Group-filtered conversion of Rust values into JSON.
//!
//! ## Overview
//!
//! Fields are tagged with the groups they belong to. A caller asks for a set of
//! groups and gets back a JSON document holding only the matching fields, so the
//! same struct can render a public view, an admin view and an internal view
//! without hand-written DTOs.
//!
//! ```rust
//! use jsongroup::{marshal, GroupObject};
//!
//! #[derive(GroupObject)]
//! struct User {
//!     #[jsongroup(json = "id", groups = "public,admin")]
//!     pub id: u64,
//!     #[jsongroup(json = "email", groups = "admin")]
//!     pub email: String,
//! }
//!
//! let u = User { id: 1, email: "a@b.c".into() };
//! assert_eq!(marshal(&u, &["public"]).unwrap(), br#"{"id":1}"#);
//! assert_eq!(marshal(&u, &[]).unwrap(), br#"{"email":"a@b.c","id":1}"#);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! value --Reflect--> Traversal Engine --IR (serde_json::Value)--> encoder --> bytes
//!                        |
//!                        +--> Field Cache --miss--> Resolver --> FieldInfo table
//! ```
//!
//! ### Reflection
//!
//! Rust has no runtime field introspection. Every traversable value implements
//! [`Reflect`], describing itself as a [`Kind`]. `#[derive(GroupObject)]`
//! implements it for structs together with a static descriptor table
//! ([`rt::StructShape`]); the standard containers, scalars, `chrono` instants
//! and `serde_json::Value` are covered by the crate.
//!
//! ### Resolver and cache
//!
//! The [`resolver`] parses the `json` and group tags of a shape into an immutable
//! [`FieldInfo`] table, flattening embedded members. The [`FieldCache`] memoizes
//! the tables per type with LRU eviction; a process-wide instance backs the free
//! functions, and [`Marshaller`] can carry its own.
//!
//! ### Traversal
//!
//! The engine walks the value once per call. It enforces [`Options::max_depth`]
//! and rejects values that reach the same pointer, sequence or mapping twice,
//! so self-referencing graphs fail with [`JsonGroupError::CircularReference`]
//! instead of overflowing the stack.
//!
//! ## Field tags
//!
//! | Attribute                           | Effect                                        |
//! |-------------------------------------|-----------------------------------------------|
//! | `json = "name"`                     | output key (`-` excludes the field)           |
//! | `json = "name,omitempty"`           | skip zero scalars, nil and empty containers   |
//! | `json = "name,omitzero"`            | skip zero scalars, nil and zero instants      |
//! | `groups = "a,b"`                    | groups the field belongs to                   |
//! | `<any key> = "..."`                 | read by [`Options::with_tag_key`]             |
//! | `embed`                             | flatten the member's fields into the parent   |
//!
//! Only `pub` fields are emitted.
//!
//! ### Safety and Error Handling
//!
//! * **No unsafe code** (`#![deny(unsafe_code)]`).
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`JsonGroupError`] variant
//!   carrying the path of the offending value.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

// Lets the derive macro's `::jsongroup::` paths resolve inside this crate's own tests.
extern crate self as jsongroup;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod cache;
pub mod error;
pub mod filter;
pub mod inspector;
pub mod options;
pub mod reflect;
pub mod resolver;

// --- INTERNAL IMPLEMENTATION MODULES ---
mod engine;

// Private modules
mod reflect_impls;

// --- MACRO SUPPORT MODULES ---

/// Runtime types used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{
    cache_stats, clear_cache, marshal, marshal_to_map, marshal_to_map_with_options,
    marshal_to_writer, marshal_with_options, set_cache_capacity, to_value, Marshaller, VALUE_KEY,
};
pub use cache::{CacheStats, FieldCache};
pub use error::{ErrorKind, JsonGroupError, ReflectError, Result};
pub use inspector::{Inspector, TypeReport};
pub use options::{GroupMode, Options, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_DEPTH, DEFAULT_TAG_KEY};
pub use reflect::{
    AsReflect, Complex, Identity, Kind, List, MapKey, MapRef, Mapping, Opaque, Pointer, Reflect,
    Seq, Struct, Timestamp,
};
pub use resolver::FieldInfo;

// Re-export the derive macro so it is accessible as `jsongroup::GroupObject`
pub use jsongroup_derive::GroupObject;
