//! Defines the `Reflect` trait and the value shapes the traversal engine walks.
//!
//! Rust has no runtime field introspection, so every traversable value
//! describes itself through [`Reflect::reflect`], returning a [`Kind`]: a
//! borrowed, shape-level view of the value. Structs get their implementation
//! from `#[derive(GroupObject)]`; the standard containers, scalars and a few
//! ecosystem types are covered in `reflect_impls`.

use std::borrow::Cow;
use std::cell::Ref;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ReflectError;
use crate::rt::StructShape;

/// A value that can be converted by the traversal engine.
///
/// Implementations must be cheap: the engine may call `reflect` more than
/// once for the same value during a single conversion.
pub trait Reflect {
    /// Returns the shape of this value.
    fn reflect(&self) -> Result<Kind<'_>, ReflectError>;
}

/// Upcast helper so smart pointers can hold `dyn Reflect` pointees and still
/// hand a `&dyn Reflect` to the engine.
pub trait AsReflect {
    /// Returns `self` as a trait object.
    fn as_reflect(&self) -> &dyn Reflect;
}

impl<T: Reflect> AsReflect for T {
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }
}

impl AsReflect for dyn Reflect + '_ {
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }
}

impl AsReflect for dyn Reflect + Send + Sync + '_ {
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }
}

/// Shape-level view of a value.
pub enum Kind<'a> {
    /// `true` / `false`.
    Bool(bool),
    /// Any signed integer.
    Int(i64),
    /// Any unsigned integer.
    Uint(u64),
    /// Any float. NaN and infinities are emitted as strings.
    Float(f64),
    /// A complex number, emitted as its formatted string.
    Complex(Complex),
    /// A single character, emitted as a one-character string.
    Char(char),
    /// Text.
    Str(&'a str),
    /// An absent value (`None`, an unset cell). Subject to nil-pointer suppression.
    Nil,
    /// A present optional value stored inline. Dereferenced without a depth
    /// step or identity check.
    Optional(&'a dyn Reflect),
    /// A heap indirection (`Box`, `Rc`, `Arc`, `&T`).
    Pointer(Pointer<'a>),
    /// A borrowed interior-mutable cell. Transparent to the engine.
    Cell(Ref<'a, dyn Reflect + 'a>),
    /// An ordered collection.
    Seq(Seq<'a>),
    /// An associative collection.
    Map(MapRef<'a>),
    /// A struct with a descriptor table.
    Struct(&'a dyn Struct),
    /// A point in time.
    Time(Timestamp),
    /// A value handed to the JSON encoder as-is.
    Opaque(Encoded),
}

impl<'a> Kind<'a> {
    /// Encodes `value` through `serde_json` and wraps the outcome as an opaque
    /// pass-through. Encoder failures surface later as unsupported-type errors.
    pub fn encoded<T: Serialize + ?Sized>(value: &T) -> Self {
        Kind::Opaque(Encoded {
            type_name: std::any::type_name::<T>(),
            result: serde_json::to_value(value),
        })
    }

    /// Short name of the shape, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Bool(_) => "bool",
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Float(_) => "float",
            Kind::Complex(_) => "complex",
            Kind::Char(_) => "char",
            Kind::Str(_) => "string",
            Kind::Nil => "nil",
            Kind::Optional(_) => "optional",
            Kind::Pointer(_) => "pointer",
            Kind::Cell(_) => "cell",
            Kind::Seq(_) => "sequence",
            Kind::Map(_) => "map",
            Kind::Struct(_) => "struct",
            Kind::Time(_) => "time",
            Kind::Opaque(_) => "opaque",
        }
    }

    /// Whether the engine handles this shape without entering a depth level.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Kind::Bool(_)
                | Kind::Int(_)
                | Kind::Uint(_)
                | Kind::Float(_)
                | Kind::Complex(_)
                | Kind::Char(_)
                | Kind::Str(_)
        )
    }
}

impl fmt::Debug for Kind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Bool(b) => write!(f, "Bool({b})"),
            Kind::Int(i) => write!(f, "Int({i})"),
            Kind::Uint(u) => write!(f, "Uint({u})"),
            Kind::Float(x) => write!(f, "Float({x})"),
            Kind::Complex(c) => write!(f, "Complex({c})"),
            Kind::Char(c) => write!(f, "Char({c:?})"),
            Kind::Str(s) => write!(f, "Str({s:?})"),
            Kind::Seq(s) => write!(f, "Seq(len={})", s.len()),
            Kind::Map(m) => write!(f, "Map(len={})", m.len()),
            Kind::Struct(s) => write!(f, "Struct({})", s.type_name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Address identity of a reference-like value, tagged with its shape so that a
/// container living at offset 0 of a boxed struct never aliases the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Address of a pointee.
    Pointer(usize),
    /// Address of a sequence's element buffer.
    Seq(usize),
    /// Address of a map object.
    Map(usize),
}

/// Address of `value`, or `None` for zero-sized values (they share dangling
/// addresses and cannot participate in a cycle).
pub fn address_of<T: ?Sized>(value: &T) -> Option<usize> {
    if std::mem::size_of_val(value) == 0 {
        None
    } else {
        Some(value as *const T as *const () as usize)
    }
}

/// A heap indirection and its target.
pub struct Pointer<'a> {
    identity: Option<Identity>,
    target: &'a dyn Reflect,
}

impl<'a> Pointer<'a> {
    /// Points at `target`, using its address as identity.
    pub fn to<T: AsReflect + ?Sized>(target: &'a T) -> Self {
        Self {
            identity: address_of(target).map(Identity::Pointer),
            target: target.as_reflect(),
        }
    }

    /// Identity used for cycle detection.
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// The pointee.
    pub fn target(&self) -> &'a dyn Reflect {
        self.target
    }
}

/// Random access to the items of a sequence.
pub trait List {
    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the list has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`.
    fn item(&self, index: usize) -> Option<&dyn Reflect>;
}

/// An ordered collection and its identity.
pub struct Seq<'a> {
    identity: Option<Identity>,
    items: &'a dyn List,
}

impl<'a> Seq<'a> {
    /// A sequence whose elements live at `buffer` (`None` for inline arrays).
    pub fn new(items: &'a dyn List, buffer: Option<usize>) -> Self {
        Self {
            identity: buffer.map(Identity::Seq),
            items,
        }
    }

    /// Identity used for cycle detection.
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    pub fn item(&self, index: usize) -> Option<&'a dyn Reflect> {
        self.items.item(index)
    }
}

/// Textual rendering of a map key.
pub trait MapKey {
    /// Key as it appears in the JSON object and in error paths.
    fn key_text(&self) -> Cow<'_, str>;
}

/// Iteration over the entries of a map.
pub trait Mapping {
    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the map has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries with their rendered keys, in the map's own iteration order.
    fn entries(&self) -> Box<dyn Iterator<Item = (Cow<'_, str>, &dyn Reflect)> + '_>;
}

/// An associative collection and its identity.
pub struct MapRef<'a> {
    identity: Option<Identity>,
    entries: &'a dyn Mapping,
}

impl<'a> MapRef<'a> {
    /// Wraps a map, using its own address as identity.
    pub fn new<M: Mapping>(map: &'a M) -> Self {
        Self {
            identity: address_of(map).map(Identity::Map),
            entries: map,
        }
    }

    /// Identity used for cycle detection.
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with rendered keys.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (Cow<'a, str>, &'a dyn Reflect)> + 'a> {
        self.entries.entries()
    }
}

/// A struct exposing its declared fields by index.
///
/// Implemented by `#[derive(GroupObject)]`. Hand-written implementations must
/// keep `field(i)` consistent with the `index` of every field in `shape()`.
pub trait Struct {
    /// Cache key for the type, normally `std::any::type_name::<Self>()`.
    ///
    /// The field cache trusts this name as the type's identity, and
    /// `type_name` output is not guaranteed unique across types. Hand-written
    /// implementations must return a name no other `Struct` type uses, or the
    /// two types will be served the same field table.
    fn type_name(&self) -> &'static str;

    /// Raw declaration of the type's fields.
    fn shape(&self) -> StructShape;

    /// The field declared at position `index`.
    fn field(&self, index: usize) -> Option<&dyn Reflect>;
}

/// Complex number. Emitted as its formatted string, e.g. `(1.5+2i)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex {
    /// Builds `re + im·i`.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}{:+}i)", self.re, self.im)
    }
}

/// A rendered instant plus whether it is the type's zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// RFC 3339 rendering.
    pub text: String,
    /// Whether the instant equals the type's `Default`.
    pub zero: bool,
}

/// Outcome of encoding an opaque value through `serde_json`.
#[derive(Debug)]
pub struct Encoded {
    pub(crate) type_name: &'static str,
    pub(crate) result: serde_json::Result<Value>,
}

impl Encoded {
    /// Rust type name of the encoded value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Wrapper passing any `Serialize` value through to the encoder untouched.
///
/// ```rust
/// use jsongroup::{marshal, Opaque};
///
/// let raw = Opaque(vec![("a", 1)]);
/// assert_eq!(marshal(&raw, &[]).unwrap(), br#"[["a",1]]"#);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Opaque<T>(pub T);

impl<T: Serialize> Reflect for Opaque<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::encoded(&self.0))
    }
}
