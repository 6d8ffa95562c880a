//! `Reflect` implementations for standard library and ecosystem types.
//!
//! Mapping rules:
//! 1. **Scalars** go straight to the engine's fast path.
//! 2. **`Option` / `OnceCell`** are inline optionals: `None` is nil, `Some` is
//!    dereferenced in place.
//! 3. **`Box` / `Rc` / `Arc` / `&T`** are pointers carrying the pointee address
//!    as identity.
//! 4. **Vectors and maps** carry the address of their buffer or object; inline
//!    arrays carry none.

use std::borrow::Cow;
use std::cell::{OnceCell, Ref, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone};
use serde_json::Value;

use crate::error::ReflectError;
use crate::reflect::{
    address_of, AsReflect, Complex, Kind, List, MapKey, MapRef, Mapping, Pointer, Reflect, Seq,
    Timestamp,
};

// --- SCALARS ---

macro_rules! impl_reflect_scalar {
    ($variant:ident as $repr:ty: $($t:ty),*) => {
        $(
            impl Reflect for $t {
                fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
                    Ok(Kind::$variant(<$repr>::from(*self)))
                }
            }
        )*
    }
}

impl_reflect_scalar!(Int as i64: i8, i16, i32, i64);
impl_reflect_scalar!(Uint as u64: u8, u16, u32, u64);
impl_reflect_scalar!(Float as f64: f32, f64);
impl_reflect_scalar!(Bool as bool: bool);

impl Reflect for isize {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        // isize is at most 64 bits on every supported target.
        Ok(Kind::Int(*self as i64))
    }
}

impl Reflect for usize {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Uint(*self as u64))
    }
}

// Wider integers only fit the JSON number model when they fit 64 bits; the
// encoder reports the rest as unsupported.
impl Reflect for i128 {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(match i64::try_from(*self) {
            Ok(v) => Kind::Int(v),
            Err(_) => Kind::encoded(self),
        })
    }
}

impl Reflect for u128 {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(match u64::try_from(*self) {
            Ok(v) => Kind::Uint(v),
            Err(_) => Kind::encoded(self),
        })
    }
}

impl Reflect for char {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Char(*self))
    }
}

impl Reflect for str {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Str(self))
    }
}

// `str` is unsized and cannot become a `&dyn Reflect`, so pointers to it are
// rendered directly. A pointer to a scalar is transparent either way.
macro_rules! impl_reflect_str_pointer {
    ($($ptr:ty),*) => {
        $(
            impl Reflect for $ptr {
                fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
                    Ok(Kind::Str(self))
                }
            }
        )*
    }
}

impl_reflect_str_pointer!(&str, Box<str>, Rc<str>, Arc<str>);

impl Reflect for String {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Str(self))
    }
}

impl Reflect for Cow<'_, str> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Str(self))
    }
}

impl Reflect for Complex {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Complex(*self))
    }
}

// --- OPTIONALS AND CELLS ---

impl<T: Reflect> Reflect for Option<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(match self {
            Some(v) => Kind::Optional(v),
            None => Kind::Nil,
        })
    }
}

impl<T: Reflect> Reflect for OnceCell<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(match self.get() {
            Some(v) => Kind::Optional(v),
            None => Kind::Nil,
        })
    }
}

impl<T: Reflect> Reflect for RefCell<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        let guard = self.try_borrow().map_err(|_| {
            ReflectError::new(format!(
                "RefCell<{}> is mutably borrowed",
                std::any::type_name::<T>()
            ))
        })?;
        Ok(Kind::Cell(Ref::map(guard, |v| v as &dyn Reflect)))
    }
}

// --- POINTERS ---

macro_rules! impl_reflect_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: AsReflect + ?Sized> Reflect for $ptr<T> {
                fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
                    Ok(Kind::Pointer(Pointer::to(&**self)))
                }
            }
        )*
    }
}

impl_reflect_pointer!(Box, Rc, Arc);

impl<T: AsReflect + ?Sized> Reflect for &T {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Pointer(Pointer::to(&**self)))
    }
}

// --- SEQUENCES ---

impl<T: Reflect> List for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

impl<T: Reflect> List for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

impl<T: Reflect, const N: usize> List for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

fn buffer_of<T>(items: &[T]) -> Option<usize> {
    if items.is_empty() {
        None
    } else {
        address_of(items)
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Seq(Seq::new(self, buffer_of(self))))
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        let (head, _) = self.as_slices();
        Ok(Kind::Seq(Seq::new(self, buffer_of(head))))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Seq(Seq::new(self, None)))
    }
}

// --- MAPS ---

impl MapKey for String {
    fn key_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl MapKey for &str {
    fn key_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl MapKey for Cow<'_, str> {
    fn key_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

macro_rules! impl_map_key_display {
    ($($t:ty),*) => {
        $(
            impl MapKey for $t {
                fn key_text(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    }
}

impl_map_key_display!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char
);

impl<K: MapKey, V: Reflect, S: BuildHasher> Mapping for HashMap<K, V, S> {
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Cow<'_, str>, &dyn Reflect)> + '_> {
        Box::new(self.iter().map(|(k, v)| (k.key_text(), v as &dyn Reflect)))
    }
}

impl<K: MapKey, V: Reflect> Mapping for BTreeMap<K, V> {
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Cow<'_, str>, &dyn Reflect)> + '_> {
        Box::new(self.iter().map(|(k, v)| (k.key_text(), v as &dyn Reflect)))
    }
}

impl<K: MapKey, V: Reflect, S: BuildHasher> Reflect for HashMap<K, V, S> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Map(MapRef::new(self)))
    }
}

impl<K: MapKey, V: Reflect> Reflect for BTreeMap<K, V> {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Map(MapRef::new(self)))
    }
}

// --- TIME ---

impl<Tz: TimeZone> Reflect for DateTime<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Time(Timestamp {
            text: self.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            zero: self.timestamp() == 0 && self.timestamp_subsec_nanos() == 0,
        }))
    }
}

impl Reflect for NaiveDateTime {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::Time(Timestamp {
            text: self.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            zero: *self == NaiveDateTime::default(),
        }))
    }
}

// --- PASS-THROUGH ---

impl Reflect for Value {
    fn reflect(&self) -> Result<Kind<'_>, ReflectError> {
        Ok(Kind::encoded(self))
    }
}
