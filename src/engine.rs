//! Traversal engine: walks a [`Reflect`] value and builds the JSON tree.
//!
//! One [`SerializeContext`] is created per top-level call. It owns the current
//! path, the depth counter and the visited-identity map; none of them outlive
//! the call or are shared between calls. The only shared state touched here is
//! the [`FieldCache`].
//!
//! Shape handling, in evaluation order:
//!
//! 1. Scalars are converted directly (no depth step, no identity).
//! 2. Nil values become a drop signal or `null`, per the nil-pointer policy.
//! 3. Optionals and cells are looked through in place.
//! 4. Everything else enters a depth level. An empty sequence or mapping that
//!    would exceed the limit yields its empty value instead of an error.
//! 5. Pointers, sequences and mappings are checked against the visited map.
//! 6. The shape is converted: structs field by field, containers item by item.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::cache::FieldCache;
use crate::error::{JsonGroupError, ReflectError, Result};
use crate::filter::include;
use crate::options::Options;
use crate::reflect::{Identity, Kind, MapRef, Reflect, Seq, Struct};
use crate::resolver::FieldInfo;

/// Result of converting one value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// The value converts to this JSON value (possibly `null`).
    Emit(Value),
    /// The value is a suppressed nil; the enclosing key or item is left out.
    Drop,
}

enum Segment<'s> {
    Field(&'s str),
    Key(&'s str),
    Index(usize),
}

/// Per-call traversal state.
pub(crate) struct SerializeContext<'c> {
    options: &'c Options,
    cache: &'c FieldCache,
    groups: &'c [&'c str],
    ignore_nil: bool,
    path: String,
    depth: usize,
    visited: HashMap<Identity, String>,
}

impl<'c> SerializeContext<'c> {
    pub(crate) fn new(options: &'c Options, cache: &'c FieldCache, groups: &'c [&'c str]) -> Self {
        Self {
            options,
            cache,
            groups,
            ignore_nil: options.drops_nil_pointers(),
            path: String::new(),
            depth: 0,
            visited: HashMap::new(),
        }
    }

    /// Converts `value` at the current path.
    pub(crate) fn to_ir(&mut self, value: &dyn Reflect) -> Result<Outcome> {
        let kind = self.reflect(value)?;
        self.kind(kind)
    }

    fn reflect<'v>(&self, value: &'v dyn Reflect) -> Result<Kind<'v>> {
        value
            .reflect()
            .map_err(|cause| JsonGroupError::reflection(&self.path, cause))
    }

    fn scoped<R>(
        &mut self,
        segment: Segment<'_>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let mark = self.path.len();
        match segment {
            Segment::Field(name) | Segment::Key(name) => {
                if !self.path.is_empty() {
                    self.path.push('.');
                }
                self.path.push_str(name);
            }
            Segment::Index(i) => {
                self.path.push('[');
                self.path.push_str(&i.to_string());
                self.path.push(']');
            }
        }
        let out = f(self);
        self.path.truncate(mark);
        out
    }

    /// Enters one depth level around `f`. `empty` is the value to return
    /// instead of failing when the limit is hit on an empty container.
    fn level(
        &mut self,
        empty: Option<Value>,
        f: impl FnOnce(&mut Self) -> Result<Outcome>,
    ) -> Result<Outcome> {
        let max_depth = self.options.max_depth;
        if max_depth > 0 && self.depth >= max_depth {
            return match empty {
                Some(value) => Ok(Outcome::Emit(value)),
                None => Err(JsonGroupError::DepthExceeded {
                    path: self.path.clone(),
                    max_depth,
                }),
            };
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn check_identity(&mut self, identity: Option<Identity>) -> Result<()> {
        if self.options.disable_circular_check {
            return Ok(());
        }
        let Some(identity) = identity else {
            return Ok(());
        };
        if let Some(first_seen) = self.visited.get(&identity) {
            return Err(JsonGroupError::CircularReference {
                path: self.path.clone(),
                first_seen: first_seen.clone(),
            });
        }
        self.visited.insert(identity, self.path.clone());
        Ok(())
    }

    fn empty_seq(&self) -> Value {
        if self.options.null_if_empty {
            Value::Null
        } else {
            Value::Array(Vec::new())
        }
    }

    fn empty_map(&self) -> Value {
        if self.options.null_if_empty {
            Value::Null
        } else {
            Value::Object(Map::new())
        }
    }

    fn kind(&mut self, kind: Kind<'_>) -> Result<Outcome> {
        let emit = |v: Value| -> Result<Outcome> { Ok(Outcome::Emit(v)) };
        match kind {
            // --- SCALARS ---
            Kind::Bool(b) => emit(Value::Bool(b)),
            Kind::Int(i) => emit(Value::from(i)),
            Kind::Uint(u) => emit(Value::from(u)),
            Kind::Float(f) => emit(float(f)),
            Kind::Complex(c) => emit(Value::String(c.to_string())),
            Kind::Char(c) => emit(Value::String(c.to_string())),
            Kind::Str(s) if s.is_empty() && self.options.null_if_empty => emit(Value::Null),
            Kind::Str(s) => emit(Value::String(s.to_owned())),

            // --- NIL AND INLINE INDIRECTIONS ---
            Kind::Nil if self.ignore_nil => Ok(Outcome::Drop),
            Kind::Nil => emit(Value::Null),
            Kind::Optional(inner) => self.to_ir(inner),
            Kind::Cell(inner) => self.to_ir(&*inner),

            // --- NESTED ---
            Kind::Pointer(pointer) => {
                let target = self.reflect(pointer.target())?;
                if target.is_scalar() {
                    return self.kind(target);
                }
                self.level(None, |ctx| {
                    ctx.check_identity(pointer.identity())?;
                    ctx.kind(target)
                })
            }
            Kind::Seq(seq) => {
                let empty = seq.is_empty().then(|| self.empty_seq());
                self.level(empty, |ctx| ctx.seq(seq))
            }
            Kind::Map(map) => {
                let empty = map.is_empty().then(|| self.empty_map());
                self.level(empty, |ctx| ctx.map(map))
            }
            Kind::Struct(s) => self.level(None, |ctx| {
                ctx.struct_fields(s).map(|m| Outcome::Emit(Value::Object(m)))
            }),
            Kind::Time(ts) => self.level(None, |ctx| {
                if ts.zero && ctx.options.null_if_empty {
                    emit(Value::Null)
                } else {
                    emit(Value::String(ts.text))
                }
            }),
            Kind::Opaque(encoded) => self.level(None, |ctx| match encoded.result {
                Ok(value) => emit(value),
                Err(err) => Err(JsonGroupError::from_encoder(err, &ctx.path, encoded.type_name)),
            }),
        }
    }

    fn seq(&mut self, seq: Seq<'_>) -> Result<Outcome> {
        if seq.is_empty() {
            return Ok(Outcome::Emit(self.empty_seq()));
        }
        self.check_identity(seq.identity())?;

        let mut items = Vec::with_capacity(seq.len());
        for i in 0..seq.len() {
            let Some(item) = seq.item(i) else {
                return Err(JsonGroupError::reflection(
                    &self.path,
                    ReflectError::new(format!("sequence item {i} vanished during traversal")),
                ));
            };
            match self.scoped(Segment::Index(i), |ctx| ctx.to_ir(item))? {
                Outcome::Drop => {}
                Outcome::Emit(Value::Null) if !self.options.null_if_empty => {}
                Outcome::Emit(value) => items.push(value),
            }
        }
        Ok(Outcome::Emit(Value::Array(items)))
    }

    fn map(&mut self, map: MapRef<'_>) -> Result<Outcome> {
        if map.is_empty() {
            return Ok(Outcome::Emit(self.empty_map()));
        }
        self.check_identity(map.identity())?;

        let mut out = Map::new();
        for (key, value) in map.entries() {
            match self.scoped(Segment::Key(&key), |ctx| ctx.to_ir(value))? {
                Outcome::Drop => {}
                Outcome::Emit(Value::Null) if !self.options.null_if_empty => {}
                Outcome::Emit(v) => {
                    out.insert(key.into_owned(), v);
                }
            }
        }
        Ok(Outcome::Emit(Value::Object(out)))
    }

    fn struct_fields(&mut self, target: &dyn Struct) -> Result<Map<String, Value>> {
        let fields = self
            .cache
            .fields(target, &self.options.tag_key)
            .map_err(|e| e.at(&self.path))?;

        let mut out = Map::new();
        for field in fields.iter() {
            if !include(&field.groups, self.groups, self.options.group_mode) {
                continue;
            }
            let value = self.field_value(target, field)?;
            self.scoped(Segment::Field(&field.name), |ctx| {
                ctx.emit_field(field, value, &mut out)
            })?;
        }
        Ok(out)
    }

    fn emit_field(
        &mut self,
        field: &FieldInfo,
        value: &dyn Reflect,
        out: &mut Map<String, Value>,
    ) -> Result<()> {
        let kind = self.reflect(value)?;
        let null_if_empty = self.options.null_if_empty;

        // Embedded members without a static shape are merged by key.
        if field.anonymous {
            if let Kind::Struct(inner) = kind {
                let merged = self.struct_fields(inner)?;
                out.extend(merged);
                return Ok(());
            }
        }

        let nil = is_nil(&kind);
        if nil && self.ignore_nil {
            return Ok(());
        }

        let empty = nil || is_empty(&kind);
        let zero = is_zero(&kind);
        if (field.omit_empty && empty && !null_if_empty) || (field.omit_zero && zero && !null_if_empty)
        {
            return Ok(());
        }
        if empty && null_if_empty {
            out.insert(field.key.clone(), Value::Null);
            return Ok(());
        }

        match self.kind(kind)? {
            Outcome::Drop => {}
            Outcome::Emit(Value::Null) if !null_if_empty => {}
            Outcome::Emit(v) => {
                out.insert(field.key.clone(), v);
            }
        }
        Ok(())
    }

    /// Follows `field.index` from `target` down through embedded members.
    fn field_value<'s>(&self, target: &'s dyn Struct, field: &FieldInfo) -> Result<&'s dyn Reflect> {
        let missing = |at: usize, owner: &dyn Struct| {
            JsonGroupError::reflection(
                &self.path,
                ReflectError::new(format!(
                    "{} has no field at index {at} (resolving {})",
                    owner.type_name(),
                    field.name
                )),
            )
        };

        let Some((last, parents)) = field.index.split_last() else {
            return Err(missing(0, target));
        };
        let mut owner = target;
        for &i in parents {
            let member = owner.field(i).ok_or_else(|| missing(i, owner))?;
            match self.reflect(member)? {
                Kind::Struct(inner) => owner = inner,
                other => {
                    return Err(JsonGroupError::reflection(
                        &self.path,
                        ReflectError::new(format!(
                            "embedded member {} of {} is a {}, not a struct",
                            field.name,
                            owner.type_name(),
                            other.name()
                        )),
                    ))
                }
            }
        }
        owner.field(*last).ok_or_else(|| missing(*last, owner))
    }
}

/// Finite floats become numbers; NaN and the infinities become strings.
fn float(f: f64) -> Value {
    if f.is_nan() {
        Value::String("NaN".to_owned())
    } else if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        Value::String(text.to_owned())
    } else {
        Value::from(f)
    }
}

fn through_cell(kind: &Kind<'_>, predicate: fn(&Kind<'_>) -> bool) -> Option<bool> {
    match kind {
        Kind::Cell(inner) => Some(inner.reflect().map(|k| predicate(&k)).unwrap_or(false)),
        _ => None,
    }
}

/// Absent value.
pub(crate) fn is_nil(kind: &Kind<'_>) -> bool {
    through_cell(kind, is_nil).unwrap_or(matches!(kind, Kind::Nil))
}

/// `omitempty` predicate: zero scalars, nil, and zero-length strings or containers.
pub(crate) fn is_empty(kind: &Kind<'_>) -> bool {
    if let Some(empty) = through_cell(kind, is_empty) {
        return empty;
    }
    match kind {
        Kind::Seq(seq) => seq.is_empty(),
        Kind::Map(map) => map.is_empty(),
        Kind::Str(s) => s.is_empty(),
        Kind::Bool(b) => !b,
        Kind::Int(i) => *i == 0,
        Kind::Uint(u) => *u == 0,
        Kind::Float(f) => *f == 0.0,
        Kind::Char(c) => *c == '\0',
        Kind::Nil => true,
        _ => false,
    }
}

/// `omitzero` predicate: like [`is_empty`] but containers are never zero,
/// and zero instants are.
pub(crate) fn is_zero(kind: &Kind<'_>) -> bool {
    if let Some(zero) = through_cell(kind, is_zero) {
        return zero;
    }
    match kind {
        Kind::Str(s) => s.is_empty(),
        Kind::Bool(b) => !b,
        Kind::Int(i) => *i == 0,
        Kind::Uint(u) => *u == 0,
        Kind::Float(f) => *f == 0.0,
        Kind::Char(c) => *c == '\0',
        Kind::Nil => true,
        Kind::Time(ts) => ts.zero,
        _ => false,
    }
}
