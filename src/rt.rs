// src/rt.rs

//! Runtime types used by the generated code (`#[derive(GroupObject)]`).
//!
//! The derive macro emits a [`StructShape`] per struct: the declared fields in
//! order, their visibility and their raw `#[jsongroup(...)]` tag pairs. The
//! resolver turns a shape into the cached `FieldInfo` table.
//! Hand-written [`Struct`](crate::Struct) implementations build the same values.

/// Raw declaration of one struct field.
#[derive(Debug, Clone)]
pub struct RawField {
    /// Rust identifier of the field.
    pub name: &'static str,
    /// Declaration position; the value passed to [`Struct::field`](crate::Struct::field).
    pub index: usize,
    /// Whether the field is `pub`. Other fields are invisible to the resolver.
    pub exported: bool,
    /// Tag pairs as written, e.g. `[("json", "id,omitempty"), ("groups", "public")]`.
    pub tags: &'static [(&'static str, &'static str)],
    /// Whether the field is an embedded member.
    pub anonymous: bool,
    /// Shape of the embedded type, when known statically. Embedded members
    /// with a shape are flattened by the resolver; without one they are
    /// merged at value time.
    pub embedded: Option<fn() -> StructShape>,
}

impl RawField {
    /// Value of tag `key`, if the field declares it.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

/// Raw declaration of a struct.
#[derive(Debug, Clone)]
pub struct StructShape {
    /// Fully qualified type name; the cache key.
    pub type_name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<RawField>,
}

/// Static access to a struct's shape, needed to flatten embedded members
/// without a value at hand.
pub trait Described {
    /// Returns the shape of `Self`.
    fn describe() -> StructShape;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lookup() {
        let f = RawField {
            name: "id",
            index: 0,
            exported: true,
            tags: &[("json", "id,omitempty"), ("groups", "public")],
            anonymous: false,
            embedded: None,
        };
        assert_eq!(f.tag("json"), Some("id,omitempty"));
        assert_eq!(f.tag("groups"), Some("public"));
        assert_eq!(f.tag("roles"), None);
    }
}
