//! Turns a struct's raw declaration into its resolved field table.

use serde::Serialize;

use crate::error::ReflectError;
use crate::rt::StructShape;

/// Resolved metadata for one emitted field. Immutable once built and shared
/// through the field cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// Declaration positions from the outer struct down through embedded members.
    pub index: Vec<usize>,
    /// Declared name, prefixed with the embedding members' names for
    /// flattened fields (`Base.created_at`). Diagnostics only.
    pub name: String,
    /// Key in the output object.
    pub key: String,
    /// Groups the field belongs to.
    pub groups: Vec<String>,
    /// `omitempty` was declared.
    pub omit_empty: bool,
    /// `omitzero` was declared.
    pub omit_zero: bool,
    /// The field is an embedded member merged at value time.
    pub anonymous: bool,
}

/// Resolves `shape` into its field table, reading group lists from `tag_key`.
///
/// Non-exported fields and fields whose JSON name is `-` are skipped. Embedded
/// members with a static shape are flattened in place.
pub fn resolve(shape: &StructShape, tag_key: &str) -> Result<Vec<FieldInfo>, ReflectError> {
    let mut stack = Vec::new();
    resolve_nested(shape, tag_key, &mut stack)
}

fn resolve_nested(
    shape: &StructShape,
    tag_key: &str,
    stack: &mut Vec<&'static str>,
) -> Result<Vec<FieldInfo>, ReflectError> {
    if stack.contains(&shape.type_name) {
        return Err(ReflectError::new(format!(
            "{} embeds itself through {}",
            shape.type_name,
            stack.join(" -> ")
        )));
    }
    stack.push(shape.type_name);

    let mut fields = Vec::with_capacity(shape.fields.len());
    for raw in &shape.fields {
        if !raw.exported {
            continue;
        }

        let (key, omit_empty, omit_zero) = parse_json_tag(raw.name, raw.tag("json"));
        if key == "-" {
            continue;
        }

        match (raw.anonymous, raw.embedded) {
            (true, Some(describe)) => {
                let nested = resolve_nested(&describe(), tag_key, stack)?;
                for inner in nested {
                    let mut index = Vec::with_capacity(inner.index.len() + 1);
                    index.push(raw.index);
                    index.extend_from_slice(&inner.index);
                    fields.push(FieldInfo {
                        index,
                        name: format!("{}.{}", raw.name, inner.name),
                        ..inner
                    });
                }
            }
            (anonymous, _) => fields.push(FieldInfo {
                index: vec![raw.index],
                name: raw.name.to_owned(),
                key,
                groups: parse_groups_tag(raw.tag(tag_key)),
                omit_empty,
                omit_zero,
                anonymous,
            }),
        }
    }

    stack.pop();
    Ok(fields)
}

/// Parses `name[,omitempty][,omitzero]`. An empty name keeps the field name.
pub(crate) fn parse_json_tag(field_name: &str, tag: Option<&str>) -> (String, bool, bool) {
    let Some(tag) = tag.filter(|t| !t.is_empty()) else {
        return (field_name.to_owned(), false, false);
    };

    let mut parts = tag.split(',');
    let name = match parts.next() {
        Some(n) if !n.is_empty() => n.to_owned(),
        _ => field_name.to_owned(),
    };

    let mut omit_empty = false;
    let mut omit_zero = false;
    for opt in parts {
        match opt {
            "omitempty" => omit_empty = true,
            "omitzero" => omit_zero = true,
            _ => {}
        }
    }
    (name, omit_empty, omit_zero)
}

/// Splits a comma separated group list, trimming and dropping empty segments.
pub(crate) fn parse_groups_tag(tag: Option<&str>) -> Vec<String> {
    tag.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
