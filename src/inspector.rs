// src/inspector.rs

//! Tools for inspecting the resolved field table of a type.
//! Useful for debugging tag declarations and group assignments.

use serde::Serialize;

use crate::error::{JsonGroupError, Result};
use crate::filter::include;
use crate::options::{GroupMode, Options};
use crate::resolver::{resolve, FieldInfo};
use crate::rt::Described;

/// The resolved field table of one struct type.
#[derive(Debug, Serialize)]
pub struct TypeReport {
    /// Fully qualified type name.
    pub type_name: &'static str,
    /// Tag key the groups were read from.
    pub tag_key: String,
    /// Emitted fields in output order, embedded members already flattened.
    pub fields: Vec<FieldInfo>,
}

impl TypeReport {
    /// Output keys that survive the group filter for `groups` under `mode`.
    pub fn keys_for(&self, groups: &[&str], mode: GroupMode) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| include(&f.groups, groups, mode))
            .map(|f| f.key.as_str())
            .collect()
    }

    /// Every group mentioned by at least one field, sorted and deduplicated.
    pub fn groups(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self
            .fields
            .iter()
            .flat_map(|f| f.groups.iter().map(String::as_str))
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }
}

/// The jsongroup Inspector tool.
#[derive(Debug)]
pub struct Inspector;

impl Inspector {
    /// Resolves `T`'s field table with `options.tag_key`.
    ///
    /// Goes straight to the resolver, so the field cache and its counters
    /// are left untouched.
    pub fn inspect<T: Described>(options: &Options) -> Result<TypeReport> {
        let shape = T::describe();
        let fields = resolve(&shape, &options.tag_key)
            .map_err(|cause| JsonGroupError::reflection("", cause))?;
        Ok(TypeReport {
            type_name: shape.type_name,
            tag_key: options.tag_key.clone(),
            fields,
        })
    }
}

impl std::fmt::Display for TypeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== JSONGROUP TYPE REPORT ===")?;
        writeln!(f, "Type:     {}", self.type_name)?;
        writeln!(f, "Tag key:  {}", self.tag_key)?;
        writeln!(f, "\n[FIELDS]")?;
        for (i, field) in self.fields.iter().enumerate() {
            let connector = if i + 1 == self.fields.len() { "└── " } else { "├── " };
            let mut flags = Vec::new();
            if field.omit_empty {
                flags.push("omitempty");
            }
            if field.omit_zero {
                flags.push("omitzero");
            }
            if field.anonymous {
                flags.push("anonymous");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(","))
            };
            writeln!(
                f,
                "{}\"{}\" <- {} {:?} | groups: {}{}",
                connector,
                field.key,
                field.name,
                field.index,
                if field.groups.is_empty() {
                    "-".to_owned()
                } else {
                    field.groups.join(",")
                },
                flags
            )?;
        }
        Ok(())
    }
}
