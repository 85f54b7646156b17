use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::{
    error::FbsError,
    types::ScalarType,
};

/// Whether built-in scalar names bypass namespace qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarMatch {
    Include,
    Exclude,
}

/// The dotted prefix applied to names declared after a `namespace` statement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Namespace(Option<String>);

impl Namespace {
    pub fn new(dotted: &str) -> Self {
        let trimmed = dotted.trim_end_matches('.');
        if trimmed.is_empty() {
            Namespace(None)
        } else {
            Namespace(Some(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Names that already contain a separator are treated as fully qualified,
    /// so qualifying twice yields the same result.
    pub fn qualify(&self, name: &str, scalars: ScalarMatch) -> String {
        if scalars == ScalarMatch::Include && ScalarType::from_name(name).is_some() {
            return name.to_string();
        }
        match &self.0 {
            Some(prefix) if !name.contains('.') => format!("{}.{}", prefix, name),
            _ => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Enum,
    Union,
    Table,
    Struct,
    EnumKey { value: i128 },
}

impl TypeKind {
    /// Kinds usable as a field type, union member or root type.
    pub fn is_type(&self) -> bool {
        !matches!(self, TypeKind::EnumKey { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEntry {
    #[serde(flatten)]
    pub kind:   TypeKind,
    /// File that declared the type.
    pub origin: PathBuf,
}

/// Fully-qualified type name → descriptor, owned by one schema file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    entries: BTreeMap<String, TypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: String, kind: TypeKind, origin: &Path) -> Result<(), FbsError> {
        if let Some(existing) = self.entries.get(&name) {
            return Err(FbsError::DuplicateType {
                name,
                first:  existing.origin.clone(),
                second: origin.to_path_buf(),
            });
        }
        self.entries.insert(name, TypeEntry { kind, origin: origin.to_path_buf() });
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&TypeEntry, FbsError> {
        self.entries.get(name).ok_or_else(|| FbsError::UndefinedType {
            name: name.to_string(),
        })
    }

    /// Copies every entry of `other` into `self`. Entries both registries got
    /// from the same declaring file are skipped; anything else already present
    /// is a duplicate definition. Returns the number of entries added.
    pub fn merge(&mut self, other: &TypeRegistry) -> Result<usize, FbsError> {
        let mut added = 0;
        for (name, entry) in &other.entries {
            match self.entries.get(name) {
                Some(existing) if existing == entry => continue,
                Some(existing) => {
                    return Err(FbsError::DuplicateType {
                        name:   name.clone(),
                        first:  existing.origin.clone(),
                        second: entry.origin.clone(),
                    });
                }
                None => {
                    self.entries.insert(name.clone(), entry.clone());
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypeEntry)> {
        self.entries.iter()
    }
}
