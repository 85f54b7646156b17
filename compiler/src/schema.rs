//! The resolved, validated AST handed to code generators.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::{
    registry::{Namespace, TypeRegistry},
    types::{CompoundKind, Literal, MetaItem, ScalarType},
};

/// Element type of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TypeRef {
    Scalar(ScalarType),
    /// Fully-qualified name of an enum, union, table or struct.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name:      String,
    pub line:      usize,
    pub column:    usize,
    /// The type name exactly as written in the source.
    pub type_name: String,
    pub element:   TypeRef,
    pub is_array:  bool,
    pub default:   Option<Literal>,
    pub metadata:  Vec<MetaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVal {
    pub key:      String,
    /// The value expression as written, if any.
    pub explicit: Option<String>,
    pub value:    i128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name:                 String,
    pub fully_qualified_name: String,
    pub line:                 usize,
    pub column:               usize,
    pub underlying:           Option<ScalarType>,
    pub bit_flags:            bool,
    pub values:               Vec<EnumVal>,
}

impl EnumDecl {
    pub fn value_of(&self, key: &str) -> Option<i128> {
        self.values.iter().find(|v| v.key == key).map(|v| v.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionMember {
    pub name:                 String,
    pub fully_qualified_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDecl {
    pub name:                 String,
    pub fully_qualified_name: String,
    pub line:                 usize,
    pub column:               usize,
    pub members:              Vec<UnionMember>,
}

/// A table or a struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundDecl {
    pub name:                 String,
    pub fully_qualified_name: String,
    pub kind:                 CompoundKind,
    pub line:                 usize,
    pub column:               usize,
    pub metadata:             Vec<MetaItem>,
    pub fields:               Vec<FieldDecl>,
}

impl CompoundDecl {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One fully resolved schema file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaFile {
    pub path:            PathBuf,
    /// Namespace in effect at the end of the file.
    pub namespace:       Namespace,
    pub includes:        Vec<PathBuf>,
    pub options:         BTreeMap<String, BTreeSet<String>>,
    pub attributes:      BTreeSet<String>,
    pub enums:           Vec<EnumDecl>,
    pub unions:          Vec<UnionDecl>,
    pub tables:          Vec<CompoundDecl>,
    pub structs:         Vec<CompoundDecl>,
    pub types:           TypeRegistry,
    pub root_type:       Option<String>,
    pub file_identifier: Option<String>,
    pub file_extension:  Option<String>,
}

impl SchemaFile {
    pub fn new(path: &Path) -> Self {
        SchemaFile {
            path:            path.to_path_buf(),
            namespace:       Namespace::default(),
            includes:        Vec::new(),
            options:         BTreeMap::new(),
            attributes:      BTreeSet::new(),
            enums:           Vec::new(),
            unions:          Vec::new(),
            tables:          Vec::new(),
            structs:         Vec::new(),
            types:           TypeRegistry::new(),
            root_type:       None,
            file_identifier: None,
            file_extension:  None,
        }
    }

    pub fn table(&self, fully_qualified_name: &str) -> Option<&CompoundDecl> {
        self.tables.iter().find(|t| t.fully_qualified_name == fully_qualified_name)
    }

    pub fn enum_(&self, fully_qualified_name: &str) -> Option<&EnumDecl> {
        self.enums.iter().find(|e| e.fully_qualified_name == fully_qualified_name)
    }

    pub fn union(&self, fully_qualified_name: &str) -> Option<&UnionDecl> {
        self.unions.iter().find(|u| u.fully_qualified_name == fully_qualified_name)
    }
}
