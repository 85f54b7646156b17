//! Drives one schema file from parsed declarations to a resolved
//! `SchemaFile`, recursing into includes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};
use crate::{
    builder::{build_compound, build_enum, build_union},
    context::{check_cancelled, CompilationContext, FileState, SourceLoader},
    error::FbsError,
    parser::parse_schema_text,
    registry::Namespace,
    schema::SchemaFile,
    types::{CompoundKind, Declaration, EnumKind, ParsedSchema, Spanned},
    verifier::{
        check_singleton, verify_file_identifier, verify_references, verify_root_type,
        verify_struct_recursion,
    },
};

impl<L: SourceLoader> CompilationContext<L> {
    /// Compiles the file at an already resolved path, reusing the cached
    /// result when it was compiled before. On failure the file is dropped
    /// from the cache and the error names the file.
    pub(crate) fn compile_file(&mut self, path: PathBuf) -> Result<Arc<SchemaFile>, FbsError> {
        if let Some(FileState::Parsed(file)) = self.files.get(&path) {
            return Ok(Arc::clone(file));
        }

        debug!(path = %path.display(), "compiling schema");
        self.files.insert(path.clone(), FileState::InProgress);

        let result = self
            .loader
            .load(&path)
            .and_then(|text| parse_schema_text(&text))
            .and_then(|parsed| self.resolve(&path, &parsed));

        match result {
            Ok(file) => {
                let file = Arc::new(file);
                debug!(
                    path = %path.display(),
                    tables = file.tables.len(),
                    structs = file.structs.len(),
                    enums = file.enums.len(),
                    unions = file.unions.len(),
                    "schema resolved"
                );
                self.files.insert(path, FileState::Parsed(Arc::clone(&file)));
                Ok(file)
            }
            Err(err) => {
                self.files.remove(&path);
                Err(err.in_file(path))
            }
        }
    }

    /// Applies the declarations of one parsed file in order. Includes are
    /// compiled and merged when they are reached, so by the time a table is
    /// built every included type is visible.
    pub fn resolve(&mut self, path: &Path, parsed: &ParsedSchema) -> Result<SchemaFile, FbsError> {
        let mut file = SchemaFile::new(path);

        for decl in &parsed.declarations {
            check_cancelled(&self.cancel)?;
            trace!(path = %path.display(), keyword = decl.keyword(), "declaration");

            match decl {
                Declaration::Include(include) => self.include(&mut file, include)?,
                Declaration::Namespace(ns) => file.namespace = Namespace::new(&ns.text),
                Declaration::Attribute(attr) => {
                    file.attributes.insert(attr.text.clone());
                }
                Declaration::Option { name, value } => {
                    file.options
                        .entry(name.text.clone())
                        .or_default()
                        .insert(value.as_str().to_string());
                }
                Declaration::Compound(raw) => {
                    let def = build_compound(&mut file, raw)?;
                    match raw.kind {
                        CompoundKind::Table  => file.tables.push(def),
                        CompoundKind::Struct => file.structs.push(def),
                    }
                }
                Declaration::Enum(raw) => match raw.kind {
                    EnumKind::Enum => {
                        let def = build_enum(&mut file, raw)?;
                        file.enums.push(def);
                    }
                    EnumKind::Union => {
                        let def = build_union(&mut file, raw)?;
                        file.unions.push(def);
                    }
                },
                Declaration::RootType(name) => {
                    check_singleton(&file.root_type, "root_type")?;
                    file.root_type = Some(verify_root_type(&file, &name.text)?);
                }
                Declaration::FileExtension(ext) => {
                    check_singleton(&file.file_extension, "file_extension")?;
                    file.file_extension = Some(ext.text.clone());
                }
                Declaration::FileIdentifier(ident) => {
                    check_singleton(&file.file_identifier, "file_identifier")?;
                    verify_file_identifier(&ident.text)?;
                    file.file_identifier = Some(ident.text.clone());
                }
            }
        }

        verify_references(&file)?;
        verify_struct_recursion(&file)?;
        Ok(file)
    }

    fn include(&mut self, file: &mut SchemaFile, include: &Spanned) -> Result<(), FbsError> {
        let target = self.loader.resolve(Some(&file.path), &include.text)?;
        if target == file.path {
            debug!(path = %file.path.display(), "ignoring self include");
            return Ok(());
        }

        let included = match self.files.get(&target) {
            Some(FileState::InProgress) => {
                return Err(FbsError::CircularInclude {
                    includer: file.path.clone(),
                    included: target,
                });
            }
            Some(FileState::Parsed(done)) => Arc::clone(done),
            None => self.compile_file(target.clone())?,
        };

        let added = file.types.merge(&included.types)?;
        debug!(
            includer = %file.path.display(),
            included = %target.display(),
            added,
            "merged include"
        );
        if !file.includes.contains(&target) {
            file.includes.push(target);
        }
        Ok(())
    }
}
