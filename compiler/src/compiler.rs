use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::{
    context::{CompilationContext, CompileOptions, MemoryLoader},
    error::FbsError,
    schema::SchemaFile,
};

/// Compile a single in-memory schema. `path` names the file in errors and in
/// the type registry; the schema may include itself but nothing else.
pub fn compile_schema(path: impl Into<PathBuf>, text: &str) -> Result<Arc<SchemaFile>, FbsError> {
    let path = path.into();
    let loader = MemoryLoader::new().with_file(path.clone(), text);
    CompilationContext::new(loader).compile(&path)
}

/// Compile every file in `paths` against one shared context, so files
/// included by several roots are read once. Stops at the first error.
pub fn compile_files<P: AsRef<Path>>(paths: &[P], options: CompileOptions) -> Result<Vec<Arc<SchemaFile>>, FbsError> {
    let mut context = CompilationContext::from_options(options);
    paths.iter().map(|path| context.compile(path)).collect()
}

/// Pretty-printed JSON for a resolved schema.
pub fn schema_to_json(schema: &SchemaFile) -> Result<String, FbsError> {
    Ok(serde_json::to_string_pretty(schema)?)
}
