use crate::{
    compiler::schema_to_json,
    error::FbsError,
    schema::SchemaFile,
    traits::Generator,
};

/// Emits the resolved AST as JSON for out-of-process code generators.
pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn name(&self) -> &'static str {
        "json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn generate(&self, schema: &SchemaFile) -> Result<String, FbsError> {
        schema_to_json(schema)
    }
}

/// Looks up a built-in generator by its command-line name.
pub fn generator_for(name: &str) -> Result<Box<dyn Generator>, FbsError> {
    match name {
        "json" => Ok(Box::new(JsonGenerator)),
        other => Err(FbsError::UnsupportedGenerator(other.to_string())),
    }
}
