use crate::{error::FbsError, schema::SchemaFile};

/// Something that turns a resolved schema into output text. Code generators
/// for target languages live outside this crate and implement this trait.
pub trait Generator {
    fn name(&self) -> &'static str;

    /// Extension of the generated file, without the dot.
    fn file_extension(&self) -> &'static str;

    fn generate(&self, schema: &SchemaFile) -> Result<String, FbsError>;
}
