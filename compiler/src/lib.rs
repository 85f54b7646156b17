//! brine-fbs-compiler
//!
//! This crate implements the front end of a FlatBuffers schema compiler:
//!  1) A tokenizer + parser for `.fbs` IDL files (`parse_schema_text`),
//!  2) Declaration builders and a per-file type registry,
//!  3) An include resolver with cycle detection (`CompilationContext`),
//!  4) A schema verifier (singletons, enum types, undefined types, etc.),
//!  5) Error types (`FbsError`), and the `Generator` trait with a JSON
//!     generator for handing the resolved AST to code generators.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod builder;
pub mod verifier;
pub mod context;
pub mod resolver;
pub mod compiler;
pub mod gen_json;
pub mod traits;

pub use compiler::{compile_files, compile_schema, schema_to_json};
pub use context::{CancellationToken, CompilationContext, CompileOptions, FsLoader, MemoryLoader, SourceLoader};
pub use error::FbsError;
pub use gen_json::{generator_for, JsonGenerator};
pub use parser::parse_schema_text;
pub use schema::SchemaFile;
pub use traits::Generator;
