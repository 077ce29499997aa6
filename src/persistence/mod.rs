//! Persistence module
//!
//! Patch save/load functionality using serde and JSON.

pub mod patch;

pub use patch::{
    default_patch_path, from_schema, load_modules, load_or_sample, save_modules, to_schema,
    KindSchema, ModuleSchema, PatchError, PatchFile, SCHEMA_VERSION,
};
