//! Schema registry: the type system requests execute against.

mod model;
mod validate;


use std::sync::OnceLock;

pub use self::model::{Schema, SchemaError};

static DEFAULT: OnceLock<Schema> = OnceLock::new();

/// Installs a finalized schema as the process-wide default.
///
/// A convenience for single-schema servers; all real APIs take an explicit
/// [`Schema`] handle. Fails if the schema is not finalized or a default is
/// already installed.
pub fn install_default(schema: Schema) -> Result<(), Schema> {
    if !schema.is_finalized() {
        return Err(schema);
    }
    DEFAULT.set(schema)
}

/// The process-wide default schema, if one has been installed.
#[must_use]
pub fn default_schema() -> Option<&'static Schema> {
    DEFAULT.get()
}
