//! Structural schema checks.
//!
//! Schema validation happens once, before any request is served. A GraphQL
//! server cannot run against an invalid schema, so every check here is
//! fatal to schema construction.

use crate::{
    ast::{InterfaceDefinition, ObjectDefinition, TypeField},
    schema::SchemaError,
};

/// Asserts that every field name within `fields` is unique.
pub(crate) fn assert_fields_unique(fields: &[TypeField], owner: &str) -> Result<(), SchemaError> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(SchemaError::DuplicateField {
                field: field.name.clone(),
                owner: owner.into(),
            });
        }
    }
    Ok(())
}

/// Asserts that an object satisfies an interface: every interface field
/// must appear on the object under the same name, with the identical
/// rendered type name and a matching argument list (same arity, same keys
/// in the same order).
pub(crate) fn assert_object_implements(
    obj: &ObjectDefinition,
    iface: &InterfaceDefinition,
) -> Result<(), SchemaError> {
    for required in &iface.fields {
        let Some(found) = obj.fields.iter().find(|f| f.name == required.name) else {
            return Err(SchemaError::MissingInterfaceField {
                object: obj.name.clone(),
                field: required.name.clone(),
                interface: iface.name.clone(),
            });
        };

        if found.field_type.to_string() != required.field_type.to_string() {
            return Err(SchemaError::InterfaceFieldType {
                field: found.name.clone(),
                expected: required.field_type.to_string(),
                interface: iface.name.clone(),
            });
        }

        assert_arguments_compatible(found, required, &iface.name)?;
    }

    Ok(())
}

/// Asserts that two fields declare compatible arguments.
fn assert_arguments_compatible(
    field: &TypeField,
    required: &TypeField,
    interface: &str,
) -> Result<(), SchemaError> {
    if field.arguments.len() != required.arguments.len() {
        return Err(SchemaError::InterfaceFieldArguments {
            field: field.name.clone(),
            interface: interface.into(),
        });
    }

    for (arg, required_arg) in field.arguments.iter().zip(&required.arguments) {
        if arg.key != required_arg.key {
            return Err(SchemaError::InterfaceFieldArguments {
                field: field.name.clone(),
                interface: interface.into(),
            });
        }
    }

    Ok(())
}
