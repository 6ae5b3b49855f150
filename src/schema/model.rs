use std::{fmt, sync::Arc};

use derive_more::with_trait::{Display, Error};
use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::{
    ast::{
        Definition, Document, OperationType, ScalarDefinition, ScalarKind, TypeDefinition,
        TypeDescriptor, TypeField,
    },
    executor::Resolver,
    schema::validate::{assert_fields_unique, assert_object_implements},
};

/// Error during schema construction or finalization.
///
/// A server cannot run against a misconfigured schema, so callers are
/// expected to treat any of these as fatal at startup.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum SchemaError {
    /// A type with the same name is already registered.
    #[display("Type '{_0}' already exists in schema")]
    DuplicateType(#[error(not(source))] String),

    /// Names beginning with `__` are reserved.
    #[display("Type name '{_0}' uses the reserved '__' prefix")]
    ReservedName(#[error(not(source))] String),

    /// A type declares two fields with the same name.
    #[display("Multiple fields named '{field}' in '{owner}'")]
    DuplicateField {
        /// Offending field name.
        field: String,
        /// Type declaring the field twice.
        owner: String,
    },

    /// A union was registered without members.
    #[display("Union '{_0}' must have one or more member types")]
    EmptyUnion(#[error(not(source))] String),

    /// A referenced type name does not resolve in the registry.
    #[display("Unknown type '{_0}'")]
    UnknownType(#[error(not(source))] String),

    /// A union member resolved to something other than an object type.
    #[display("Union member '{_0}' must be an object type")]
    UnionMemberNotObject(#[error(not(source))] String),

    /// A name in an `implements` list is not an interface.
    #[display("Type '{name}' in implements list of '{object}' is not an interface")]
    NotAnInterface {
        /// The non-interface name.
        name: String,
        /// The object declaring it.
        object: String,
    },

    /// An object is missing a field required by an interface.
    #[display("Object '{object}' does not have field '{field}', required by interface '{interface}'")]
    MissingInterfaceField {
        /// The implementing object.
        object: String,
        /// The missing field.
        field: String,
        /// The interface requiring it.
        interface: String,
    },

    /// An object field's type differs from the interface's declaration.
    #[display("Object field '{field}' must be of type '{expected}', required by interface '{interface}'")]
    InterfaceFieldType {
        /// The offending field.
        field: String,
        /// Rendered type name the interface requires.
        expected: String,
        /// The interface requiring it.
        interface: String,
    },

    /// An object field declares different arguments than the interface.
    #[display("Field '{field}' has a different argument list than required by interface '{interface}'")]
    InterfaceFieldArguments {
        /// The offending field.
        field: String,
        /// The interface requiring the arguments.
        interface: String,
    },

    /// A resolver was attached to a leaf type.
    #[display("Resolvers can only be registered for object, interface or union types, and '{_0}' is not one")]
    ResolverTargetNotAbstract(#[error(not(source))] String),

    /// A schema root was set to a non-object type.
    #[display("Schema root must be an object type")]
    RootNotObject,

    /// `finalize` requires a query root.
    #[display("Schema does not define a query root")]
    MissingQueryRoot,

    /// The schema is frozen; no further mutation is allowed.
    #[display("Schema is already finalized")]
    Finalized,

    /// A document passed to the registry contained executable definitions.
    #[display("Document contains a definition that is not a type definition")]
    NotATypeDefinition,
}

/// An entire GraphQL type system, queried from a single endpoint.
///
/// A schema is built up mutably (from parsed type-system documents or
/// programmatic registration), then frozen with [`Schema::finalize`].
/// Finalization validates every type reference, wires field definitions to
/// their base types and checks interface satisfaction; afterwards the
/// schema is immutable and safe to share across request tasks.
pub struct Schema {
    types: IndexMap<String, TypeDefinition>,
    resolvers: FnvHashMap<String, Arc<dyn Resolver>>,
    query_root: Option<usize>,
    mutation_root: Option<usize>,
    finalized: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("query_root", &self.query_root)
            .field("mutation_root", &self.mutation_root)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Schema {
    /// Creates a schema pre-seeded with the built-in scalar types.
    #[must_use]
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for (name, kind) in [
            ("Int", ScalarKind::Int),
            ("Float", ScalarKind::Float),
            ("String", ScalarKind::String),
            ("Boolean", ScalarKind::Boolean),
            ("ID", ScalarKind::String),
        ] {
            types.insert(
                name.to_owned(),
                TypeDefinition::Scalar(ScalarDefinition {
                    name: name.to_owned(),
                    kind,
                }),
            );
        }

        Self {
            types,
            resolvers: FnvHashMap::default(),
            query_root: None,
            mutation_root: None,
            finalized: false,
        }
    }

    fn ensure_mutable(&self) -> Result<(), SchemaError> {
        if self.finalized {
            Err(SchemaError::Finalized)
        } else {
            Ok(())
        }
    }

    /// Makes a type known to the schema.
    pub fn register_type(&mut self, def: TypeDefinition) -> Result<(), SchemaError> {
        self.ensure_mutable()?;

        let name = def.name().to_owned();
        if name.starts_with("__") {
            return Err(SchemaError::ReservedName(name));
        }
        if self.types.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }

        match &def {
            TypeDefinition::Object(obj) => assert_fields_unique(&obj.fields, &obj.name)?,
            TypeDefinition::Interface(iface) => assert_fields_unique(&iface.fields, &iface.name)?,
            TypeDefinition::Union(union) => {
                if union.members.is_empty() {
                    return Err(SchemaError::EmptyUnion(name));
                }
            }
            TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
        }

        self.types.insert(name, def);
        Ok(())
    }

    /// Registers every type definition of a parsed type-system document.
    pub fn add_document(&mut self, doc: &Document) -> Result<(), SchemaError> {
        for def in &doc.definitions {
            match def {
                Definition::Type(def) => self.register_type(def.clone())?,
                Definition::Operation(_) | Definition::Fragment(_) => {
                    return Err(SchemaError::NotATypeDefinition);
                }
            }
        }
        Ok(())
    }

    /// Attaches a resolver to an abstract type by name.
    pub fn register_resolver(
        &mut self,
        type_name: &str,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(), SchemaError> {
        self.ensure_mutable()?;

        let def = self
            .types
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.into()))?;
        if !def.is_abstract() {
            return Err(SchemaError::ResolverTargetNotAbstract(type_name.into()));
        }

        self.resolvers.insert(type_name.into(), resolver);
        Ok(())
    }

    /// Sets the root object for `query` operations.
    pub fn set_query_root(&mut self, type_name: &str) -> Result<(), SchemaError> {
        self.ensure_mutable()?;
        self.query_root = Some(self.object_index(type_name)?);
        Ok(())
    }

    /// Sets the root object for `mutation` operations.
    pub fn set_mutation_root(&mut self, type_name: &str) -> Result<(), SchemaError> {
        self.ensure_mutable()?;
        self.mutation_root = Some(self.object_index(type_name)?);
        Ok(())
    }

    fn object_index(&self, type_name: &str) -> Result<usize, SchemaError> {
        let idx = self
            .types
            .get_index_of(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.into()))?;
        match self.type_at(idx) {
            TypeDefinition::Object(_) => Ok(idx),
            _ => Err(SchemaError::RootNotObject),
        }
    }

    /// Performs the one-shot type checking and cross-linking pass.
    ///
    /// Walks every registered type, resolves all referenced type names
    /// (descending list and input-object composites), populates the field
    /// definition back-references, verifies interface satisfaction and
    /// links union members to their object definitions. On success the
    /// schema is frozen; calling this twice is an error.
    pub fn finalize(&mut self) -> Result<(), SchemaError> {
        self.ensure_mutable()?;
        if self.query_root.is_none() {
            return Err(SchemaError::MissingQueryRoot);
        }

        for def in self.types.values() {
            match def {
                TypeDefinition::Object(obj) => {
                    self.finalize_fields(&obj.fields)?;
                    for iface_name in &obj.implements {
                        let iface = match self.types.get(iface_name.as_str()) {
                            Some(TypeDefinition::Interface(iface)) => iface,
                            Some(_) => {
                                return Err(SchemaError::NotAnInterface {
                                    name: iface_name.clone(),
                                    object: obj.name.clone(),
                                });
                            }
                            None => return Err(SchemaError::UnknownType(iface_name.clone())),
                        };
                        assert_object_implements(obj, iface)?;
                    }
                }
                TypeDefinition::Interface(iface) => self.finalize_fields(&iface.fields)?,
                TypeDefinition::Union(union) => {
                    let mut indices = Vec::with_capacity(union.members.len());
                    for member in &union.members {
                        let name = member
                            .base_name()
                            .ok_or_else(|| SchemaError::UnionMemberNotObject(member.to_string()))?;
                        let idx = self
                            .types
                            .get_index_of(name)
                            .ok_or_else(|| SchemaError::UnknownType(name.into()))?;
                        if !matches!(self.type_at(idx), TypeDefinition::Object(_)) {
                            return Err(SchemaError::UnionMemberNotObject(name.into()));
                        }
                        indices.push(idx);
                    }
                    union.link_members(indices);
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
            }
        }

        self.finalized = true;
        tracing::debug!(types = self.types.len(), "schema finalized");
        Ok(())
    }

    fn finalize_fields(&self, fields: &[TypeField]) -> Result<(), SchemaError> {
        for field in fields {
            if let Some(idx) = self.resolve_descriptor(&field.field_type)? {
                let _ = field.definition.set(idx);
            }
            for arg in &field.arguments {
                self.resolve_descriptor(&arg.arg_type)?;
            }
        }
        Ok(())
    }

    /// Resolves the base type a descriptor refers to, verifying that every
    /// referenced name exists. Input objects have no single base type and
    /// resolve to [`None`] once their contents check out.
    fn resolve_descriptor(&self, desc: &TypeDescriptor) -> Result<Option<usize>, SchemaError> {
        match desc {
            TypeDescriptor::Base { name, .. } => self
                .types
                .get_index_of(name.as_str())
                .map(Some)
                .ok_or_else(|| SchemaError::UnknownType(name.clone())),
            TypeDescriptor::List { of, .. } => self.resolve_descriptor(of),
            TypeDescriptor::InputObject { fields, .. } => {
                for field_type in fields.values() {
                    self.resolve_descriptor(field_type)?;
                }
                Ok(None)
            }
        }
    }

    /// Whether [`Schema::finalize`] has completed.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Looks up a type by registry index.
    ///
    /// Indices come from this schema's own lookups and stay valid for its
    /// lifetime.
    #[must_use]
    pub fn type_at(&self, index: usize) -> &TypeDefinition {
        self.types
            .get_index(index)
            .map(|(_, def)| def)
            .expect("type index out of range")
    }

    /// Looks up a type's registry index by name.
    #[must_use]
    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.types.get_index_of(name)
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Looks up the resolver registered for a type name.
    #[must_use]
    pub fn resolver(&self, type_name: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.get(type_name)
    }

    /// Registry index of the root object for the given operation kind.
    #[must_use]
    pub fn operation_root(&self, operation_type: OperationType) -> Option<usize> {
        match operation_type {
            OperationType::Query => self.query_root,
            OperationType::Mutation => self.mutation_root,
        }
    }
}
