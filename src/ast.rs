//! Abstract syntax tree for GraphQL documents.
//!
//! A [`Document`] holds the definitions of a single parsed source: executable
//! definitions (operations and fragments) and, for type-system documents,
//! type definitions. Nodes own their names so that type definitions can
//! outlive the source text they were parsed from.

use std::{fmt, sync::OnceLock};

use indexmap::IndexMap;

/// A GraphQL document: an ordered sequence of definitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// Definitions in source order.
    pub definitions: Vec<Definition>,
}

/// A single definition in a GraphQL document.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    Operation(Operation),
    Fragment(Fragment),
    Type(TypeDefinition),
}

/// The kind of an operation (either `query` or `mutation`).
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationType {
    Query,
    Mutation,
}

/// A definition representing some operation on the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Operation name; empty for the anonymous shorthand form.
    pub name: String,
    /// Whether this is a query or a mutation.
    pub operation_type: OperationType,
    /// Declared variables.
    pub variable_definitions: Vec<VariableDefinition>,
    /// Directives attached to the operation itself.
    pub directives: Vec<Directive>,
    /// The top-level selection set.
    pub selection_set: Vec<Selection>,
}

/// A named, reusable selection set with an associated target type.
///
/// Inline fragments (`... on Type { … }`) reuse this node with an empty
/// name. The type condition is carried in the AST but not filtered on at
/// expansion time; resolvers decide what applies.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Fragment name; empty for inline fragments.
    pub name: String,
    /// The type the fragment applies to.
    pub type_condition: String,
    /// Directives attached to the definition.
    pub directives: Vec<Directive>,
    /// The fragment body.
    pub selection_set: Vec<Selection>,
}

/// Entry in a GraphQL selection set
///
/// ```text
/// {
///   field(withArg: 123) { subField }
///   ...fragmentSpread
///   ...on User {
///     inlineFragmentField
///   }
/// }
/// ```
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Field(Field),
    FragmentSpread(FragmentSpread),
    InlineFragment(Fragment),
}

/// A discrete piece of information requested about an object.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Response key override, from the `alias: name` form.
    pub alias: Option<String>,
    /// Field name as declared on the parent type.
    pub name: String,
    /// Argument key-value pairs in source order.
    pub arguments: Vec<(String, InputValue)>,
    /// Directives attached to the field.
    pub directives: Vec<Directive>,
    /// Sub-selection, present only for abstract-typed fields.
    pub selection_set: Option<Vec<Selection>>,
}

impl Field {
    /// The key under which this field's value is emitted: the alias if
    /// present, else the field name.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The instantiation of a named fragment within another selection set.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpread {
    /// Name of the spread fragment.
    pub name: String,
    /// Directives attached to the spread.
    pub directives: Vec<Directive>,
}

/// A `@name(args…)` modifier attached to a field, fragment or operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// Directive name, without the `@`.
    pub name: String,
    /// Argument key-value pairs in source order.
    pub arguments: Vec<(String, InputValue)>,
}

impl Directive {
    /// Looks up an argument by key.
    #[must_use]
    pub fn argument(&self, key: &str) -> Option<&InputValue> {
        self.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// The declaration of a variable on an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    /// Variable name, without the `$`.
    pub name: String,
    /// Declared type.
    pub var_type: TypeDescriptor,
    /// Default value, if any.
    pub default: Option<InputValue>,
}

/// A value that can be passed as an argument or variable default.
///
/// These are _not_ constant and might contain variable references. A
/// literal `null` is rejected at parse time and has no variant here.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    Boolean(bool),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

/// A syntactic reference to a type.
///
/// Carries no semantic information and might refer to types that don't
/// exist; coercion to a registered type happens in the schema phase. The
/// rendered name produced by the [`fmt::Display`] implementation is the
/// canonical form used as the equality predicate across the crate.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    /// A plain named type.
    Base {
        /// Referenced type name.
        name: String,
        /// `false` when the reference carries a trailing `!`.
        nullable: bool,
    },
    /// A list of some other type.
    List {
        /// Element type.
        of: Box<TypeDescriptor>,
        /// `false` when the reference carries a trailing `!`.
        nullable: bool,
    },
    /// An anonymous input object type.
    InputObject {
        /// Field name to type mapping, in declaration order.
        fields: IndexMap<String, TypeDescriptor>,
        /// `false` when the reference carries a trailing `!`.
        nullable: bool,
    },
}

impl TypeDescriptor {
    /// Creates a nullable named type reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Base {
            name: name.into(),
            nullable: true,
        }
    }

    /// Whether values of this type may be `null`.
    #[must_use]
    pub fn nullable(&self) -> bool {
        match self {
            Self::Base { nullable, .. }
            | Self::List { nullable, .. }
            | Self::InputObject { nullable, .. } => *nullable,
        }
    }

    /// Whether this descriptor is a list (at either nullability).
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// The innermost named type this descriptor refers to, unpacking lists.
    /// Input objects refer to no single type and return [`None`].
    #[must_use]
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Self::Base { name, .. } => Some(name),
            Self::List { of, .. } => of.base_name(),
            Self::InputObject { .. } => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base { name, .. } => write!(f, "{name}")?,
            Self::List { of, .. } => write!(f, "[{of}]")?,
            Self::InputObject { fields, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i != 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "}}")?;
            }
        }
        if !self.nullable() {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// The four base kinds a scalar can be declared over.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
}

/// A named type in the type system.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarDefinition),
    Enum(EnumDefinition),
    Object(ObjectDefinition),
    Interface(InterfaceDefinition),
    Union(UnionDefinition),
}

impl TypeDefinition {
    /// The name of the type. Unique within a schema.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(d) => &d.name,
            Self::Enum(d) => &d.name,
            Self::Object(d) => &d.name,
            Self::Interface(d) => &d.name,
            Self::Union(d) => &d.name,
        }
    }

    /// Whether values of this type have sub-fields. The opposite of a leaf.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Looks up a field by name on object and interface types.
    ///
    /// Unions carry no fields of their own, so any lookup on them fails.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&TypeField> {
        let fields = match self {
            Self::Object(d) => &d.fields,
            Self::Interface(d) => &d.fields,
            _ => return None,
        };
        fields.iter().find(|f| f.name == name)
    }
}

/// A scalar leaf type backed by one of the built-in base kinds.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarDefinition {
    /// Type name.
    pub name: String,
    /// Base kind the scalar serializes as.
    pub kind: ScalarKind,
}

/// An enum leaf type.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumDefinition {
    /// Type name.
    pub name: String,
    /// Declared values, mapped to their declaration index.
    pub values: IndexMap<String, i32>,
}

/// An object type: a named set of fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDefinition {
    /// Type name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<TypeField>,
    /// Names of interfaces this object claims to implement.
    pub implements: Vec<String>,
}

/// An interface type: a named set of fields objects can implement.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDefinition {
    /// Type name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<TypeField>,
}

/// A union of object types.
#[derive(Clone, Debug)]
pub struct UnionDefinition {
    /// Type name.
    pub name: String,
    /// Member type references in declaration order.
    pub members: Vec<TypeDescriptor>,

    resolved_members: OnceLock<Vec<usize>>,
}

impl UnionDefinition {
    /// Creates a union over the given member references.
    pub fn new(name: impl Into<String>, members: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            members,
            resolved_members: OnceLock::new(),
        }
    }

    /// Registry indices of the member object definitions.
    ///
    /// Empty before the owning schema is finalized.
    #[must_use]
    pub fn member_indices(&self) -> &[usize] {
        self.resolved_members.get().map_or(&[], Vec::as_slice)
    }

    pub(crate) fn link_members(&self, indices: Vec<usize>) {
        let _ = self.resolved_members.set(indices);
    }
}

impl PartialEq for UnionDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.members == other.members
    }
}

/// A single field declared on an object or interface.
#[derive(Clone, Debug)]
pub struct TypeField {
    /// Field name.
    pub name: String,
    /// Declared result type.
    pub field_type: TypeDescriptor,
    /// Declared arguments in order.
    pub arguments: Vec<ArgumentDeclaration>,

    /// Registry index of the field type's base definition.
    ///
    /// Unset until the owning schema is finalized; populated exactly once
    /// during finalization. Fields with anonymous input-object types have
    /// no base definition and stay unset.
    pub(crate) definition: OnceLock<usize>,
}

impl TypeField {
    /// Creates a field declaration.
    pub fn new(
        name: impl Into<String>,
        field_type: TypeDescriptor,
        arguments: Vec<ArgumentDeclaration>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            arguments,
            definition: OnceLock::new(),
        }
    }

    /// Registry index of this field's base type definition, when finalized.
    #[must_use]
    pub fn definition_index(&self) -> Option<usize> {
        self.definition.get().copied()
    }
}

impl PartialEq for TypeField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.field_type == other.field_type
            && self.arguments == other.arguments
    }
}

/// The declaration of an argument on a type field.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDeclaration {
    /// Argument key.
    pub key: String,
    /// Declared argument type.
    pub arg_type: TypeDescriptor,
}

// Document rendering back into GraphQL source text. Re-parsing the rendered
// form yields a structurally equal document.

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, def) in self.definitions.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{def}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(op) => op.fmt(f),
            Self::Fragment(frag) => frag.fmt(f),
            Self::Type(def) => def.fmt(f),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty()
            && self.variable_definitions.is_empty()
            && self.directives.is_empty()
            && self.operation_type == OperationType::Query
        {
            return write_selection_set(f, &self.selection_set);
        }

        match self.operation_type {
            OperationType::Query => write!(f, "query {}", self.name)?,
            OperationType::Mutation => write!(f, "mutation {}", self.name)?,
        }
        if !self.variable_definitions.is_empty() {
            write!(f, "(")?;
            for (i, var) in self.variable_definitions.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "${}: {}", var.name, var.var_type)?;
                if let Some(default) = &var.default {
                    write!(f, " = {default}")?;
                }
            }
            write!(f, ")")?;
        }
        write_directives(f, &self.directives)?;
        write!(f, " ")?;
        write_selection_set(f, &self.selection_set)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fragment {} on {}", self.name, self.type_condition)?;
        write_directives(f, &self.directives)?;
        write!(f, " ")?;
        write_selection_set(f, &self.selection_set)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => field.fmt(f),
            Self::FragmentSpread(spread) => {
                write!(f, "...{}", spread.name)?;
                write_directives(f, &spread.directives)
            }
            Self::InlineFragment(frag) => {
                write!(f, "... on {}", frag.type_condition)?;
                write_directives(f, &frag.directives)?;
                write!(f, " ")?;
                write_selection_set(f, &frag.selection_set)
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "{alias}: ")?;
        }
        write!(f, "{}", self.name)?;
        write_arguments(f, &self.arguments)?;
        write_directives(f, &self.directives)?;
        if let Some(selection_set) = &self.selection_set {
            write!(f, " ")?;
            write_selection_set(f, selection_set)?;
        }
        Ok(())
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "${name}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::String(s) => write_escaped_string(f, s),
            Self::Enum(name) => write!(f, "{name}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt(f)?;
                }
                write!(f, "]")
            }
            Self::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(d) => {
                let kind = match d.kind {
                    ScalarKind::Int => "Int",
                    ScalarKind::Float => "Float",
                    ScalarKind::String => "String",
                    ScalarKind::Boolean => "Boolean",
                };
                write!(f, "scalar {} {}", d.name, kind)
            }
            Self::Enum(d) => {
                write!(f, "enum {} {{ ", d.name)?;
                for (i, value) in d.values.keys().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, " }}")
            }
            Self::Union(d) => {
                write!(f, "union {} = ", d.name)?;
                for (i, member) in d.members.iter().enumerate() {
                    if i != 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Self::Interface(d) => {
                write!(f, "interface {} {{ ", d.name)?;
                write_type_fields(f, &d.fields)?;
                write!(f, " }}")
            }
            Self::Object(d) => {
                write!(f, "type {}", d.name)?;
                if !d.implements.is_empty() {
                    write!(f, " : {}", d.implements.join(" "))?;
                }
                write!(f, " {{ ")?;
                write_type_fields(f, &d.fields)?;
                write!(f, " }}")
            }
        }
    }
}

fn write_type_fields(f: &mut fmt::Formatter<'_>, fields: &[TypeField]) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i != 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", field.name)?;
        if !field.arguments.is_empty() {
            write!(f, "(")?;
            for (j, arg) in field.arguments.iter().enumerate() {
                if j != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", arg.key, arg.arg_type)?;
            }
            write!(f, ")")?;
        }
        write!(f, ": {}", field.field_type)?;
    }
    Ok(())
}

fn write_selection_set(f: &mut fmt::Formatter<'_>, selection_set: &[Selection]) -> fmt::Result {
    write!(f, "{{ ")?;
    for (i, sel) in selection_set.iter().enumerate() {
        if i != 0 {
            write!(f, " ")?;
        }
        write!(f, "{sel}")?;
    }
    write!(f, " }}")
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[(String, InputValue)]) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }
    write!(f, "(")?;
    for (i, (key, value)) in arguments.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    write!(f, ")")
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &[Directive]) -> fmt::Result {
    for dir in directives {
        write!(f, " @{}", dir.name)?;
        write_arguments(f, &dir.arguments)?;
    }
    Ok(())
}

fn write_escaped_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}
