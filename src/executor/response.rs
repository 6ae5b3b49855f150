use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::{
    executor::{ExecutionError, FieldError, FieldResult},
    schema::Schema,
    value::{ResultMap, Value},
};

/// One field entry registered on a response node: the response key (alias
/// if given, else field name) and the field name as declared on the type.
#[derive(Clone, Debug)]
pub(crate) struct FieldEntry {
    pub(crate) key: String,
    pub(crate) name: String,
}

/// A node in the per-request response tree.
///
/// The tree mirrors the shape of the query: one node per abstract-typed
/// field, with leaf results stored in the node's result map. A node is
/// populated by the resolver registered for its result type; its field
/// list is filled in by selection expansion, in lexical query order, and
/// drives the key order of the serialized response.
///
/// Sibling nodes encode list fan-out: a resolver handling a list-typed
/// field clones its node once per additional element with
/// [`ResponseNode::push_sibling`]. Siblings share the field list and the
/// arguments but carry their own results.
///
/// Mutation is region-scoped: a node's own state is only written by the
/// task executing its subtree, so no tree-wide lock exists.
pub struct ResponseNode {
    name: String,
    type_index: usize,
    is_nullable: bool,
    args: ResultMap,
    fields: Arc<Mutex<Vec<FieldEntry>>>,
    results: Mutex<ResultMap>,
    children: Mutex<Vec<Arc<ResponseNode>>>,
    siblings: Mutex<Vec<Arc<ResponseNode>>>,
    null: AtomicBool,
    resolved: AtomicBool,
}

impl ResponseNode {
    pub(crate) fn root(type_index: usize) -> Arc<Self> {
        Arc::new(Self {
            name: "__root".into(),
            type_index,
            is_nullable: true,
            args: ResultMap::new(),
            fields: Arc::new(Mutex::new(Vec::new())),
            results: Mutex::new(ResultMap::new()),
            children: Mutex::new(Vec::new()),
            siblings: Mutex::new(Vec::new()),
            null: AtomicBool::new(false),
            resolved: AtomicBool::new(false),
        })
    }

    /// Creates a child node under `parent` for the given response key.
    pub(crate) fn child(
        parent: &Arc<ResponseNode>,
        name: String,
        type_index: usize,
        is_nullable: bool,
        args: ResultMap,
    ) -> Arc<Self> {
        let node = Arc::new(Self {
            name,
            type_index,
            is_nullable,
            args,
            fields: Arc::new(Mutex::new(Vec::new())),
            results: Mutex::new(ResultMap::new()),
            children: Mutex::new(Vec::new()),
            siblings: Mutex::new(Vec::new()),
            null: AtomicBool::new(false),
            resolved: AtomicBool::new(false),
        });
        parent.children.lock().unwrap().push(node.clone());
        node
    }

    /// The response key this node is serialized under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry index of this node's result type.
    #[must_use]
    pub fn type_index(&self) -> usize {
        self.type_index
    }

    /// Whether this node may be set to `null`.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// The computed arguments of the field this node answers.
    #[must_use]
    pub fn args(&self) -> &ResultMap {
        &self.args
    }

    /// The field names registered on this node so far, in query order.
    ///
    /// The resolver runs before its node's own selection set is expanded,
    /// so inside a resolver this list is usually still empty; it is the
    /// set the result map must cover by the time the node serializes.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        self.fields
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Stores a leaf result under the given field name.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.results.lock().unwrap().insert(field, value);
    }

    /// Marks this node (and thereby its whole sub-tree) as `null`.
    ///
    /// Only legal on nullable nodes.
    pub fn set_null(&self, null: bool) -> FieldResult<()> {
        if null && !self.is_nullable {
            return Err(FieldError::from(format!(
                "Field '{}' is not nullable",
                self.name
            )));
        }
        self.null.store(null, Ordering::Release);
        Ok(())
    }

    /// Clones this node into a new sibling, the mechanism by which a
    /// resolver fans a list-typed field out over its elements.
    ///
    /// The sibling shares this node's field list and arguments and starts
    /// with an empty result map. During serialization a list field renders
    /// as `[node, sibling, …]` in creation order.
    pub fn push_sibling(&self) -> Arc<ResponseNode> {
        let sibling = Arc::new(Self {
            name: self.name.clone(),
            type_index: self.type_index,
            is_nullable: self.is_nullable,
            args: self.args.clone(),
            fields: self.fields.clone(),
            results: Mutex::new(ResultMap::new()),
            children: Mutex::new(Vec::new()),
            siblings: Mutex::new(Vec::new()),
            null: AtomicBool::new(false),
            resolved: AtomicBool::new(false),
        });
        self.siblings.lock().unwrap().push(sibling.clone());
        sibling
    }

    pub(crate) fn push_field(&self, key: String, name: String) {
        self.fields.lock().unwrap().push(FieldEntry { key, name });
    }

    pub(crate) fn mark_resolved(&self) {
        self.resolved.store(true, Ordering::Release);
    }

    /// Whether the sub-tree under this node has settled.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Walks the response tree and produces the serializable value for
    /// this node, honoring field registration order.
    pub(crate) fn collect(&self, schema: &Schema) -> Result<Value, ExecutionError> {
        if self.null.load(Ordering::Acquire) {
            if !self.is_nullable {
                return Err(ExecutionError::new(format!(
                    "Response node for non-nullable field '{}' is null",
                    self.name
                )));
            }
            return Ok(Value::Null);
        }

        let def = schema.type_at(self.type_index);
        let fields = self.fields.lock().unwrap();
        let results = self.results.lock().unwrap();
        let children = self.children.lock().unwrap();

        let mut object = ResultMap::new();
        for entry in fields.iter() {
            let field = def.field(&entry.name).ok_or_else(|| {
                ExecutionError::new(format!(
                    "Type '{}' has no field named '{}'",
                    def.name(),
                    entry.name
                ))
            })?;

            let is_abstract = field
                .definition_index()
                .is_some_and(|idx| schema.type_at(idx).is_abstract());

            if !is_abstract {
                let value = results.get(&entry.name).cloned().ok_or_else(|| {
                    ExecutionError::new(format!("No value resolved for field '{}'", entry.name))
                })?;
                if value.is_null() && !field.field_type.nullable() {
                    return Err(ExecutionError::new(format!(
                        "Field '{}' of non-nullable type '{}' resolved to null",
                        entry.name, field.field_type
                    )));
                }
                object.insert(entry.key.clone(), value);
                continue;
            }

            let child = children
                .iter()
                .find(|child| child.name == entry.key)
                .ok_or_else(|| {
                    ExecutionError::new(format!("No response node for field '{}'", entry.key))
                })?;

            if field.field_type.is_list() {
                let mut items = vec![child.collect(schema)?];
                for sibling in child.siblings.lock().unwrap().iter() {
                    items.push(sibling.collect(schema)?);
                }
                object.insert(entry.key.clone(), Value::List(items));
            } else {
                object.insert(entry.key.clone(), child.collect(schema)?);
            }
        }

        Ok(Value::Object(object))
    }
}
