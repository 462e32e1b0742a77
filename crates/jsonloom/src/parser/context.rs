//! Parse contexts: the chain of open containers, kept for `$ref`
//! resolution.
//!
//! Every context ever opened stays in the arena until the parse ends, so
//! deferred references can still address containers that have closed.
use std::collections::HashMap;

use crate::{
    path::{FieldName, JsonPath, Segment},
    value::Value,
};

pub(crate) type ContextId = usize;

#[derive(Debug)]
struct ParseContext {
    object: Value,
    field: FieldName,
    parent: Option<ContextId>,
}

#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    arena: Vec<ParseContext>,
    current: Option<ContextId>,
}

impl ContextStack {
    pub(crate) fn current(&self) -> Option<ContextId> {
        self.current
    }

    /// Opens a context for `object` under the current one and makes it
    /// current.
    pub(crate) fn push(&mut self, object: Value, field: FieldName) -> ContextId {
        let id = self.arena.len();
        self.arena.push(ParseContext {
            object,
            field,
            parent: self.current,
        });
        self.current = Some(id);
        id
    }

    pub(crate) fn restore(&mut self, id: Option<ContextId>) {
        self.current = id;
    }

    pub(crate) fn object(&self, id: ContextId) -> Value {
        self.arena[id].object.clone()
    }

    /// Swaps the object of `id`, after a container was converted in place.
    pub(crate) fn replace_object(&mut self, id: ContextId, object: Value) {
        self.arena[id].object = object;
    }

    pub(crate) fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.arena[id].parent
    }

    pub(crate) fn root_of(&self, mut id: ContextId) -> ContextId {
        while let Some(parent) = self.arena[id].parent {
            id = parent;
        }
        id
    }

    /// Maps every context to its children by field, once, for resolving
    /// many paths. The first context opened under a field wins.
    pub(crate) fn path_index(&self) -> PathIndex {
        let mut index = PathIndex::default();
        for (id, context) in self.arena.iter().enumerate() {
            match context.parent {
                Some(parent) => {
                    index.children.entry((parent, context.field.clone())).or_insert(id);
                }
                None => {
                    index.root.get_or_insert(id);
                }
            }
        }
        index
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }
}

/// Contexts keyed by parent and field.
#[derive(Debug, Default)]
pub(crate) struct PathIndex {
    root: Option<ContextId>,
    children: HashMap<(ContextId, FieldName), ContextId>,
}

impl PathIndex {
    /// The context a back-reference path names. Negative indexes are left
    /// to evaluation against the finished value.
    pub(crate) fn lookup(&self, path: &JsonPath) -> Option<ContextId> {
        path.segments().iter().try_fold(self.root?, |at, segment| {
            let field = match segment {
                Segment::Property(key) => FieldName::Key(key.clone()),
                Segment::Index(i) => FieldName::Index(usize::try_from(*i).ok()?),
                _ => return None,
            };
            self.children.get(&(at, field)).copied()
        })
    }
}
