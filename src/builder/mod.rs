//! Fluent assembly of [`ScopeInfo`] trees.
//!
//! [`ScopeInfoBuilder`] is permissive: ill-timed calls are silent no-ops,
//! which keeps it usable as the assembly backend of the decoder's LAX
//! mode. [`SafeScopeInfoBuilder`] wraps it with up-front validation.

mod safe;

pub use safe::SafeScopeInfoBuilder;

use rustc_hash::FxHashMap;

use crate::types::{
    Binding, GeneratedRange, OriginalPosition, OriginalScope, Position, RangeId, ScopeId,
    ScopeInfo,
};

/// Options applied when opening an original scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeOptions {
    /// Function or class name.
    pub name: Option<String>,
    /// Scope kind label.
    pub kind: Option<String>,
    /// Whether the scope produces a stack frame.
    pub is_stack_frame: bool,
    /// Variables declared in the scope.
    pub variables: Vec<String>,
    /// Caller-chosen key under which the scope is registered, for later
    /// definition-scope references by key.
    pub key: Option<String>,
}

/// Options applied when opening a generated range.
#[derive(Debug, Clone, Default)]
pub struct RangeOptions {
    /// Definition scope by id; takes precedence over `scope_key`.
    pub scope: Option<ScopeId>,
    /// Definition scope by the key it was registered under.
    pub scope_key: Option<String>,
    /// Whether the range produces a stack frame.
    pub is_stack_frame: bool,
    /// Suppress the range from stack traces.
    pub is_hidden: bool,
    /// Call site of an inlined range.
    pub call_site: Option<OriginalPosition>,
    /// One binding per variable of the definition scope.
    pub values: Vec<Binding>,
}

/// Stateful fluent constructor for [`ScopeInfo`].
///
/// Scopes and ranges open with `start_*`, mutate through the `set_*`
/// family while on top of their stack, and close with `end_*`, which
/// attaches them to the enclosing node or the top level. `build` returns
/// the assembled info and resets the builder.
#[derive(Debug, Default)]
pub struct ScopeInfoBuilder {
    info: ScopeInfo,
    scope_stack: Vec<ScopeId>,
    range_stack: Vec<RangeId>,
    last_scope: Option<ScopeId>,
    keyed_scopes: FxHashMap<String, ScopeId>,
}

impl ScopeInfoBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `null` top-level placeholder for a source without scope
    /// information.
    pub fn add_null_scope(&mut self) -> &mut Self {
        self.info.scopes.push(None);
        self
    }

    /// Opens a scope starting at the given position.
    pub fn start_scope(&mut self, line: u32, column: u32, options: ScopeOptions) -> &mut Self {
        let id = ScopeId(self.info.scope_nodes.len());
        let position = Position::new(line, column);
        self.info.scope_nodes.push(OriginalScope {
            start: position,
            end: position,
            name: options.name,
            kind: options.kind,
            is_stack_frame: options.is_stack_frame,
            variables: options.variables,
            children: Vec::new(),
            parent: self.scope_stack.last().copied(),
        });
        if let Some(key) = options.key {
            self.keyed_scopes.insert(key, id);
        }
        self.scope_stack.push(id);
        self
    }

    /// Sets the name of the innermost open scope.
    pub fn set_scope_name(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(scope) = self.current_scope_node_mut() {
            scope.name = Some(name.into());
        }
        self
    }

    /// Sets the kind of the innermost open scope.
    pub fn set_scope_kind(&mut self, kind: impl Into<String>) -> &mut Self {
        if let Some(scope) = self.current_scope_node_mut() {
            scope.kind = Some(kind.into());
        }
        self
    }

    /// Sets the stack-frame flag of the innermost open scope.
    pub fn set_scope_stack_frame(&mut self, is_stack_frame: bool) -> &mut Self {
        if let Some(scope) = self.current_scope_node_mut() {
            scope.is_stack_frame = is_stack_frame;
        }
        self
    }

    /// Replaces the variables of the innermost open scope.
    pub fn set_scope_variables(&mut self, variables: Vec<String>) -> &mut Self {
        if let Some(scope) = self.current_scope_node_mut() {
            scope.variables = variables;
        }
        self
    }

    /// Closes the innermost open scope at the given end position.
    pub fn end_scope(&mut self, line: u32, column: u32) -> &mut Self {
        let Some(id) = self.scope_stack.pop() else {
            return self;
        };
        self.info.scope_nodes[id.0].end = Position::new(line, column);
        match self.scope_stack.last().copied() {
            Some(parent) => self.info.scope_nodes[parent.0].children.push(id),
            None => self.info.scopes.push(Some(id)),
        }
        self.last_scope = Some(id);
        self
    }

    /// Returns the innermost open scope.
    pub fn current_scope(&self) -> Option<&OriginalScope> {
        self.scope_stack.last().map(|&id| &self.info.scope_nodes[id.0])
    }

    /// Returns the id of the innermost open scope.
    pub fn current_scope_id(&self) -> Option<ScopeId> {
        self.scope_stack.last().copied()
    }

    /// Returns the most recently closed scope.
    pub fn last_scope(&self) -> Option<&OriginalScope> {
        self.last_scope.map(|id| &self.info.scope_nodes[id.0])
    }

    /// Returns the id of the most recently closed scope.
    pub fn last_scope_id(&self) -> Option<ScopeId> {
        self.last_scope
    }

    /// Opens a generated range starting at the given position.
    pub fn start_range(&mut self, line: u32, column: u32, options: RangeOptions) -> &mut Self {
        let id = RangeId(self.info.range_nodes.len());
        let position = Position::new(line, column);
        let original_scope = options
            .scope
            .or_else(|| options.scope_key.as_deref().and_then(|key| self.resolve_key(key)));
        self.info.range_nodes.push(GeneratedRange {
            start: position,
            end: position,
            original_scope,
            is_stack_frame: options.is_stack_frame,
            is_hidden: options.is_hidden,
            call_site: options.call_site,
            values: options.values,
            children: Vec::new(),
            parent: self.range_stack.last().copied(),
        });
        self.range_stack.push(id);
        self
    }

    /// Sets the definition scope of the innermost open range.
    pub fn set_range_definition_scope(&mut self, scope: ScopeId) -> &mut Self {
        if let Some(range) = self.current_range_mut() {
            range.original_scope = Some(scope);
        }
        self
    }

    /// Sets the definition scope of the innermost open range by key. An
    /// unknown key leaves the range untouched.
    pub fn set_range_definition_scope_key(&mut self, key: &str) -> &mut Self {
        let Some(scope) = self.resolve_key(key) else {
            return self;
        };
        self.set_range_definition_scope(scope)
    }

    /// Sets the stack-frame flag of the innermost open range.
    pub fn set_range_stack_frame(&mut self, is_stack_frame: bool) -> &mut Self {
        if let Some(range) = self.current_range_mut() {
            range.is_stack_frame = is_stack_frame;
        }
        self
    }

    /// Sets the hidden flag of the innermost open range.
    pub fn set_range_hidden(&mut self, is_hidden: bool) -> &mut Self {
        if let Some(range) = self.current_range_mut() {
            range.is_hidden = is_hidden;
        }
        self
    }

    /// Replaces the value bindings of the innermost open range.
    pub fn set_range_values(&mut self, values: Vec<Binding>) -> &mut Self {
        if let Some(range) = self.current_range_mut() {
            range.values = values;
        }
        self
    }

    /// Sets the inlining call site of the innermost open range.
    pub fn set_range_call_site(&mut self, call_site: OriginalPosition) -> &mut Self {
        if let Some(range) = self.current_range_mut() {
            range.call_site = Some(call_site);
        }
        self
    }

    /// Closes the innermost open range at the given end position.
    pub fn end_range(&mut self, line: u32, column: u32) -> &mut Self {
        let Some(id) = self.range_stack.pop() else {
            return self;
        };
        self.info.range_nodes[id.0].end = Position::new(line, column);
        match self.range_stack.last().copied() {
            Some(parent) => self.info.range_nodes[parent.0].children.push(id),
            None => self.info.ranges.push(id),
        }
        self
    }

    /// Returns the assembled info and resets the builder for reuse.
    pub fn build(&mut self) -> ScopeInfo {
        self.scope_stack.clear();
        self.range_stack.clear();
        self.last_scope = None;
        self.keyed_scopes.clear();
        std::mem::take(&mut self.info)
    }

    pub(crate) fn resolve_key(&self, key: &str) -> Option<ScopeId> {
        self.keyed_scopes.get(key).copied()
    }

    pub(crate) fn open_scope_count(&self) -> usize {
        self.scope_stack.len()
    }

    pub(crate) fn open_range_count(&self) -> usize {
        self.range_stack.len()
    }

    pub(crate) fn scope_node_count(&self) -> usize {
        self.info.scope_nodes.len()
    }

    pub(crate) fn scope_node(&self, id: ScopeId) -> Option<&OriginalScope> {
        self.info.scope_nodes.get(id.0)
    }

    pub(crate) fn current_range(&self) -> Option<&GeneratedRange> {
        self.range_stack.last().map(|&id| &self.info.range_nodes[id.0])
    }

    pub(crate) fn current_range_mut(&mut self) -> Option<&mut GeneratedRange> {
        let id = self.range_stack.last().copied()?;
        Some(&mut self.info.range_nodes[id.0])
    }

    /// End position of the closed scope that would precede a scope opened
    /// now: the last child of the innermost open scope, or the last
    /// top-level scope when no scope is open.
    pub(crate) fn preceding_sibling_scope_end(&self) -> Option<Position> {
        let last_child = match self.scope_stack.last() {
            Some(&parent) => self.info.scope_nodes[parent.0].children.last().copied(),
            None => self.info.scopes.iter().rev().find_map(|entry| *entry),
        };
        last_child.map(|id| self.info.scope_nodes[id.0].end)
    }

    /// Range analogue of [`ScopeInfoBuilder::preceding_sibling_scope_end`].
    pub(crate) fn preceding_sibling_range_end(&self) -> Option<Position> {
        let last_child = match self.range_stack.last() {
            Some(&parent) => self.info.range_nodes[parent.0].children.last().copied(),
            None => self.info.ranges.last().copied(),
        };
        last_child.map(|id| self.info.range_nodes[id.0].end)
    }

    pub(crate) fn current_scope_node_mut(&mut self) -> Option<&mut OriginalScope> {
        let id = self.scope_stack.last().copied()?;
        Some(&mut self.info.scope_nodes[id.0])
    }
}
