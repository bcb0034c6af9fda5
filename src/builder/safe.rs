use crate::builder::{RangeOptions, ScopeInfoBuilder, ScopeOptions};
use crate::error::{Error, Result};
use crate::types::{Binding, OriginalPosition, OriginalScope, Position, ScopeId, ScopeInfo,
    validate_sub_range_tiling};

/// Validating variant of [`ScopeInfoBuilder`].
///
/// Every operation checks its preconditions (nesting, position ordering,
/// cross-references, binding shapes) before delegating, so an info built
/// through this type always encodes cleanly.
#[derive(Debug, Default)]
pub struct SafeScopeInfoBuilder {
    inner: ScopeInfoBuilder,
}

impl SafeScopeInfoBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`ScopeInfoBuilder::add_null_scope`]. Fails while a range is
    /// open.
    pub fn add_null_scope(&mut self) -> Result<&mut Self> {
        self.ensure_no_open_range("add a null scope")?;
        self.inner.add_null_scope();
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::start_scope`]. Fails while a range is open
    /// or when the position violates parent/sibling ordering.
    pub fn start_scope(&mut self, line: u32, column: u32, options: ScopeOptions) -> Result<&mut Self> {
        self.ensure_no_open_range("start a scope")?;
        let position = Position::new(line, column);
        if let Some(parent) = self.inner.current_scope() {
            if position < parent.start {
                return Err(Error::semantic(format!(
                    "scope start {line}:{column} precedes the enclosing scope's start {}:{}",
                    parent.start.line, parent.start.column
                )));
            }
        }
        if let Some(sibling_end) = self.inner.preceding_sibling_scope_end() {
            if position < sibling_end {
                return Err(Error::semantic(format!(
                    "scope start {line}:{column} precedes the preceding sibling's end {}:{}",
                    sibling_end.line, sibling_end.column
                )));
            }
        }
        self.inner.start_scope(line, column, options);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_scope_name`]. Fails without an open
    /// scope.
    pub fn set_scope_name(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.ensure_open_scope("set a scope name")?;
        self.inner.set_scope_name(name);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_scope_kind`]. Fails without an open
    /// scope.
    pub fn set_scope_kind(&mut self, kind: impl Into<String>) -> Result<&mut Self> {
        self.ensure_open_scope("set a scope kind")?;
        self.inner.set_scope_kind(kind);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_scope_stack_frame`]. Fails without an
    /// open scope.
    pub fn set_scope_stack_frame(&mut self, is_stack_frame: bool) -> Result<&mut Self> {
        self.ensure_open_scope("set the stack-frame flag")?;
        self.inner.set_scope_stack_frame(is_stack_frame);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_scope_variables`]. Fails without an
    /// open scope.
    pub fn set_scope_variables(&mut self, variables: Vec<String>) -> Result<&mut Self> {
        self.ensure_open_scope("set scope variables")?;
        self.inner.set_scope_variables(variables);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::end_scope`]. Fails without an open scope or
    /// when the end precedes the start.
    pub fn end_scope(&mut self, line: u32, column: u32) -> Result<&mut Self> {
        let Some(scope) = self.inner.current_scope() else {
            return Err(Error::structure("cannot end a scope: none is open"));
        };
        let position = Position::new(line, column);
        if position < scope.start {
            return Err(Error::semantic(format!(
                "scope end {line}:{column} precedes the scope's start {}:{}",
                scope.start.line, scope.start.column
            )));
        }
        self.inner.end_scope(line, column);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::current_scope`].
    pub fn current_scope(&self) -> Option<&OriginalScope> {
        self.inner.current_scope()
    }

    /// See [`ScopeInfoBuilder::current_scope_id`].
    pub fn current_scope_id(&self) -> Option<ScopeId> {
        self.inner.current_scope_id()
    }

    /// See [`ScopeInfoBuilder::last_scope`].
    pub fn last_scope(&self) -> Option<&OriginalScope> {
        self.inner.last_scope()
    }

    /// See [`ScopeInfoBuilder::last_scope_id`].
    pub fn last_scope_id(&self) -> Option<ScopeId> {
        self.inner.last_scope_id()
    }

    /// See [`ScopeInfoBuilder::start_range`]. Fails while a scope is open,
    /// on ordering violations, on unresolvable definition-scope
    /// references, and on values that do not match the definition scope.
    pub fn start_range(&mut self, line: u32, column: u32, options: RangeOptions) -> Result<&mut Self> {
        if self.inner.open_scope_count() > 0 {
            return Err(Error::structure(
                "cannot start a range while a scope is still open",
            ));
        }
        let position = Position::new(line, column);
        if let Some(parent) = self.inner.current_range() {
            if position < parent.start {
                return Err(Error::semantic(format!(
                    "range start {line}:{column} precedes the enclosing range's start {}:{}",
                    parent.start.line, parent.start.column
                )));
            }
        }
        if let Some(sibling_end) = self.inner.preceding_sibling_range_end() {
            if position < sibling_end {
                return Err(Error::semantic(format!(
                    "range start {line}:{column} precedes the preceding sibling's end {}:{}",
                    sibling_end.line, sibling_end.column
                )));
            }
        }

        let scope = self.resolve_definition(&options)?;
        if !options.values.is_empty() {
            self.check_values(scope, options.values.len())?;
        }
        self.inner.start_range(line, column, options);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_definition_scope`]. Fails without
    /// an open range or when the scope was not produced by this builder.
    pub fn set_range_definition_scope(&mut self, scope: ScopeId) -> Result<&mut Self> {
        self.ensure_open_range("set a definition scope")?;
        self.check_scope_id(scope)?;
        self.inner.set_range_definition_scope(scope);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_definition_scope_key`]. Fails
    /// without an open range or when the key is unknown.
    pub fn set_range_definition_scope_key(&mut self, key: &str) -> Result<&mut Self> {
        self.ensure_open_range("set a definition scope")?;
        let Some(scope) = self.inner.resolve_key(key) else {
            return Err(Error::reference(format!("unknown scope key {key:?}")));
        };
        self.inner.set_range_definition_scope(scope);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_stack_frame`]. Fails without an
    /// open range.
    pub fn set_range_stack_frame(&mut self, is_stack_frame: bool) -> Result<&mut Self> {
        self.ensure_open_range("set the stack-frame flag")?;
        self.inner.set_range_stack_frame(is_stack_frame);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_hidden`]. Fails without an open
    /// range.
    pub fn set_range_hidden(&mut self, is_hidden: bool) -> Result<&mut Self> {
        self.ensure_open_range("set the hidden flag")?;
        self.inner.set_range_hidden(is_hidden);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_values`]. Fails without an open
    /// range, without a definition scope, or on a count mismatch.
    pub fn set_range_values(&mut self, values: Vec<Binding>) -> Result<&mut Self> {
        self.ensure_open_range("set range values")?;
        let scope = self.inner.current_range().and_then(|range| range.original_scope);
        self.check_values(scope, values.len())?;
        self.inner.set_range_values(values);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::set_range_call_site`]. Fails without an
    /// open range.
    pub fn set_range_call_site(&mut self, call_site: OriginalPosition) -> Result<&mut Self> {
        self.ensure_open_range("set a call site")?;
        self.inner.set_range_call_site(call_site);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::end_range`]. Fails without an open range,
    /// when the end precedes the start, when sub-range bindings do not
    /// tile the range, or when a call site is combined with a missing
    /// definition scope or the stack-frame flag.
    pub fn end_range(&mut self, line: u32, column: u32) -> Result<&mut Self> {
        let Some(range) = self.inner.current_range() else {
            return Err(Error::structure("cannot end a range: none is open"));
        };
        let position = Position::new(line, column);
        if position < range.start {
            return Err(Error::semantic(format!(
                "range end {line}:{column} precedes the range's start {}:{}",
                range.start.line, range.start.column
            )));
        }
        for binding in &range.values {
            if let Binding::SubRanges(parts) = binding {
                validate_sub_range_tiling(range.start, position, parts)?;
            }
        }
        if range.call_site.is_some() {
            if range.original_scope.is_none() {
                return Err(Error::semantic(
                    "a range with a call site requires a definition scope",
                ));
            }
            if range.is_stack_frame {
                return Err(Error::semantic(
                    "an inlined range cannot itself be a stack frame",
                ));
            }
        }
        self.inner.end_range(line, column);
        Ok(self)
    }

    /// See [`ScopeInfoBuilder::build`]. Fails while any scope or range is
    /// still open.
    pub fn build(&mut self) -> Result<ScopeInfo> {
        if self.inner.open_scope_count() > 0 {
            return Err(Error::structure(format!(
                "cannot build: {} scope(s) still open",
                self.inner.open_scope_count()
            )));
        }
        if self.inner.open_range_count() > 0 {
            return Err(Error::structure(format!(
                "cannot build: {} range(s) still open",
                self.inner.open_range_count()
            )));
        }
        Ok(self.inner.build())
    }

    fn ensure_no_open_range(&self, action: &str) -> Result<()> {
        if self.inner.open_range_count() > 0 {
            return Err(Error::structure(format!(
                "cannot {action} while a range is still open"
            )));
        }
        Ok(())
    }

    fn ensure_open_scope(&self, action: &str) -> Result<()> {
        if self.inner.open_scope_count() == 0 {
            return Err(Error::structure(format!("cannot {action}: no scope is open")));
        }
        Ok(())
    }

    fn ensure_open_range(&self, action: &str) -> Result<()> {
        if self.inner.open_range_count() == 0 {
            return Err(Error::structure(format!("cannot {action}: no range is open")));
        }
        Ok(())
    }

    fn check_scope_id(&self, scope: ScopeId) -> Result<()> {
        if self.inner.scope_node(scope).is_none() {
            return Err(Error::reference(
                "definition scope was not produced by this builder",
            ));
        }
        Ok(())
    }

    fn resolve_definition(&self, options: &RangeOptions) -> Result<Option<ScopeId>> {
        if let Some(scope) = options.scope {
            self.check_scope_id(scope)?;
            return Ok(Some(scope));
        }
        match options.scope_key.as_deref() {
            Some(key) => match self.inner.resolve_key(key) {
                Some(scope) => Ok(Some(scope)),
                None => Err(Error::reference(format!("unknown scope key {key:?}"))),
            },
            None => Ok(None),
        }
    }

    fn check_values(&self, scope: Option<ScopeId>, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let Some(scope) = scope else {
            return Err(Error::semantic(
                "range values require a definition scope",
            ));
        };
        let variables = self
            .inner
            .scope_node(scope)
            .map(|node| node.variables.len())
            .unwrap_or(0);
        if count != variables {
            return Err(Error::semantic(format!(
                "range carries {count} value binding(s) but its definition scope declares {variables} variable(s)"
            )));
        }
        Ok(())
    }
}
