#![allow(missing_docs)]

//! Data model for scope information: positions, the original-scope and
//! generated-range trees, value bindings, and the [`ScopeInfo`] arenas
//! that own them.

mod enums;

pub use enums::{RangeFlags, ScopeFlags, Tag};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A zero-based line/column pair. Ordering is lexicographic by line, then
/// column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Creates a position from a line/column pair.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A position in an authored source, qualified by an index into the source
/// map's `sources` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OriginalPosition {
    pub source_index: u32,
    pub line: u32,
    pub column: u32,
}

impl OriginalPosition {
    /// Creates an original position from its three components.
    pub fn new(source_index: u32, line: u32, column: u32) -> Self {
        Self {
            source_index,
            line,
            column,
        }
    }
}

/// Identifies an [`OriginalScope`] inside a [`ScopeInfo`]. Ids are arena
/// indices assigned in pre-order, so they double as the wire-level
/// definition-scope numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub(crate) usize);

impl ScopeId {
    /// Returns the arena index of this id.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifies a [`GeneratedRange`] inside a [`ScopeInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeId(pub(crate) usize);

impl RangeId {
    /// Returns the arena index of this id.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A lexical scope of the authored source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OriginalScope {
    pub start: Position,
    pub end: Position,
    /// Function or class name, when the scope has one.
    pub name: Option<String>,
    /// Scope kind label such as `"Global"` or `"Function"`; carried
    /// verbatim, never interpreted.
    pub kind: Option<String>,
    /// Whether invocations of this scope produce a stack frame.
    pub is_stack_frame: bool,
    /// Names declared in this scope, in declaration order.
    pub variables: Vec<String>,
    /// Nested scopes in start-position order.
    pub children: Vec<ScopeId>,
    /// Enclosing scope; `None` at the top level.
    pub parent: Option<ScopeId>,
}

/// A contiguous span of the generated code, associated with the authored
/// scope it was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedRange {
    pub start: Position,
    pub end: Position,
    /// The authored scope whose code this range holds, when known.
    pub original_scope: Option<ScopeId>,
    pub is_stack_frame: bool,
    /// Suppress the range from stack traces even when a definition scope
    /// is present.
    pub is_hidden: bool,
    /// Where the inlined call originated; only present on inlined ranges.
    pub call_site: Option<OriginalPosition>,
    /// One binding per variable of the definition scope.
    pub values: Vec<Binding>,
    /// Nested ranges in start-position order.
    pub children: Vec<RangeId>,
    /// Enclosing range; `None` at the top level.
    pub parent: Option<RangeId>,
}

/// How an authored variable can be recovered inside a generated range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    /// The variable has no recoverable value in this range.
    #[default]
    Unavailable,
    /// A single expression valid throughout the range.
    Expression(String),
    /// Expressions that differ across parts of the range; the entries
    /// tile the range exactly.
    SubRanges(Vec<SubRangeBinding>),
}

/// One piece of a sub-range binding: `value` holds between `from`
/// (inclusive) and `to` (exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRangeBinding {
    pub value: Option<String>,
    pub from: Position,
    pub to: Position,
}

/// The decoded scope information of one source map: two flat node arenas
/// plus the top-level entry lists.
///
/// `scopes` carries one entry per source, with `None` marking sources that
/// have no scope data. Ids index the arenas directly; scope arena order is
/// the pre-order of the forest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeInfo {
    /// Top-level scope of each source, aligned with the map's `sources`.
    pub scopes: Vec<Option<ScopeId>>,
    /// Top-level generated ranges in start-position order.
    pub ranges: Vec<RangeId>,
    /// Arena of scope nodes.
    pub scope_nodes: Vec<OriginalScope>,
    /// Arena of range nodes.
    pub range_nodes: Vec<GeneratedRange>,
}

impl ScopeInfo {
    /// Resolves a scope id. Panics when the id does not belong to this
    /// arena; use [`ScopeInfo::get_scope`] for a fallible lookup.
    pub fn scope(&self, id: ScopeId) -> &OriginalScope {
        &self.scope_nodes[id.0]
    }

    /// Resolves a range id. Panics when the id does not belong to this
    /// arena; use [`ScopeInfo::get_range`] for a fallible lookup.
    pub fn range(&self, id: RangeId) -> &GeneratedRange {
        &self.range_nodes[id.0]
    }

    /// Fallible scope lookup.
    pub fn get_scope(&self, id: ScopeId) -> Option<&OriginalScope> {
        self.scope_nodes.get(id.0)
    }

    /// Fallible range lookup.
    pub fn get_range(&self, id: RangeId) -> Option<&GeneratedRange> {
        self.range_nodes.get(id.0)
    }

    /// Iterates the per-source top-level scopes.
    pub fn root_scopes(&self) -> impl Iterator<Item = Option<&OriginalScope>> + '_ {
        self.scopes.iter().map(|entry| entry.map(|id| self.scope(id)))
    }

    /// Iterates the top-level generated ranges.
    pub fn root_ranges(&self) -> impl Iterator<Item = &GeneratedRange> + '_ {
        self.ranges.iter().map(|&id| self.range(id))
    }

    /// Appends another info's forests, rebasing its arena ids.
    pub(crate) fn append(&mut self, other: ScopeInfo) {
        let scope_base = self.scope_nodes.len();
        let range_base = self.range_nodes.len();

        for mut node in other.scope_nodes {
            node.parent = node.parent.map(|id| ScopeId(id.0 + scope_base));
            for child in &mut node.children {
                child.0 += scope_base;
            }
            self.scope_nodes.push(node);
        }
        for mut node in other.range_nodes {
            node.parent = node.parent.map(|id| RangeId(id.0 + range_base));
            node.original_scope = node.original_scope.map(|id| ScopeId(id.0 + scope_base));
            for child in &mut node.children {
                child.0 += range_base;
            }
            self.range_nodes.push(node);
        }
        self.scopes.extend(
            other
                .scopes
                .into_iter()
                .map(|entry| entry.map(|id| ScopeId(id.0 + scope_base))),
        );
        self.ranges
            .extend(other.ranges.into_iter().map(|id| RangeId(id.0 + range_base)));
    }

    /// Shifts every generated position by a section offset: positions on
    /// line zero also gain the column offset.
    pub(crate) fn shift_generated(&mut self, offset: Position) {
        if offset == Position::default() {
            return;
        }
        for node in &mut self.range_nodes {
            shift_position(&mut node.start, offset);
            shift_position(&mut node.end, offset);
            for binding in &mut node.values {
                if let Binding::SubRanges(parts) = binding {
                    for part in parts {
                        shift_position(&mut part.from, offset);
                        shift_position(&mut part.to, offset);
                    }
                }
            }
        }
    }
}

fn shift_position(position: &mut Position, offset: Position) {
    if position.line == 0 {
        position.column += offset.column;
    }
    position.line += offset.line;
}

/// Checks that a sub-range binding list tiles `[start, end)` exactly:
/// anchored at both endpoints, contiguous, every piece non-empty.
pub(crate) fn validate_sub_range_tiling(
    start: Position,
    end: Position,
    parts: &[SubRangeBinding],
) -> Result<()> {
    let Some(first) = parts.first() else {
        return Err(Error::semantic("sub-range binding list is empty"));
    };
    if first.from != start {
        return Err(Error::semantic(format!(
            "sub-range bindings must start at the range start {}:{}, found {}:{}",
            start.line, start.column, first.from.line, first.from.column
        )));
    }
    let last = parts.last().expect("checked non-empty");
    if last.to != end {
        return Err(Error::semantic(format!(
            "sub-range bindings must end at the range end {}:{}, found {}:{}",
            end.line, end.column, last.to.line, last.to.column
        )));
    }
    let mut previous_to: Option<Position> = None;
    for part in parts {
        if part.from >= part.to {
            return Err(Error::semantic(format!(
                "sub-range binding from {}:{} does not precede its end {}:{}",
                part.from.line, part.from.column, part.to.line, part.to.column
            )));
        }
        if let Some(expected) = previous_to {
            if part.from != expected {
                return Err(Error::semantic(format!(
                    "sub-range bindings must be contiguous: expected {}:{}, found {}:{}",
                    expected.line, expected.column, part.from.line, part.from.column
                )));
            }
        }
        previous_to = Some(part.to);
    }
    Ok(())
}
