//! Differential state shared by the grammar's two sides.
//!
//! The encoder and decoder each own one [`ScopeState`] and one
//! [`RangeState`]; the records are never shared across instances. Both are
//! reset to zero at the start of every top-level tree.

use crate::types::OriginalPosition;

/// Running state for original-scope items.
///
/// `line` and `column` track the most recently emitted scope position
/// (lines are delta-encoded, columns absolute but tracked for ordering
/// checks); the index fields are the running `names` offsets for the
/// name, kind and variable payloads.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScopeState {
    pub line: u32,
    pub column: u32,
    pub name: i64,
    pub kind: i64,
    pub variable: i64,
}

/// Running state for generated-range items.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RangeState {
    pub line: u32,
    pub column: u32,
    pub def_scope: i64,
    pub callsite_source: i64,
    pub callsite_line: i64,
    pub callsite_column: i64,
}

/// Cascade rule for the call-site triplet. A nonzero earlier delta makes
/// every later field absolute:
///
/// | Δsource | line field         | column field |
/// |---------|--------------------|--------------|
/// | nonzero | absolute           | absolute     |
/// | zero    | Δline (nonzero)    | absolute     |
/// | zero    | Δline (zero)       | Δcolumn      |
impl RangeState {
    /// Produces the three signed values for a call-site item and advances
    /// the state to the encoded position.
    pub fn call_site_deltas(&mut self, site: &OriginalPosition) -> (i64, i64, i64) {
        let source = i64::from(site.source_index);
        let line = i64::from(site.line);
        let column = i64::from(site.column);

        let d_source = source - self.callsite_source;
        let line_field = if d_source != 0 {
            line
        } else {
            line - self.callsite_line
        };
        let column_field = if d_source != 0 || line_field != 0 {
            column
        } else {
            column - self.callsite_column
        };

        self.callsite_source = source;
        self.callsite_line = line;
        self.callsite_column = column;
        (d_source, line_field, column_field)
    }

    /// Consumes the three signed values of a call-site item, advancing the
    /// state and returning the resolved `(source, line, column)`.
    pub fn apply_call_site(&mut self, d_source: i64, line_field: i64, column_field: i64) -> (i64, i64, i64) {
        let source = self.callsite_source + d_source;
        let line = if d_source != 0 {
            line_field
        } else {
            self.callsite_line + line_field
        };
        let column = if d_source != 0 || line_field != 0 {
            column_field
        } else {
            self.callsite_column + column_field
        };

        self.callsite_source = source;
        self.callsite_line = line;
        self.callsite_column = column;
        (source, line, column)
    }
}
