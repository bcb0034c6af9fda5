//! Serialization of [`ScopeInfo`] into the tagged item stream.

use rustc_hash::FxHashMap;

use crate::encoding::state::{RangeState, ScopeState};
use crate::encoding::{encode_signed_vlq, encode_unsigned_vlq};
use crate::error::{Error, Result};
use crate::sourcemap::SourceMapJson;
use crate::types::{
    Binding, Position, RangeFlags, RangeId, ScopeFlags, ScopeId, ScopeInfo, SubRangeBinding, Tag,
    validate_sub_range_tiling,
};

/// Encodes scope information into a source map's `scopes` field.
///
/// Without an input map a minimal v3 map is synthesized, with one null
/// source per top-level scope entry. With one, the map is checked for a
/// matching `sources` length, its `names` table is extended in place
/// (existing entries keep their indices), and the encoded stream replaces
/// any previous `scopes` value.
pub fn encode(info: &ScopeInfo, input_map: Option<SourceMapJson>) -> Result<SourceMapJson> {
    let mut map = match input_map {
        Some(map) => {
            if map.sources.len() != info.scopes.len() {
                return Err(Error::input(format!(
                    "source map carries {} source(s) but the scope info covers {}",
                    map.sources.len(),
                    info.scopes.len()
                )));
            }
            map
        }
        None => SourceMapJson::with_source_count(info.scopes.len()),
    };

    let names = map.names.take().unwrap_or_default();
    let (scopes, names) = ScopesEncoder::new(info, names).finish()?;
    map.names = Some(names);
    map.scopes = Some(scopes);
    Ok(map)
}

/// One-shot stream producer. Walks the scope forest, then the range
/// forest, emitting comma-separated items while the differential state
/// records track the previously encoded positions and indices.
struct ScopesEncoder<'a> {
    info: &'a ScopeInfo,
    names: Vec<String>,
    name_indices: FxHashMap<String, u32>,
    out: String,
    item_count: usize,
    /// Pre-order number of every emitted scope, indexed by arena id.
    scope_numbers: Vec<Option<u32>>,
    next_scope_number: u32,
    scope_state: ScopeState,
    range_state: RangeState,
}

impl<'a> ScopesEncoder<'a> {
    fn new(info: &'a ScopeInfo, names: Vec<String>) -> Self {
        let name_indices = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index as u32))
            .collect();
        Self {
            info,
            names,
            name_indices,
            out: String::new(),
            item_count: 0,
            scope_numbers: vec![None; info.scope_nodes.len()],
            next_scope_number: 0,
            scope_state: ScopeState::default(),
            range_state: RangeState::default(),
        }
    }

    fn finish(mut self) -> Result<(String, Vec<String>)> {
        for entry in &self.info.scopes {
            match entry {
                None => self.begin_item(),
                Some(id) => {
                    self.scope_state = ScopeState::default();
                    self.encode_scope(*id)?;
                }
            }
        }
        for &id in &self.info.ranges {
            self.range_state = RangeState::default();
            self.encode_range(id)?;
        }
        Ok((self.out, self.names))
    }

    fn encode_scope(&mut self, id: ScopeId) -> Result<()> {
        let scope = self
            .info
            .get_scope(id)
            .ok_or_else(|| Error::reference("scope id does not belong to this info"))?;

        self.check_scope_order(scope.start)?;

        // Interning order (kind before name) fixes the order of first
        // appearance in `names`; the payload still carries name, then kind.
        let kind_index = scope.kind.as_deref().map(|kind| self.intern(kind));
        let name_index = scope.name.as_deref().map(|name| self.intern(name));

        let mut flags = ScopeFlags::default();
        if name_index.is_some() {
            flags |= ScopeFlags::HAS_NAME;
        }
        if kind_index.is_some() {
            flags |= ScopeFlags::HAS_KIND;
        }
        if scope.is_stack_frame {
            flags |= ScopeFlags::IS_STACK_FRAME;
        }

        self.begin_item();
        encode_unsigned_vlq(Tag::OriginalScopeStart.into(), &mut self.out);
        encode_unsigned_vlq(flags.bits(), &mut self.out);
        encode_unsigned_vlq(u64::from(scope.start.line - self.scope_state.line), &mut self.out);
        encode_unsigned_vlq(u64::from(scope.start.column), &mut self.out);
        if let Some(index) = name_index {
            encode_signed_vlq(i64::from(index) - self.scope_state.name, &mut self.out);
            self.scope_state.name = i64::from(index);
        }
        if let Some(index) = kind_index {
            encode_signed_vlq(i64::from(index) - self.scope_state.kind, &mut self.out);
            self.scope_state.kind = i64::from(index);
        }
        self.scope_state.line = scope.start.line;
        self.scope_state.column = scope.start.column;

        self.scope_numbers[id.0] = Some(self.next_scope_number);
        self.next_scope_number += 1;

        if !scope.variables.is_empty() {
            self.begin_item();
            encode_unsigned_vlq(Tag::OriginalScopeVariables.into(), &mut self.out);
            for variable in &scope.variables {
                let index = i64::from(self.intern(variable));
                encode_signed_vlq(index - self.scope_state.variable, &mut self.out);
                self.scope_state.variable = index;
            }
        }

        for &child in &scope.children {
            self.encode_scope(child)?;
        }

        self.check_scope_order(scope.end)?;
        self.begin_item();
        encode_unsigned_vlq(Tag::OriginalScopeEnd.into(), &mut self.out);
        encode_unsigned_vlq(u64::from(scope.end.line - self.scope_state.line), &mut self.out);
        encode_unsigned_vlq(u64::from(scope.end.column), &mut self.out);
        self.scope_state.line = scope.end.line;
        self.scope_state.column = scope.end.column;
        Ok(())
    }

    fn encode_range(&mut self, id: RangeId) -> Result<()> {
        let range = self
            .info
            .get_range(id)
            .ok_or_else(|| Error::reference("range id does not belong to this info"))?;

        self.check_range_order(range.start)?;

        let definition = match range.original_scope {
            Some(scope_id) => Some(self.scope_number(scope_id)?),
            None => None,
        };

        let line_delta = range.start.line - self.range_state.line;
        let mut flags = RangeFlags::default();
        if line_delta > 0 {
            flags |= RangeFlags::HAS_LINE;
        }
        if definition.is_some() {
            flags |= RangeFlags::HAS_DEFINITION;
        }
        if range.is_stack_frame {
            flags |= RangeFlags::IS_STACK_FRAME;
        }
        if range.is_hidden {
            flags |= RangeFlags::IS_HIDDEN;
        }

        self.begin_item();
        encode_unsigned_vlq(Tag::GeneratedRangeStart.into(), &mut self.out);
        encode_unsigned_vlq(flags.bits(), &mut self.out);
        if line_delta > 0 {
            encode_unsigned_vlq(u64::from(line_delta), &mut self.out);
            encode_unsigned_vlq(u64::from(range.start.column), &mut self.out);
        } else {
            encode_unsigned_vlq(
                u64::from(range.start.column - self.range_state.column),
                &mut self.out,
            );
        }
        if let Some(number) = definition {
            encode_signed_vlq(number - self.range_state.def_scope, &mut self.out);
            self.range_state.def_scope = number;
        }
        self.range_state.line = range.start.line;
        self.range_state.column = range.start.column;

        if !range.values.is_empty() {
            self.encode_bindings(range.start, range.end, range.original_scope, &range.values)?;
        }

        if let Some(site) = range.call_site {
            self.begin_item();
            encode_unsigned_vlq(Tag::GeneratedRangeCallSite.into(), &mut self.out);
            let (d_source, line_field, column_field) = self.range_state.call_site_deltas(&site);
            encode_signed_vlq(d_source, &mut self.out);
            encode_signed_vlq(line_field, &mut self.out);
            encode_signed_vlq(column_field, &mut self.out);
        }

        for &child in &range.children {
            self.encode_range(child)?;
        }

        self.check_range_order(range.end)?;
        self.begin_item();
        encode_unsigned_vlq(Tag::GeneratedRangeEnd.into(), &mut self.out);
        if range.end.line == self.range_state.line {
            encode_unsigned_vlq(
                u64::from(range.end.column - self.range_state.column),
                &mut self.out,
            );
        } else {
            encode_unsigned_vlq(
                u64::from(range.end.line - self.range_state.line),
                &mut self.out,
            );
            encode_unsigned_vlq(u64::from(range.end.column), &mut self.out);
        }
        self.range_state.line = range.end.line;
        self.range_state.column = range.end.column;
        Ok(())
    }

    /// Emits the bindings item (one value per variable; a sub-range entry
    /// contributes its first piece) followed by one sub-range item per
    /// remaining piece, ordered by position so the deltas stay unsigned.
    fn encode_bindings(
        &mut self,
        start: Position,
        end: Position,
        original_scope: Option<ScopeId>,
        values: &[Binding],
    ) -> Result<()> {
        let scope_id = original_scope.ok_or_else(|| {
            Error::semantic("range carries value bindings but no definition scope")
        })?;
        let variables = self
            .info
            .get_scope(scope_id)
            .map(|scope| scope.variables.len())
            .unwrap_or(0);
        if values.len() != variables {
            return Err(Error::semantic(format!(
                "range carries {} value binding(s) but its definition scope declares {} variable(s)",
                values.len(),
                variables
            )));
        }
        for binding in values {
            if let Binding::SubRanges(parts) = binding {
                validate_sub_range_tiling(start, end, parts)?;
            }
        }

        self.begin_item();
        encode_unsigned_vlq(Tag::GeneratedRangeBindings.into(), &mut self.out);
        for binding in values {
            let index = match binding {
                Binding::Unavailable => -1,
                Binding::Expression(expression) => i64::from(self.intern(expression)),
                Binding::SubRanges(parts) => match &parts[0].value {
                    Some(expression) => i64::from(self.intern(expression)),
                    None => -1,
                },
            };
            encode_signed_vlq(index, &mut self.out);
        }

        let mut tail_parts: Vec<(usize, &SubRangeBinding)> = Vec::new();
        for (variable_index, binding) in values.iter().enumerate() {
            if let Binding::SubRanges(parts) = binding {
                // A sole piece is emitted too, anchored at the range
                // start; the bindings value alone would decode as atomic.
                let tail = if parts.len() == 1 { &parts[..] } else { &parts[1..] };
                for part in tail {
                    tail_parts.push((variable_index, part));
                }
            }
        }
        tail_parts.sort_by_key(|(_, part)| part.from);

        let mut anchor = start;
        for (variable_index, part) in tail_parts {
            let value_index = match &part.value {
                Some(expression) => i64::from(self.intern(expression)),
                None => -1,
            };
            self.begin_item();
            encode_unsigned_vlq(Tag::GeneratedRangeSubRangeBinding.into(), &mut self.out);
            encode_unsigned_vlq(variable_index as u64, &mut self.out);
            encode_signed_vlq(value_index, &mut self.out);
            let line_delta = part.from.line - anchor.line;
            encode_unsigned_vlq(u64::from(line_delta), &mut self.out);
            if line_delta > 0 {
                encode_unsigned_vlq(u64::from(part.from.column), &mut self.out);
            } else {
                encode_unsigned_vlq(u64::from(part.from.column - anchor.column), &mut self.out);
            }
            anchor = part.from;
        }
        Ok(())
    }

    fn begin_item(&mut self) {
        if self.item_count > 0 {
            self.out.push(',');
        }
        self.item_count += 1;
    }

    fn intern(&mut self, text: &str) -> u32 {
        if let Some(&index) = self.name_indices.get(text) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(text.to_owned());
        self.name_indices.insert(text.to_owned(), index);
        index
    }

    fn scope_number(&self, id: ScopeId) -> Result<i64> {
        self.scope_numbers
            .get(id.0)
            .copied()
            .flatten()
            .map(i64::from)
            .ok_or_else(|| Error::reference("unknown OriginalScope for definition"))
    }

    fn check_scope_order(&self, position: Position) -> Result<()> {
        let previous = Position::new(self.scope_state.line, self.scope_state.column);
        if position < previous {
            return Err(Error::semantic(format!(
                "scope position {}:{} precedes the previously encoded position {}:{}",
                position.line, position.column, previous.line, previous.column
            )));
        }
        Ok(())
    }

    fn check_range_order(&self, position: Position) -> Result<()> {
        let previous = Position::new(self.range_state.line, self.range_state.column);
        if position < previous {
            return Err(Error::semantic(format!(
                "range position {}:{} precedes the previously encoded position {}:{}",
                position.line, position.column, previous.line, previous.column
            )));
        }
        Ok(())
    }
}
