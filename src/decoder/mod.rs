//! Streaming parser for the scopes item stream.
//!
//! The decoder splits the stream on commas and parses one item at a time,
//! rebuilding the trees through the permissive [`ScopeInfoBuilder`] so
//! decoded arena ids land in the same pre-order the encoder numbers
//! scopes with. Unknown tags and trailing fields of known tags are
//! skipped, which keeps the parser forward-compatible with future
//! revisions of the grammar.

use smallvec::SmallVec;

use crate::builder::{RangeOptions, ScopeInfoBuilder, ScopeOptions};
use crate::encoding::TokenIterator;
use crate::encoding::state::{RangeState, ScopeState};
use crate::error::{Error, Result};
use crate::sourcemap::SourceMapJson;
use crate::types::{
    Binding, OriginalPosition, Position, RangeFlags, ScopeFlags, ScopeId, ScopeInfo,
    SubRangeBinding, Tag,
};

/// Upper bound on the `values` padding a sub-range binding item can force
/// through its variable index.
const MAX_BINDING_VARIABLES: u64 = 1 << 16;

/// Decoder strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Structural and reference problems are reported as errors.
    Strict,
    /// Structural and reference problems are recovered: orphan items are
    /// dropped, unresolvable indices decode to defaults, and trees left
    /// open at the end of input are discarded.
    #[default]
    Lax,
}

/// Options accepted by [`decode`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Decoder strictness; defaults to [`DecodeMode::Lax`].
    pub mode: DecodeMode,
    /// Offset added to the generated positions of a plain map. Ignored
    /// for index maps, whose sections carry their own offsets.
    pub generated_offset: Position,
}

/// Decodes the `scopes` field of a source map into a [`ScopeInfo`].
///
/// A map without a `scopes` field decodes to an empty info. For an index
/// map, every section is decoded with the section's offset applied to its
/// generated positions and the results are concatenated in section order.
pub fn decode(map: &SourceMapJson, options: DecodeOptions) -> Result<ScopeInfo> {
    if let Some(sections) = &map.sections {
        let mut combined = ScopeInfo::default();
        for section in sections {
            let inner = decode(
                &section.map,
                DecodeOptions {
                    mode: options.mode,
                    generated_offset: section.offset,
                },
            )?;
            combined.append(inner);
        }
        return Ok(combined);
    }

    let names = map.names.as_deref().unwrap_or(&[]);
    let scopes = map.scopes.as_deref().unwrap_or("");
    let mut info = ScopesDecoder::new(options.mode, names).decode(scopes)?;
    info.shift_generated(options.generated_offset);
    Ok(info)
}

/// One-shot stream consumer.
struct ScopesDecoder<'a> {
    mode: DecodeMode,
    names: &'a [String],
    builder: ScopeInfoBuilder,
    scope_state: ScopeState,
    range_state: RangeState,
    /// Position of the most recent sub-range binding per open range,
    /// parallel to the open-range stack; starts at the range's start.
    binding_anchors: Vec<Position>,
}

impl<'a> ScopesDecoder<'a> {
    fn new(mode: DecodeMode, names: &'a [String]) -> Self {
        Self {
            mode,
            names,
            builder: ScopeInfoBuilder::new(),
            scope_state: ScopeState::default(),
            range_state: RangeState::default(),
            binding_anchors: Vec::new(),
        }
    }

    fn decode(mut self, input: &str) -> Result<ScopeInfo> {
        if !input.is_empty() {
            for item in input.split(',') {
                self.decode_item(item)?;
            }
        }
        if self.builder.open_scope_count() > 0 {
            self.recover(Error::structure("scope left open at end of input"))?;
        }
        if self.builder.open_range_count() > 0 {
            self.recover(Error::structure("range left open at end of input"))?;
        }
        Ok(self.builder.build())
    }

    fn decode_item(&mut self, item: &str) -> Result<()> {
        if item.is_empty() {
            self.builder.add_null_scope();
            return Ok(());
        }
        let mut iter = TokenIterator::new(item);
        let tag_value = iter.next_unsigned_vlq()?;
        if let Ok(tag) = Tag::try_from(tag_value) {
            match tag {
                Tag::OriginalScopeStart => self.scope_start(&mut iter)?,
                Tag::OriginalScopeEnd => self.scope_end(&mut iter)?,
                Tag::OriginalScopeVariables => self.scope_variables(&mut iter)?,
                Tag::GeneratedRangeStart => self.range_start(&mut iter)?,
                Tag::GeneratedRangeEnd => self.range_end(&mut iter)?,
                Tag::GeneratedRangeBindings => self.range_bindings(&mut iter)?,
                Tag::GeneratedRangeSubRangeBinding => self.sub_range_binding(&mut iter)?,
                Tag::GeneratedRangeCallSite => self.call_site(&mut iter)?,
            }
        }
        drain(&mut iter)
    }

    fn scope_start(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let flags = ScopeFlags::from_bits_truncate(iter.next_unsigned_vlq()?);
        let line_delta = iter.next_unsigned_vlq()?;
        let column = saturating_u32(iter.next_unsigned_vlq()?);

        let name = if flags.contains(ScopeFlags::HAS_NAME) {
            self.scope_state.name += iter.next_signed_vlq()?;
            Some(self.resolve_name(self.scope_state.name, "scope name")?)
        } else {
            None
        };
        let kind = if flags.contains(ScopeFlags::HAS_KIND) {
            self.scope_state.kind += iter.next_signed_vlq()?;
            Some(self.resolve_name(self.scope_state.kind, "scope kind")?)
        } else {
            None
        };

        let line = self.scope_state.line.saturating_add(saturating_u32(line_delta));
        self.scope_state.line = line;
        self.scope_state.column = column;
        self.builder.start_scope(
            line,
            column,
            ScopeOptions {
                name,
                kind,
                is_stack_frame: flags.contains(ScopeFlags::IS_STACK_FRAME),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn scope_variables(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        if self.builder.open_scope_count() == 0 {
            return self.recover(Error::structure("variables item outside an open scope"));
        }
        let mut variables = Vec::new();
        while iter.has_next() {
            self.scope_state.variable += iter.next_signed_vlq()?;
            variables.push(self.resolve_name(self.scope_state.variable, "variable name")?);
        }
        if let Some(scope) = self.builder.current_scope_node_mut() {
            scope.variables.extend(variables);
        }
        Ok(())
    }

    fn scope_end(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let line_delta = iter.next_unsigned_vlq()?;
        let column = saturating_u32(iter.next_unsigned_vlq()?);
        if self.builder.open_scope_count() == 0 {
            return self.recover(Error::structure("unmatched scope end item"));
        }
        let line = self.scope_state.line.saturating_add(saturating_u32(line_delta));
        self.scope_state.line = line;
        self.scope_state.column = column;
        self.builder.end_scope(line, column);
        if self.builder.open_scope_count() == 0 {
            self.scope_state = ScopeState::default();
        }
        Ok(())
    }

    fn range_start(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let flags = RangeFlags::from_bits_truncate(iter.next_unsigned_vlq()?);
        let (line, column) = if flags.contains(RangeFlags::HAS_LINE) {
            let line_delta = iter.next_unsigned_vlq()?;
            let column = saturating_u32(iter.next_unsigned_vlq()?);
            (
                self.range_state.line.saturating_add(saturating_u32(line_delta)),
                column,
            )
        } else {
            let column_delta = iter.next_unsigned_vlq()?;
            (
                self.range_state.line,
                self.range_state.column.saturating_add(saturating_u32(column_delta)),
            )
        };

        let original_scope = if flags.contains(RangeFlags::HAS_DEFINITION) {
            self.range_state.def_scope += iter.next_signed_vlq()?;
            self.resolve_definition(self.range_state.def_scope)?
        } else {
            None
        };

        self.range_state.line = line;
        self.range_state.column = column;
        self.builder.start_range(
            line,
            column,
            RangeOptions {
                scope: original_scope,
                is_stack_frame: flags.contains(RangeFlags::IS_STACK_FRAME),
                is_hidden: flags.contains(RangeFlags::IS_HIDDEN),
                ..Default::default()
            },
        );
        self.binding_anchors.push(Position::new(line, column));
        Ok(())
    }

    fn range_end(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let mut fields: SmallVec<[u64; 2]> = SmallVec::new();
        while iter.has_next() {
            fields.push(iter.next_unsigned_vlq()?);
        }
        let (line, column) = match fields.as_slice() {
            [] => {
                return Err(Error::input("unexpected end of input while decoding a VLQ"));
            }
            [column_delta] => (
                self.range_state.line,
                self.range_state.column.saturating_add(saturating_u32(*column_delta)),
            ),
            [line_delta, column, ..] => (
                self.range_state.line.saturating_add(saturating_u32(*line_delta)),
                saturating_u32(*column),
            ),
        };
        if self.builder.open_range_count() == 0 {
            return self.recover(Error::structure("unmatched range end item"));
        }

        // Close the trailing sub-range of every converted binding.
        let end = Position::new(line, column);
        if let Some(range) = self.builder.current_range_mut() {
            for binding in &mut range.values {
                if let Binding::SubRanges(parts) = binding {
                    if let Some(last) = parts.last_mut() {
                        last.to = end;
                    }
                }
            }
        }

        self.range_state.line = line;
        self.range_state.column = column;
        self.builder.end_range(line, column);
        self.binding_anchors.pop();
        if self.builder.open_range_count() == 0 {
            self.range_state = RangeState::default();
        }
        Ok(())
    }

    fn range_bindings(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        if self.builder.open_range_count() == 0 {
            return self.recover(Error::structure("bindings item outside an open range"));
        }
        let mut values = Vec::new();
        while iter.has_next() {
            let index = iter.next_signed_vlq()?;
            values.push(if index == -1 {
                Binding::Unavailable
            } else {
                Binding::Expression(self.resolve_name(index, "binding")?)
            });
        }
        if let Some(range) = self.builder.current_range_mut() {
            range.values.extend(values);
        }
        Ok(())
    }

    fn sub_range_binding(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let variable = iter.next_unsigned_vlq()?;
        let value_index = iter.next_signed_vlq()?;
        let line_delta = iter.next_unsigned_vlq()?;
        let column_field = saturating_u32(iter.next_unsigned_vlq()?);

        if self.builder.open_range_count() == 0 {
            return self.recover(Error::structure(
                "sub-range binding item outside an open range",
            ));
        }
        if variable >= MAX_BINDING_VARIABLES {
            return self.recover(Error::reference(format!(
                "sub-range binding variable index {variable} is out of range"
            )));
        }
        let variable = variable as usize;

        let value = if value_index == -1 {
            None
        } else {
            Some(self.resolve_name(value_index, "binding")?)
        };

        let anchor = *self
            .binding_anchors
            .last()
            .expect("anchor stack parallels the open-range stack");
        let from = if line_delta > 0 {
            Position::new(
                anchor.line.saturating_add(saturating_u32(line_delta)),
                column_field,
            )
        } else {
            Position::new(anchor.line, anchor.column.saturating_add(column_field))
        };
        *self.binding_anchors.last_mut().expect("checked above") = from;

        let already_converted = matches!(
            self.builder
                .current_range()
                .and_then(|range| range.values.get(variable)),
            Some(Binding::SubRanges(_))
        );
        if already_converted {
            self.recover(Error::structure(format!(
                "duplicate sub-range binding for variable {variable}"
            )))?;
            if let Some(Binding::SubRanges(parts)) = self
                .builder
                .current_range_mut()
                .and_then(|range| range.values.get_mut(variable))
            {
                if let Some(last) = parts.last_mut() {
                    last.to = from;
                }
                // `to` is patched by the next item or the range end.
                parts.push(SubRangeBinding {
                    value,
                    from,
                    to: from,
                });
            }
            return Ok(());
        }

        let range_start = self
            .builder
            .current_range()
            .map(|range| range.start)
            .expect("open range checked above");
        if let Some(range) = self.builder.current_range_mut() {
            if range.values.len() <= variable {
                range.values.resize(variable + 1, Binding::Unavailable);
            }
            let previous = std::mem::take(&mut range.values[variable]);
            let mut parts = Vec::new();
            // An item anchored at the range start replaces the atomic
            // value outright; a leading piece there would be empty.
            if from != range_start {
                let first_value = match previous {
                    Binding::Unavailable => None,
                    Binding::Expression(expression) => Some(expression),
                    Binding::SubRanges(_) => None,
                };
                parts.push(SubRangeBinding {
                    value: first_value,
                    from: range_start,
                    to: from,
                });
            }
            // `to` is patched by the next item or the range end.
            parts.push(SubRangeBinding {
                value,
                from,
                to: from,
            });
            range.values[variable] = Binding::SubRanges(parts);
        }
        Ok(())
    }

    fn call_site(&mut self, iter: &mut TokenIterator<'_>) -> Result<()> {
        let d_source = iter.next_signed_vlq()?;
        let line_field = iter.next_signed_vlq()?;
        let column_field = iter.next_signed_vlq()?;
        if self.builder.open_range_count() == 0 {
            return self.recover(Error::structure("call-site item outside an open range"));
        }
        let (source, line, column) =
            self.range_state
                .apply_call_site(d_source, line_field, column_field);
        self.builder.set_range_call_site(OriginalPosition::new(
            clamp_u32(source),
            clamp_u32(line),
            clamp_u32(column),
        ));
        Ok(())
    }

    /// Resolves an index into the `names` table, substituting the empty
    /// string in LAX mode.
    fn resolve_name(&self, index: i64, what: &str) -> Result<String> {
        if index >= 0 {
            if let Some(name) = self.names.get(index as usize) {
                return Ok(name.clone());
            }
        }
        self.substitute(
            Error::reference(format!(
                "{what} index {index} is outside the names table (length {})",
                self.names.len()
            )),
            String::new(),
        )
    }

    /// Resolves a definition-scope number against the scopes decoded so
    /// far, substituting `None` in LAX mode.
    fn resolve_definition(&self, index: i64) -> Result<Option<ScopeId>> {
        if index >= 0 && (index as usize) < self.builder.scope_node_count() {
            return Ok(Some(ScopeId(index as usize)));
        }
        self.substitute(
            Error::reference(format!(
                "definition scope index {index} does not identify a decoded scope"
            )),
            None,
        )
    }

    /// Central mode dispatch: STRICT reports, LAX drops.
    fn recover(&self, error: Error) -> Result<()> {
        self.substitute(error, ())
    }

    /// Central mode dispatch: STRICT reports, LAX substitutes `default`.
    fn substitute<T>(&self, error: Error, default: T) -> Result<T> {
        match self.mode {
            DecodeMode::Strict => Err(error),
            DecodeMode::Lax => {
                tracing::debug!(%error, "recovering from a damaged scopes item");
                Ok(default)
            }
        }
    }
}

/// Consumes and discards the trailing VLQs of an item.
fn drain(iter: &mut TokenIterator<'_>) -> Result<()> {
    while iter.has_next() {
        iter.next_unsigned_vlq()?;
    }
    Ok(())
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
