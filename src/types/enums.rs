#![allow(missing_docs)]

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Item kinds of the scopes stream. Every item opens with one of these as
/// an unsigned VLQ; values outside the table belong to future revisions
/// and are skipped wholesale on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum Tag {
    OriginalScopeStart = 0x1,
    OriginalScopeEnd = 0x2,
    OriginalScopeVariables = 0x3,
    GeneratedRangeStart = 0x5,
    GeneratedRangeEnd = 0x6,
    GeneratedRangeBindings = 0x7,
    GeneratedRangeSubRangeBinding = 0x8,
    GeneratedRangeCallSite = 0x9,
}

bitflags! {
    /// Flag bits of an original-scope start item. Unknown bits are
    /// tolerated on decode and the corresponding fields keep their
    /// defaults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScopeFlags: u64 {
        const HAS_NAME = 0x1;
        const HAS_KIND = 0x2;
        const IS_STACK_FRAME = 0x4;
    }
}

bitflags! {
    /// Flag bits of a generated-range start item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RangeFlags: u64 {
        const HAS_LINE = 0x1;
        const HAS_DEFINITION = 0x2;
        const IS_STACK_FRAME = 0x4;
        const IS_HIDDEN = 0x8;
    }
}
