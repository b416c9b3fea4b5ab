//! Source-location boundary types and coordinate conversion.
//!
//! The external test-file parser reports named blocks with 0-based
//! positions. Hosts that display 1-based coordinates need an explicit
//! conversion at this boundary; keeping it as a function rather than
//! inline arithmetic avoids off-by-one regressions.

/// A 0-based line/column position as reported by the file parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Origin of a file, the coarse anchor for file-level annotations.
    pub const FILE_START: Self = Self { line: 0, column: 0 };
}

/// A half-open named range, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeHint {
    pub start: Position,
    pub end: Position,
}

impl RangeHint {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at the start of a file.
    ///
    /// The structured payload carries no per-assertion line numbers, so
    /// file-level annotations anchor here.
    pub const FILE_START: Self = Self {
        start: Position::FILE_START,
        end: Position::FILE_START,
    };
}

/// One named test block located by the external file parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBlock {
    pub name: String,
    pub start: Position,
    pub end: Position,
}

/// A decoration anchored at a block, with the block name as hover text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDecoration {
    pub range: RangeHint,
    pub hover: String,
}

/// Convert a 0-based parser position to 1-based display coordinates.
#[must_use]
pub fn to_display_position(pos: Position) -> Position {
    Position {
        line: pos.line + 1,
        column: pos.column + 1,
    }
}

/// Build decorations marking each block's leading keyword.
///
/// Styling is file-level only: the runner payload carries no per-block
/// pass/fail data, so decorations only carry the block name for hover.
#[must_use]
pub fn block_start_decorations(blocks: &[TestBlock]) -> Vec<BlockDecoration> {
    blocks
        .iter()
        .map(|block| BlockDecoration {
            range: RangeHint {
                start: block.start,
                end: Position {
                    line: block.start.line,
                    column: block.start.column + 2,
                },
            },
            hover: block.name.clone(),
        })
        .collect()
}
