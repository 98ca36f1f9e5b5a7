//! Shared constants for sorting and rebuilding
//!
//! This module centralizes the magic numbers used by the text engine
//! and the placeholder substitution.

// =============================================================================
// Replacement Text
// =============================================================================

/// Font size of inserted replacement text (points)
pub const REPLACEMENT_FONT_SIZE: f32 = 10.0;

/// Upward shift from the masked box's bottom edge to the inserted baseline (points)
pub const REPLACEMENT_BASELINE_OFFSET: f32 = 2.0;

/// Standard 14 font used for inserted replacement text
pub const REPLACEMENT_FONT: &str = "Helvetica-Bold";

/// Resource name under which the replacement font is registered on a page
pub const REPLACEMENT_FONT_RESOURCE: &str = "FSortRepl";

// =============================================================================
// Text Layout
// =============================================================================

/// Advance (thousandths of an em) of codes a standard font has no width for
pub const MISSING_GLYPH_WIDTH: f32 = 556.0;

/// Advance of a composite font's glyphs when `/DW` is absent
pub const CID_DEFAULT_WIDTH: f32 = 1000.0;

/// Portion of the font size below the baseline
pub const DESCENT_RATIO: f32 = 0.2;

/// Portion of the font size above the baseline
pub const ASCENT_RATIO: f32 = 0.8;

/// Horizontal gap (in font sizes) that reads as a word break
pub const WORD_GAP_RATIO: f32 = 0.3;

/// Vertical baseline shift (in font sizes) that starts a new line
pub const LINE_BREAK_RATIO: f32 = 0.5;

// =============================================================================
// Output
// =============================================================================

/// Suffix appended to the input file stem when no output path is given
pub const OUTPUT_SUFFIX: &str = "-sorted";

/// Default page dimensions in points (US Letter)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);
