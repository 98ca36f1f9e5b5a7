use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("Content stream error: {0}")]
    Content(String),
    #[error("Replacement list {path} is unreadable: {reason}")]
    ReplacementSource { path: PathBuf, reason: String },
    #[error("Failed to rebuild document #{ordinal} (pages {range}): {source}")]
    Rebuild {
        ordinal: usize,
        range: PageRange,
        #[source]
        source: Box<SortError>,
    },
    #[error("Failed to save {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<SortError>,
    },
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SortError>;

/// Half-open page interval `[start, end)` over a document's page indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Check that the range is non-empty and lies within `0..page_count`
    pub fn check_within(&self, page_count: usize) -> Result<()> {
        if self.is_empty() {
            return Err(SortError::Content(format!("empty page range {self}")));
        }
        if self.end > page_count {
            return Err(SortError::PageOutOfRange {
                index: self.end - 1,
                count: page_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Unbounded non-negative integer kept as its decimal digits.
///
/// Leading zeros are stripped on construction so ordering can compare
/// length first and digits second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericKey {
    digits: String,
}

impl NumericKey {
    /// Build from a run of ASCII digits. Returns `None` for empty or non-digit input.
    pub fn from_digits(run: &str) -> Option<Self> {
        if run.is_empty() || !run.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = run.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        Some(Self {
            digits: digits.to_string(),
        })
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl Ord for NumericKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl PartialOrd for NumericKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NumericKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Sort key extracted from a document's first page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// No extraction attempted; every neutral key compares equal
    #[default]
    Neutral,
    /// Sentinel `-1`: the pattern did not match, or the match held no digits
    Missing,
    /// First digit run of the match
    Number(NumericKey),
    /// Raw matched text
    Text(String),
}

impl SortKey {
    /// Numeric view of the key, with the sentinel as `-1`.
    /// `None` for neutral and text keys, and for numbers beyond `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            SortKey::Missing => Some(-1),
            SortKey::Number(n) => n.digits().parse().ok(),
            SortKey::Neutral | SortKey::Text(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SortKey::Missing)
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Neutral => 0,
            SortKey::Missing => 1,
            SortKey::Number(_) => 2,
            SortKey::Text(_) => 3,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // One key mode per run, so mixed kinds only meet here by mistake;
            // ranking them keeps the order total.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Neutral => f.write_str("-"),
            SortKey::Missing => f.write_str("-1"),
            SortKey::Number(n) => write!(f, "{n}"),
            SortKey::Text(t) => write!(f, "{t:?}"),
        }
    }
}

/// One logical sub-document: a page range of the source plus its sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    /// Position in the original scan order (0-based)
    pub ordinal: usize,
    pub range: PageRange,
    pub sort_key: SortKey,
}

impl DocumentDescriptor {
    pub fn new(ordinal: usize, range: PageRange) -> Self {
        Self {
            ordinal,
            range,
            sort_key: SortKey::Neutral,
        }
    }

    pub fn with_key(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn page_count(&self) -> usize {
        self.range.len()
    }
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left, y up)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Lower-left corner
    pub fn origin(&self) -> (f32, f32) {
        (self.x0, self.y0)
    }
}

/// RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
}

/// Summary of a completed sort job
#[derive(Debug, Clone, PartialEq)]
pub struct SortSummary {
    pub output_path: PathBuf,
    pub document_count: usize,
    pub page_count: usize,
    /// Number of placeholder occurrences replaced
    pub substitutions: usize,
}
