use crate::constants::*;
use crate::types::*;
use regex::Regex;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a sort key is derived from the pattern match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum KeyMode {
    /// First digit run of the match, `-1` when absent
    #[default]
    Numeric,
    /// The matched text itself
    RawText,
    /// No key; documents keep their scan order
    None,
}

/// Sort direction for the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_descending(self) -> bool {
        self == SortDirection::Descending
    }
}

/// Appearance of substituted text
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextStyle {
    pub font_size: f32,
    /// Shift from the masked box's bottom edge to the baseline
    pub baseline_offset: f32,
    /// Standard 14 base font name
    pub font_name: String,
    pub color: Rgb,
    /// Fill painted over the placeholder before inserting text
    pub mask_fill: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: REPLACEMENT_FONT_SIZE,
            baseline_offset: REPLACEMENT_BASELINE_OFFSET,
            font_name: REPLACEMENT_FONT.to_string(),
            color: Rgb::BLACK,
            mask_fill: Rgb::WHITE,
        }
    }
}

/// Sorting and substitution configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SortOptions {
    /// Source pages per logical document
    pub group_size: usize,

    // Keying
    pub pattern: Option<String>,
    pub key_mode: KeyMode,
    pub direction: SortDirection,

    // Substitution
    pub placeholder: Option<String>,
    pub replacement_style: TextStyle,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            group_size: 1,
            pattern: None,
            key_mode: KeyMode::Numeric,
            direction: SortDirection::Ascending,
            placeholder: None,
            replacement_style: TextStyle::default(),
        }
    }
}

impl SortOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| SortError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SortError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(SortError::Config(
                "Pages per document must be at least 1".to_string(),
            ));
        }

        self.compile_pattern()?;

        let style = &self.replacement_style;
        if !(style.font_size.is_finite() && style.font_size > 0.0) {
            return Err(SortError::Config(format!(
                "Replacement font size must be positive, got {}",
                style.font_size
            )));
        }
        if style.font_name.is_empty() {
            return Err(SortError::Config(
                "Replacement font name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Compile the sort pattern. An absent or empty pattern yields `None`.
    pub fn compile_pattern(&self) -> Result<Option<Regex>> {
        match self.pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern)
                .map(Some)
                .map_err(|e| SortError::Config(format!("Invalid sort pattern: {}", e))),
        }
    }

    /// Placeholder token, treating an empty string as absent
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref().filter(|p| !p.is_empty())
    }
}

/// A complete file-to-file sort job
#[derive(Debug, Clone, PartialEq)]
pub struct SortRequest {
    pub input_path: PathBuf,
    /// Destination; derived from the input path when absent
    pub output_path: Option<PathBuf>,
    pub replacements_path: Option<PathBuf>,
    pub options: SortOptions,
}

impl SortRequest {
    pub fn new(input_path: impl Into<PathBuf>, options: SortOptions) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            replacements_path: None,
            options,
        }
    }

    /// Resolved output path
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.input_path))
    }

    /// Check everything that can fail before processing starts
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        if !self.input_path.is_file() {
            return Err(SortError::Config(format!(
                "Input PDF not found: {}",
                self.input_path.display()
            )));
        }
        if self.output_path() == self.input_path {
            return Err(SortError::Config(
                "Output path must differ from the input path".to_string(),
            ));
        }
        Ok(())
    }
}

/// `report.pdf` -> `report-sorted.pdf`, next to the input
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{extension}"))
}
