pub mod constants;
pub mod document;
mod key;
mod options;
mod order;
mod pipeline;
mod progress;
mod rebuild;
mod replacements;
mod segment;
mod types;

pub use document::{OutputDocument, PageSink, PageSource, SourceDocument};
pub use key::{extract_key, first_digit_run};
pub use options::*;
pub use order::order;
pub use pipeline::{RunOutput, plan, plan_file, run, sort_document, sort_file};
pub use progress::{CancelToken, Phase, Progress};
pub use replacements::{load_replacements, parse_replacements, read_replacements};
pub use segment::segment;
pub use types::*;
