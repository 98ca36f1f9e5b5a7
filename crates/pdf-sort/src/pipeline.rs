//! The sort pipeline: segment, key, order, rebuild
//!
//! [`run`] works against the [`PageSource`]/[`PageSink`] traits and is fully
//! synchronous. [`sort_document`] and [`sort_file`] wrap it for async callers,
//! running the CPU-bound part on a blocking thread.

use crate::document::{OutputDocument, PageSink, PageSource, SourceDocument};
use crate::key::extract_key;
use crate::options::{KeyMode, SortOptions, SortRequest};
use crate::order::order;
use crate::progress::{CancelToken, Phase, Progress, ProgressTracker};
use crate::rebuild::{Substitution, rebuild};
use crate::replacements::load_replacements;
use crate::segment::segment;
use crate::types::*;

/// Result of a pipeline run
#[derive(Debug)]
pub struct RunOutput<K> {
    pub output: K,
    /// Descriptors in output order
    pub documents: Vec<DocumentDescriptor>,
    /// Placeholder occurrences replaced
    pub substitutions: usize,
}

/// Segment `source` and extract a key for each document, in scan order
fn scan<S: PageSource + ?Sized>(
    source: &S,
    options: &SortOptions,
    tracker: &mut ProgressTracker<'_>,
    cancel: &CancelToken,
) -> Result<Vec<DocumentDescriptor>> {
    let pattern = options.compile_pattern()?;
    let mut descriptors = segment(source.page_count(), options.group_size)?;

    for descriptor in &mut descriptors {
        cancel.check()?;

        // Without a pattern, or with keys switched off, no page text is needed
        let key = match &pattern {
            Some(regex) if options.key_mode != KeyMode::None => {
                let text = source.page_text(descriptor.range.start)?;
                extract_key(&text, Some(regex), options.key_mode)
            }
            _ => SortKey::Neutral,
        };
        log::debug!(
            "Document #{} (pages {}): key {}",
            descriptor.ordinal,
            descriptor.range,
            key
        );
        descriptor.sort_key = key;

        tracker.advance(Phase::Scanning);
    }

    Ok(descriptors)
}

/// Compute the output order without building anything
pub fn plan<S: PageSource + ?Sized>(
    source: &S,
    options: &SortOptions,
) -> Result<Vec<DocumentDescriptor>> {
    options.validate()?;

    let mut ignore = |_: Progress| {};
    let total = source.page_count().div_ceil(options.group_size);
    let mut tracker = ProgressTracker::new(&mut ignore, total);

    let descriptors = scan(source, options, &mut tracker, &CancelToken::new())?;
    Ok(order(descriptors, options.direction))
}

/// Load a PDF and compute its output order
pub async fn plan_file(
    path: impl AsRef<std::path::Path>,
    options: &SortOptions,
) -> Result<Vec<DocumentDescriptor>> {
    options.validate()?;

    let source = SourceDocument::load(path).await?;
    let options = options.clone();
    tokio::task::spawn_blocking(move || plan(&source, &options)).await?
}

/// Sort the documents of `source` into `sink`.
///
/// Progress is reported once per document per phase. On error the sink is
/// dropped, so partial output never escapes.
pub fn run<K: PageSink>(
    source: &K::Source,
    mut sink: K,
    options: &SortOptions,
    replacements: &[String],
    on_progress: &mut dyn FnMut(Progress),
    cancel: &CancelToken,
) -> Result<RunOutput<K>> {
    options.validate()?;

    let document_count = source.page_count().div_ceil(options.group_size);
    let mut tracker = ProgressTracker::new(on_progress, document_count * 2);

    log::info!(
        "Scanning {} pages as {} documents of {} page(s)",
        source.page_count(),
        document_count,
        options.group_size
    );
    let descriptors = scan(source, options, &mut tracker, cancel)?;

    let missing = descriptors.iter().filter(|d| d.sort_key.is_missing()).count();
    if missing > 0 {
        log::info!("{} document(s) had no key and sort as -1", missing);
    }

    let ordered = order(descriptors, options.direction);

    let placeholder = options.placeholder();
    if placeholder.is_some() && replacements.len() != ordered.len() {
        log::info!(
            "{} replacement values for {} documents; documents past the end keep their placeholder",
            replacements.len(),
            ordered.len()
        );
    }

    log::info!("Rebuilding {} documents", ordered.len());
    let substitution = Substitution {
        placeholder,
        replacements,
        style: &options.replacement_style,
    };
    let substitutions = rebuild(
        source,
        &ordered,
        &substitution,
        &mut sink,
        &mut tracker,
        cancel,
    )?;

    log::info!(
        "Built {} pages, {} placeholder(s) replaced",
        sink.page_count(),
        substitutions
    );

    Ok(RunOutput {
        output: sink,
        documents: ordered,
        substitutions,
    })
}

/// Run the pipeline on a blocking thread, consuming `source`
pub async fn sort_document<F>(
    source: SourceDocument,
    options: SortOptions,
    replacements: Vec<String>,
    mut on_progress: F,
    cancel: CancelToken,
) -> Result<RunOutput<OutputDocument>>
where
    F: FnMut(Progress) + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        run(
            &source,
            OutputDocument::new(),
            &options,
            &replacements,
            &mut on_progress,
            &cancel,
        )
    })
    .await?
}

/// Sort a PDF file into a new file.
///
/// Configuration is checked before anything is read. An unreadable
/// replacement list is logged and treated as empty.
pub async fn sort_file<F>(
    request: &SortRequest,
    on_progress: F,
    cancel: CancelToken,
) -> Result<SortSummary>
where
    F: FnMut(Progress) + Send + 'static,
{
    request.validate()?;

    let options = request.options.clone();
    if request.replacements_path.is_some() && options.placeholder().is_none() {
        log::warn!("Replacement list given without a placeholder; it will not be used");
    }

    log::info!("Loading {}", request.input_path.display());
    let source = SourceDocument::load(&request.input_path).await?;

    let replacements = match &request.replacements_path {
        Some(path) => load_replacements(path).await,
        None => Vec::new(),
    };

    let result = sort_document(source, options, replacements, on_progress, cancel).await?;

    let output_path = request.output_path();
    let document_count = result.documents.len();
    let page_count = result.output.page_count();

    log::info!("Saving {}", output_path.display());
    result
        .output
        .save(&output_path)
        .await
        .map_err(|e| SortError::Persist {
            path: output_path.clone(),
            source: Box::new(e),
        })?;

    Ok(SortSummary {
        output_path,
        document_count,
        page_count,
        substitutions: result.substitutions,
    })
}
