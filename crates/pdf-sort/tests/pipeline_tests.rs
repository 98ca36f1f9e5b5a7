mod common;

use common::*;
use pdf_sort::*;
use std::sync::{Arc, Mutex};

fn options(group_size: usize, pattern: &str) -> SortOptions {
    SortOptions {
        group_size,
        pattern: Some(pattern.to_string()),
        ..Default::default()
    }
}

fn run_lopdf(
    source: &SourceDocument,
    options: &SortOptions,
    replacements: &[String],
) -> Result<RunOutput<OutputDocument>> {
    run(
        source,
        OutputDocument::new(),
        options,
        replacements,
        &mut no_progress(),
        &CancelToken::new(),
    )
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// In-memory primitives
// =============================================================================

struct FakeSource {
    pages: Vec<String>,
}

impl FakeSource {
    fn new(pages: &[&str]) -> Self {
        Self {
            pages: strings(pages),
        }
    }
}

impl PageSource for FakeSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(SortError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }
}

#[derive(Default)]
struct FakeSink {
    pages: Vec<String>,
    /// Fail the append call with this index
    fail_append: Option<usize>,
    /// Report every append as landing at the start
    misreport: bool,
    appends: usize,
    masked: Vec<usize>,
    inserted: Vec<(usize, String)>,
}

impl PageSource for FakeSink {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        Ok(self.pages[index].clone())
    }
}

impl PageSink for FakeSink {
    type Source = FakeSource;

    fn append_pages(&mut self, source: &FakeSource, range: PageRange) -> Result<PageRange> {
        let call = self.appends;
        self.appends += 1;
        if self.fail_append == Some(call) {
            return Err(SortError::Content("disk full".to_string()));
        }

        let start = self.pages.len();
        self.pages.extend_from_slice(&source.pages[range.start..range.end]);
        if self.misreport {
            Ok(PageRange::new(0, range.len()))
        } else {
            Ok(PageRange::new(start, self.pages.len()))
        }
    }

    fn find_occurrences(&self, page: usize, literal: &str) -> Result<Vec<BoundingBox>> {
        Ok(self.pages[page]
            .match_indices(literal)
            .map(|(i, m)| BoundingBox::new(i as f32, 0.0, (i + m.len()) as f32, 10.0))
            .collect())
    }

    fn mask(&mut self, page: usize, _area: BoundingBox, _fill: Rgb) -> Result<()> {
        self.masked.push(page);
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: usize,
        _origin: (f32, f32),
        text: &str,
        _style: &TextStyle,
    ) -> Result<()> {
        self.inserted.push((page, text.to_string()));
        Ok(())
    }
}

fn run_fake(
    source: &FakeSource,
    sink: FakeSink,
    options: &SortOptions,
    replacements: &[String],
) -> Result<RunOutput<FakeSink>> {
    run(
        source,
        sink,
        options,
        replacements,
        &mut no_progress(),
        &CancelToken::new(),
    )
}

// =============================================================================
// Pipeline over fakes
// =============================================================================

#[test]
fn test_replacements_follow_sorted_position() {
    let source = FakeSource::new(&["Doc 2 NAME", "Doc 3 NAME NAME", "Doc 1 NAME"]);
    let options = SortOptions {
        placeholder: Some("NAME".to_string()),
        ..options(1, r"Doc \d+")
    };

    let result = run_fake(
        &source,
        FakeSink::default(),
        &options,
        &strings(&["first", "second", "third"]),
    )
    .unwrap();

    assert_eq!(result.output.pages, vec!["Doc 1 NAME", "Doc 2 NAME", "Doc 3 NAME NAME"]);
    assert_eq!(
        result.output.inserted,
        vec![
            (0, "first".to_string()),
            (1, "second".to_string()),
            (2, "third".to_string()),
            (2, "third".to_string()),
        ]
    );
    assert_eq!(result.output.masked, vec![0, 1, 2, 2]);
    assert_eq!(result.substitutions, 4);
}

#[test]
fn test_short_replacement_list_leaves_later_documents() {
    let source = FakeSource::new(&["Doc 1 NAME", "Doc 2 NAME", "Doc 3 NAME"]);
    let options = SortOptions {
        placeholder: Some("NAME".to_string()),
        ..options(1, r"Doc \d+")
    };

    let result = run_fake(&source, FakeSink::default(), &options, &strings(&["only"])).unwrap();
    assert_eq!(result.output.inserted, vec![(0, "only".to_string())]);
    assert_eq!(result.substitutions, 1);
}

#[test]
fn test_no_placeholder_means_no_edits() {
    let source = FakeSource::new(&["Doc 1 NAME"]);
    let result = run_fake(
        &source,
        FakeSink::default(),
        &options(1, r"Doc \d+"),
        &strings(&["unused"]),
    )
    .unwrap();
    assert!(result.output.inserted.is_empty());
    assert_eq!(result.substitutions, 0);
}

#[test]
fn test_append_failure_names_document() {
    let source = FakeSource::new(&["Doc 2", "x", "Doc 1", "y"]);
    let sink = FakeSink {
        fail_append: Some(1),
        ..Default::default()
    };

    match run_fake(&source, sink, &options(2, r"Doc \d+"), &[]) {
        Err(SortError::Rebuild { ordinal, range, source }) => {
            // Second in sorted order is the first scanned document
            assert_eq!(ordinal, 0);
            assert_eq!(range, PageRange::new(0, 2));
            assert!(source.to_string().contains("disk full"));
        }
        other => panic!("Expected Rebuild error, got {:?}", other.map(|r| r.documents)),
    }
}

#[test]
fn test_misplaced_append_is_rejected() {
    let source = FakeSource::new(&["Doc 1", "Doc 2"]);
    let sink = FakeSink {
        misreport: true,
        ..Default::default()
    };

    match run_fake(&source, sink, &options(1, r"Doc \d+"), &[]) {
        Err(SortError::Rebuild { ordinal, .. }) => assert_eq!(ordinal, 1),
        other => panic!("Expected Rebuild error, got {:?}", other.map(|r| r.documents)),
    }
}

#[test]
fn test_progress_reports_two_units_per_document() {
    let source = FakeSource::new(&["Doc 3", "Doc 1", "Doc 2"]);
    let mut events = Vec::new();
    let mut record = |p: Progress| events.push(p);

    run(
        &source,
        FakeSink::default(),
        &options(1, r"Doc \d+"),
        &[],
        &mut record,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|p| p.total == 6));
    let completed: Vec<_> = events.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5, 6]);
    assert!(events[..3].iter().all(|p| p.phase == Phase::Scanning));
    assert!(events[3..].iter().all(|p| p.phase == Phase::Rebuilding));
    assert_eq!(events[5].fraction(), 1.0);
}

#[test]
fn test_cancelled_run_produces_nothing() {
    let source = FakeSource::new(&["Doc 1", "Doc 2"]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = run(
        &source,
        FakeSink::default(),
        &options(1, r"Doc \d+"),
        &[],
        &mut no_progress(),
        &cancel,
    );
    assert!(matches!(result, Err(SortError::Cancelled)));
}

#[test]
fn test_invalid_options_fail_before_work() {
    let source = FakeSource::new(&["Doc 1"]);
    let result = run_fake(&source, FakeSink::default(), &options(0, r"Doc \d+"), &[]);
    assert!(matches!(result, Err(SortError::Config(_))));
}

#[test]
fn test_plan_without_pattern_keeps_scan_order() {
    let source = FakeSource::new(&["b", "a", "c"]);
    let planned = plan(&source, &SortOptions::default()).unwrap();
    let ordinals: Vec<_> = planned.iter().map(|d| d.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    assert!(planned.iter().all(|d| d.sort_key == SortKey::Neutral));
}

/// Pages whose text can never be extracted
struct UnreadableSource(usize);

impl PageSource for UnreadableSource {
    fn page_count(&self) -> usize {
        self.0
    }

    fn page_text(&self, _index: usize) -> Result<String> {
        Err(SortError::Content("no text layer".to_string()))
    }
}

#[test]
fn test_key_mode_none_skips_text_extraction() {
    let source = UnreadableSource(4);
    let no_keys = SortOptions {
        key_mode: KeyMode::None,
        ..options(2, r"Doc \d+")
    };

    let planned = plan(&source, &no_keys).unwrap();
    assert_eq!(planned.len(), 2);
    assert!(planned.iter().all(|d| d.sort_key == SortKey::Neutral));

    // With a key mode the same source fails on the first page
    assert!(plan(&source, &options(2, r"Doc \d+")).is_err());
}

// =============================================================================
// Pipeline over lopdf documents
// =============================================================================

#[test]
fn test_six_page_scenario() {
    let source = create_source(&[
        "Doc 3", "Doc 3 page 2", "Doc 1", "Doc 1 page 2", "Doc 2", "Doc 2 page 2",
    ]);

    let result = run_lopdf(&source, &options(2, r"Doc \d+"), &[]).unwrap();
    assert_eq!(
        all_page_text(&result.output),
        vec!["Doc 1", "Doc 1 page 2", "Doc 2", "Doc 2 page 2", "Doc 3", "Doc 3 page 2"]
    );
    let keys: Vec<_> = result
        .documents
        .iter()
        .map(|d| d.sort_key.as_i128().unwrap())
        .collect();
    assert_eq!(keys, vec![1, 2, 3]);

    let descending = SortOptions {
        direction: SortDirection::Descending,
        ..options(2, r"Doc \d+")
    };
    let result = run_lopdf(&source, &descending, &[]).unwrap();
    assert_eq!(
        all_page_text(&result.output),
        vec!["Doc 3", "Doc 3 page 2", "Doc 2", "Doc 2 page 2", "Doc 1", "Doc 1 page 2"]
    );
}

#[test]
fn test_page_count_round_trip() {
    let pages: Vec<String> = (0..7).map(|i| format!("Doc {}", 7 - i)).collect();
    let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    let source = create_source(&refs);

    let result = run_lopdf(&source, &options(3, r"Doc \d+"), &[]).unwrap();
    let bytes = result.output.to_bytes().unwrap();
    let reloaded = SourceDocument::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.page_count(), 7);
}

#[test]
fn test_missing_keys_sort_first() {
    let source = create_source(&["Doc 2", "no key here", "Doc 1"]);
    let result = run_lopdf(&source, &options(1, r"Doc \d+"), &[]).unwrap();
    assert_eq!(
        all_page_text(&result.output),
        vec!["no key here", "Doc 1", "Doc 2"]
    );
}

#[test]
fn test_substitution_in_pdf() {
    let source = create_source(&["Doc 2\nDear NAME", "Doc 1\nDear NAME"]);
    let options = SortOptions {
        placeholder: Some("NAME".to_string()),
        ..options(1, r"Doc \d+")
    };

    let result = run_lopdf(&source, &options, &strings(&["Alice", "Bob"])).unwrap();
    assert_eq!(result.substitutions, 2);

    let texts = all_page_text(&result.output);
    assert!(texts[0].starts_with("Doc 1"));
    assert!(texts[0].contains("Alice"));
    assert!(texts[1].starts_with("Doc 2"));
    assert!(texts[1].contains("Bob"));
    assert!(texts.iter().all(|t| !t.contains("NAME")));
}

#[test]
fn test_empty_source() {
    let source = create_source(&[]);
    let result = run_lopdf(&source, &options(2, r"Doc \d+"), &[]).unwrap();
    assert!(result.documents.is_empty());
    assert_eq!(result.output.page_count(), 0);
}

// =============================================================================
// File-level job
// =============================================================================

#[tokio::test]
async fn test_sort_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("batch.pdf");
    std::fs::write(
        &input,
        pdf_bytes(&["Doc 2\nHi NAME", "Doc 1\nHi NAME", "Doc 3\nHi NAME"]),
    )
    .unwrap();
    let csv = dir.path().join("names.csv");
    std::fs::write(&csv, "Alice,1\nBob,2\n").unwrap();

    let mut request = SortRequest::new(
        &input,
        SortOptions {
            placeholder: Some("NAME".to_string()),
            ..options(1, r"Doc \d+")
        },
    );
    request.replacements_path = Some(csv);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let summary = sort_file(
        &request,
        move |p| sink.lock().unwrap().push(p),
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.output_path, dir.path().join("batch-sorted.pdf"));
    assert_eq!(summary.document_count, 3);
    assert_eq!(summary.page_count, 3);
    assert_eq!(summary.substitutions, 2);
    assert_eq!(events.lock().unwrap().len(), 6);

    let output = SourceDocument::load(&summary.output_path).await.unwrap();
    let texts = all_page_text(&output);
    assert!(texts[0].starts_with("Doc 1") && texts[0].contains("Alice"));
    assert!(texts[1].starts_with("Doc 2") && texts[1].contains("Bob"));
    assert!(texts[2].starts_with("Doc 3") && texts[2].contains("NAME"));
}

#[tokio::test]
async fn test_sort_file_missing_input() {
    let request = SortRequest::new("/definitely/not/here.pdf", SortOptions::default());
    let result = sort_file(&request, |_| {}, CancelToken::new()).await;
    assert!(matches!(result, Err(SortError::Config(_))));
}

#[tokio::test]
async fn test_sort_file_unreadable_replacements_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    std::fs::write(&input, pdf_bytes(&["Doc 1 NAME"])).unwrap();

    let mut request = SortRequest::new(
        &input,
        SortOptions {
            placeholder: Some("NAME".to_string()),
            ..options(1, r"Doc \d+")
        },
    );
    request.replacements_path = Some(dir.path().join("missing.csv"));

    let summary = sort_file(&request, |_| {}, CancelToken::new()).await.unwrap();
    assert_eq!(summary.substitutions, 0);
    assert!(summary.output_path.exists());
}

#[tokio::test]
async fn test_sort_file_persist_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    std::fs::write(&input, pdf_bytes(&["Doc 1"])).unwrap();

    let mut request = SortRequest::new(&input, SortOptions::default());
    let target = dir.path().join("no-such-dir").join("out.pdf");
    request.output_path = Some(target.clone());

    match sort_file(&request, |_| {}, CancelToken::new()).await {
        Err(SortError::Persist { path, .. }) => assert_eq!(path, target),
        other => panic!("Expected Persist error, got {other:?}"),
    }
    assert!(!target.exists());
}
