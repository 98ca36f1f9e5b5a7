use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use pdf_async_runtime::*;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

fn write_test_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for text in pages {
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
            Operation::new(
                "Tj",
                vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];
        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(pages.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc.save(path).unwrap();
}

fn start_worker() -> (
    mpsc::UnboundedSender<PdfCommand>,
    mpsc::UnboundedReceiver<PdfUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(command_rx, update_tx));
    (command_tx, update_rx)
}

/// Collect updates up to and including the next final one
async fn updates_until_final(update_rx: &mut mpsc::UnboundedReceiver<PdfUpdate>) -> Vec<PdfUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = update_rx.recv().await {
        let done = update.is_final();
        updates.push(update);
        if done {
            break;
        }
    }
    updates
}

fn sort_options() -> SortOptions {
    SortOptions {
        pattern: Some(r"Doc \d+".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_run_reports_progress_then_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    write_test_pdf(&input, &["Doc 2", "Doc 1"]);

    let (command_tx, mut update_rx) = start_worker();
    command_tx
        .send(PdfCommand::SortRun {
            request: SortRequest::new(&input, sort_options()),
            cancel: CancelToken::new(),
        })
        .unwrap();

    let updates = updates_until_final(&mut update_rx).await;
    let progress = updates
        .iter()
        .filter(|u| matches!(u, PdfUpdate::Progress { .. }))
        .count();
    assert_eq!(progress, 4);

    match updates.last() {
        Some(PdfUpdate::SortComplete { summary }) => {
            assert_eq!(summary.document_count, 2);
            assert_eq!(summary.output_path, dir.path().join("scan-sorted.pdf"));
            assert!(summary.output_path.exists());
        }
        other => panic!("Expected SortComplete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    write_test_pdf(&input, &["Doc 2", "Doc 1"]);

    let cancel = CancelToken::new();
    cancel.cancel();

    let (command_tx, mut update_rx) = start_worker();
    command_tx
        .send(PdfCommand::SortRun {
            request: SortRequest::new(&input, sort_options()),
            cancel,
        })
        .unwrap();

    let updates = updates_until_final(&mut update_rx).await;
    assert!(matches!(updates.last(), Some(PdfUpdate::SortCancelled)));
    assert!(!dir.path().join("scan-sorted.pdf").exists());
}

#[tokio::test]
async fn test_missing_replacements_is_error() {
    let (command_tx, mut update_rx) = start_worker();
    command_tx
        .send(PdfCommand::SortLoadReplacements {
            path: PathBuf::from("/definitely/not/here.csv"),
        })
        .unwrap();

    let updates = updates_until_final(&mut update_rx).await;
    assert!(matches!(updates.last(), Some(PdfUpdate::Error { .. })));
}

#[tokio::test]
async fn test_queued_plans_keep_latest() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    write_test_pdf(&first, &["Doc 1"]);
    write_test_pdf(&second, &["Doc 9", "Doc 3", "Doc 5"]);

    let (command_tx, mut update_rx) = start_worker();
    for path in [&first, &second] {
        command_tx
            .send(PdfCommand::SortPlan {
                input_path: path.clone(),
                options: sort_options(),
            })
            .unwrap();
    }
    drop(command_tx);

    let mut planned = Vec::new();
    while let Some(update) = update_rx.recv().await {
        if let PdfUpdate::SortPlanned {
            input_path,
            documents,
        } = update
        {
            planned.push((input_path, documents));
        }
    }

    assert_eq!(planned.len(), 1);
    let (path, documents) = &planned[0];
    assert_eq!(path, &second);
    let ordinals: Vec<_> = documents.iter().map(|d| d.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 0]);
}

#[tokio::test]
async fn test_load_config_and_replacements() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sort.json");
    let options = SortOptions {
        group_size: 2,
        ..sort_options()
    };
    options.save(&config).await.unwrap();
    let csv = dir.path().join("names.csv");
    std::fs::write(&csv, "Alice\nBob\n").unwrap();

    let (command_tx, mut update_rx) = start_worker();
    command_tx
        .send(PdfCommand::SortLoadConfig { path: config })
        .unwrap();
    command_tx
        .send(PdfCommand::SortLoadReplacements { path: csv.clone() })
        .unwrap();

    match updates_until_final(&mut update_rx).await.last() {
        Some(PdfUpdate::SortConfigLoaded { options: loaded }) => assert_eq!(loaded, &options),
        other => panic!("Expected SortConfigLoaded, got {other:?}"),
    }
    match updates_until_final(&mut update_rx).await.last() {
        Some(PdfUpdate::SortReplacementsLoaded { path, values }) => {
            assert_eq!(path, &csv);
            assert_eq!(values, &vec!["Alice".to_string(), "Bob".to_string()]);
        }
        other => panic!("Expected SortReplacementsLoaded, got {other:?}"),
    }
}
