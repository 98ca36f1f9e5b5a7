#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pdf_sort::*;

/// Build a PDF with one page per entry; each line of an entry is shown
/// 20pt below the previous one in 12pt Helvetica.
pub fn create_text_pdf(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.7");

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let contents = pages
        .iter()
        .map(|text| {
            let lines: Vec<Vec<u8>> = text.lines().map(|l| l.as_bytes().to_vec()).collect();
            text_operations(&lines)
        })
        .collect();
    assemble_pdf(doc, font_id, contents)
}

/// Operations showing each string on its own line in font `F1`
pub fn text_operations(lines: &[Vec<u8>]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(0), Object::Integer(-20)],
            ));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(line.clone(), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Add a page per operation list, all sharing `font_id` as resource `F1`
pub fn assemble_pdf(mut doc: Document, font_id: ObjectId, contents: Vec<Vec<Operation>>) -> Document {
    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    // Create pages array
    let mut kids = Vec::new();
    for operations in contents {
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
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    // Create pages dict
    let count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    // Create catalog
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn create_source(pages: &[&str]) -> SourceDocument {
    SourceDocument::from_document(create_text_pdf(pages))
}

pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = create_text_pdf(pages);
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

/// Text of every page of `doc`
pub fn all_page_text<S: PageSource>(doc: &S) -> Vec<String> {
    (0..doc.page_count())
        .map(|i| doc.page_text(i).unwrap())
        .collect()
}

pub fn no_progress() -> impl FnMut(Progress) {
    |_| {}
}
