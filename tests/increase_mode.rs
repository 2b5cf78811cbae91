use lopdf::{Document, Object, Stream, dictionary};
use pdf_squeeze::increase::{increase, find_startxref};
use std::path::{Path, PathBuf};

fn minimal_pdf(dir: &Path) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Stream::new(dictionary! {}, b"BT 72 712 Td (Hello) Tj ET".to_vec());
    let content_id = doc.add_object(content);
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    let path = dir.join("hello.pdf");
    std::fs::write(&path, buf).unwrap();
    path
}

#[test]
fn padded_pdf_still_parses() {
    let dir = tempfile::tempdir().unwrap();
    let src = minimal_pdf(dir.path());
    let original = std::fs::read(&src).unwrap();
    let target = original.len() as u64 + 200_000;

    let padded = increase(dir.path(), &src, target, true).unwrap();
    assert_eq!(padded.size_bytes, target);

    let bytes = std::fs::read(&padded.artifact).unwrap();
    assert_eq!(bytes.len() as u64, target);
    assert_eq!(&bytes[..original.len()], &original[..]);
    assert!(bytes.ends_with(b"%%EOF\n"));
    assert_eq!(find_startxref(&bytes[bytes.len() - 64..]), find_startxref(&original));
    let longest = bytes[original.len()..]
        .split(|&b| b == b'\n')
        .map(<[u8]>::len)
        .max()
        .unwrap();
    assert!(longest < 255, "padding line of {longest} bytes");

    let doc = Document::load(&padded.artifact).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn tiny_gap_uses_trailing_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let src = minimal_pdf(dir.path());
    let size = std::fs::metadata(&src).unwrap().len();

    let padded = increase(dir.path(), &src, size + 7, true).unwrap();
    assert_eq!(padded.size_bytes, size + 7);
    assert_eq!(padded.padded_bytes, 7);
    assert!(Document::load(&padded.artifact).is_ok());
}

#[test]
fn target_below_size_is_a_plain_copy() {
    let dir = tempfile::tempdir().unwrap();
    let src = minimal_pdf(dir.path());
    let original = std::fs::read(&src).unwrap();

    let padded = increase(dir.path(), &src, 10, true).unwrap();
    assert_eq!(padded.padded_bytes, 0);
    assert_eq!(padded.size_bytes, original.len() as u64);
    assert_eq!(std::fs::read(&padded.artifact).unwrap(), original);
}

#[test]
fn non_pdf_input_is_padded_without_verification() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("blob.pdf");
    std::fs::write(&src, b"not really a pdf").unwrap();

    let padded = increase(dir.path(), &src, 4096, true).unwrap();
    let bytes = std::fs::read(&padded.artifact).unwrap();
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.starts_with(b"not really a pdf"));
}
