//! Integration tests for the annotation file.
//!
//! Tests cover:
//! - The `<path> <count> <x> <y> <w> <h> ...` line format
//! - Truncating rewrites and per-line appends
//! - Blank-line handling and malformed lines on load

mod common;

use common::*;

#[test]
fn test_line_format() {
    let annotation = Annotation::new(
        "/data/pos/a.jpg",
        vec![BoundingBox::new(10, 20, 30, 40), BoundingBox::new(1, 2, 3, 4)],
    );
    assert_eq!(annotation.to_line(), "/data/pos/a.jpg 2 10 20 30 40 1 2 3 4");

    let parsed = Annotation::parse_line("/data/pos/a.jpg 2 10 20 30 40 1 2 3 4").unwrap();
    assert_eq!(parsed, annotation);
}

#[test]
fn test_parse_line_rejects_bad_shapes() {
    // Too few tokens
    assert!(Annotation::parse_line("a.jpg 1 0 0 5").is_err());
    // Leftover coordinates
    assert!(Annotation::parse_line("a.jpg 1 0 0 5 5 9").is_err());
    // Declared count disagrees with the boxes present
    assert!(Annotation::parse_line("a.jpg 2 0 0 5 5").is_err());
    // Non-integer coordinate
    assert!(Annotation::parse_line("a.jpg 1 0 x 5 5").is_err());
    // Negative numbers are not valid pixel coordinates
    assert!(Annotation::parse_line("a.jpg 1 -1 0 5 5").is_err());
    // Zero-size box
    assert!(Annotation::parse_line("a.jpg 1 0 0 0 5").is_err());
}

#[test]
fn test_write_all_truncates_previous_content() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = AnnotationStore::new(dir.path().join("annotations/positives.txt"));

    let first = vec![
        Annotation::new("/p/a.jpg", vec![BoundingBox::new(0, 0, 5, 5)]),
        Annotation::new("/p/b.jpg", vec![BoundingBox::new(1, 1, 5, 5)]),
    ];
    assert_eq!(store.write_all(&first)?, 2);
    assert_eq!(store.load()?, first);

    let second = vec![Annotation::new("/p/c.jpg", vec![BoundingBox::new(2, 2, 5, 5)])];
    assert_eq!(store.write_all(&second)?, 1);

    let content = std::fs::read_to_string(store.path())?;
    assert_eq!(content, "/p/c.jpg 1 2 2 5 5\n");
    assert_eq!(store.load()?, second);

    Ok(())
}

#[test]
fn test_records_reload_in_written_order() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = AnnotationStore::new(dir.path().join("positives.txt"));

    let records = vec![
        Annotation::new(
            "/p/zebra.png",
            vec![BoundingBox::new(4, 4, 8, 8), BoundingBox::new(0, 0, 2, 3)],
        ),
        Annotation::new("/p/apple.png", vec![BoundingBox::new(1, 2, 3, 4)]),
        Annotation::new(
            "/p/mango.png",
            vec![
                BoundingBox::new(10, 10, 5, 5),
                BoundingBox::new(20, 0, 6, 7),
                BoundingBox::new(0, 20, 9, 1),
            ],
        ),
    ];
    assert_eq!(store.write_all(&records)?, 3);

    let loaded = store.load()?;
    assert_eq!(loaded, records);
    let paths: Vec<&str> = loaded.iter().map(|a| a.image_path.as_str()).collect();
    assert_eq!(paths, vec!["/p/zebra.png", "/p/apple.png", "/p/mango.png"]);
    assert_eq!(loaded[2].boxes[1], BoundingBox::new(20, 0, 6, 7));
    assert_eq!(store.count_samples()?, 3);

    Ok(())
}

#[test]
fn test_writer_keeps_completed_lines() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = AnnotationStore::new(dir.path().join("positives.txt"));

    let mut writer = store.create()?;
    writer.append(&Annotation::new("/p/a.jpg", vec![BoundingBox::new(0, 0, 5, 5)]))?;

    // Flushed per line, so the file is readable while the writer is alive
    assert_eq!(store.count_samples()?, 1);
    assert_eq!(writer.written(), 1);

    Ok(())
}

#[test]
fn test_blank_lines_are_ignored() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("positives.txt");
    std::fs::write(&path, "/p/a.jpg 1 0 0 5 5\n\n   \n/p/b.jpg 1 1 1 4 4\n")?;
    let store = AnnotationStore::new(&path);

    assert_eq!(store.count_samples()?, 2);
    let loaded = store.load()?;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].image_path, "/p/b.jpg");

    Ok(())
}

#[test]
fn test_malformed_line_reports_line_number() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("positives.txt");
    std::fs::write(&path, "/p/a.jpg 1 0 0 5 5\n/p/b.jpg 3 0 0 5 5\n")?;
    let store = AnnotationStore::new(&path);

    let err = store.load().unwrap_err();
    match kind_of(&err) {
        Some(PipelineError::MalformedAnnotationLine { line, .. }) => assert_eq!(*line, 2),
        other => panic!("Expected MalformedAnnotationLine, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_store_locations() {
    let store = AnnotationStore::new("annotations/positives.txt");
    assert_eq!(store.file_name(), "positives.txt");
    assert_eq!(store.dir(), std::path::PathBuf::from("annotations"));

    let bare = AnnotationStore::new("positives.txt");
    assert_eq!(bare.dir(), std::path::PathBuf::from("."));
}
