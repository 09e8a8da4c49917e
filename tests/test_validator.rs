//! Integration tests for annotation validation.
//!
//! Tests cover:
//! - Boxes that fit, touch the edge, or leave the image
//! - Malformed lines and unreadable images
//! - Relative image paths and blank lines
//! - Turning a failed validation into an error

mod common;

use cascadelab::annotation::{validate, validate_with};
use common::*;

fn store_with(dir: &std::path::Path, content: &str) -> AnnotationStore {
    let path = dir.join("positives.txt");
    std::fs::write(&path, content).expect("Failed to write annotation file");
    AnnotationStore::new(path)
}

#[test]
fn test_boxes_inside_and_on_the_edge_are_valid() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = write_image(dir.path(), "img.png", 20, 20);
    let img = cascadelab::dataset::absolute_slash_path(&img)?;
    let store = store_with(
        dir.path(),
        &format!("{img} 2 0 0 20 20 5 5 10 10\n"),
    );

    let result = validate(&store)?;
    assert!(result.is_ok(), "unexpected issues: {:?}", result.errors);
    assert_eq!(result.lines_checked, 1);

    Ok(())
}

#[test]
fn test_out_of_bounds_box_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = write_image(dir.path(), "img.png", 20, 20);
    let img = cascadelab::dataset::absolute_slash_path(&img)?;
    let store = store_with(
        dir.path(),
        &format!("{img} 1 0 0 10 10\n{img} 2 0 0 10 10 15 15 10 10\n"),
    );

    let result = validate(&store)?;
    assert_eq!(
        result.errors,
        vec![ValidationIssue {
            line: 2,
            reason: IssueReason::OutOfBounds {
                bbox: BoundingBox::new(15, 15, 10, 10),
                width: 20,
                height: 20,
            },
        }]
    );

    Ok(())
}

#[test]
fn test_one_issue_per_bad_box() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = write_image(dir.path(), "small.png", 12, 12);
    let img = cascadelab::dataset::absolute_slash_path(&img)?;
    let store = store_with(dir.path(), &format!("{img} 2 0 0 13 5 5 5 5 8\n"));

    let result = validate(&store)?;
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.line == 1));
    assert!(
        result
            .errors
            .iter()
            .all(|e| matches!(e.reason, IssueReason::OutOfBounds { width: 12, height: 12, .. }))
    );

    Ok(())
}

#[test]
fn test_malformed_and_missing_are_reported_and_checking_continues() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let img = write_image(dir.path(), "img.png", 20, 20);
    let img = cascadelab::dataset::absolute_slash_path(&img)?;
    let content = format!(
        "{img} 2 0 0 5 5\n\n/nowhere/missing.png 1 0 0 5 5\n{img} 1 0 0 5 5\n"
    );
    let store = store_with(dir.path(), &content);

    let result = validate(&store)?;
    assert_eq!(result.lines_checked, 3);
    assert_eq!(result.errors.len(), 2);

    assert_eq!(result.errors[0].line, 1);
    assert!(matches!(result.errors[0].reason, IssueReason::MalformedLine(_)));

    // Blank line 2 is skipped but still counted for numbering
    assert_eq!(result.errors[1].line, 3);
    assert!(matches!(result.errors[1].reason, IssueReason::InvalidImage(_)));

    Ok(())
}

#[test]
fn test_misnamed_image_is_read_by_its_contents() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    // PNG bytes under a .jpg name
    let png = write_image(dir.path(), "photo.png", 20, 20);
    let misnamed = dir.path().join("photo.jpg");
    std::fs::rename(&png, &misnamed)?;

    // The annotator can open it...
    assert!(cascadelab::dataset::open_image(&misnamed).is_ok());
    assert_eq!(
        cascadelab::annotation::validator::image_file_dimensions(&misnamed)?,
        (20, 20)
    );

    // ...so validation must accept it too
    let img = cascadelab::dataset::absolute_slash_path(&misnamed)?;
    let store = store_with(dir.path(), &format!("{img} 1 0 0 10 10\n"));
    let result = validate(&store)?;
    assert!(result.is_ok(), "unexpected issues: {:?}", result.errors);

    Ok(())
}

#[test]
fn test_relative_paths_resolve_against_store_dir() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_image(dir.path(), "rel.png", 30, 10);
    let store = store_with(dir.path(), "rel.png 1 0 0 30 11\n");

    let result = validate(&store)?;
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors[0].reason,
        IssueReason::OutOfBounds { width: 30, height: 10, .. }
    ));

    Ok(())
}

#[test]
fn test_validate_with_custom_dimensions() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = store_with(dir.path(), "/virtual/a.png 1 90 0 20 20\n");

    let mut looked_up = Vec::new();
    let result = validate_with(&store, |path| {
        looked_up.push(path.to_path_buf());
        Ok((100, 100))
    })?;

    assert_eq!(looked_up, vec![std::path::PathBuf::from("/virtual/a.png")]);
    assert_eq!(result.errors.len(), 1);

    Ok(())
}

#[test]
fn test_into_result_halts_on_errors() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = store_with(dir.path(), "bad line\n");

    let err = validate(&store)?.into_result().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ValidationFailed { errors: 1 })
    ));

    let clean = store_with(dir.path(), "");
    assert!(validate(&clean)?.into_result().is_ok());

    Ok(())
}
