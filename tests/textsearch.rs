//! Keyword search over a real directory tree.

use shop_rag::textsearch::{search_directory, SearchOptions};

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("shop1")).unwrap();
    std::fs::write(
        dir.path().join("shop1/roof.md"),
        "line one\nred roof tile\nline three\nline four\nline five\nline six\nblue tile\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("shop1/notes.txt"), "roof tile in text\n").unwrap();
    std::fs::write(dir.path().join("paint.md"), "no match here\n").unwrap();
    dir
}

#[tokio::test]
async fn test_same_line_found_by_two_keywords_reported_once() {
    let dir = setup();
    let matches = search_directory(dir.path(), &keywords(&["roof", "tile"]), &SearchOptions::default())
        .await
        .unwrap();

    let mut lines: Vec<usize> = matches.iter().map(|m| m.line_number).collect();
    lines.sort();
    assert_eq!(lines, vec![2, 7]);
}

#[tokio::test]
async fn test_context_window_from_options() {
    let dir = setup();
    let opts = SearchOptions {
        context_before: 1,
        context_after: 3,
        ..SearchOptions::default()
    };
    let matches = search_directory(dir.path(), &keywords(&["red"]), &opts).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches[0].context_lines,
        vec!["line one", "red roof tile", "line three", "line four", "line five"]
    );
    assert_eq!(matches[0].matched_line_offset, 1);
}

#[tokio::test]
async fn test_extension_filter() {
    let dir = setup();
    let opts = SearchOptions {
        extensions: vec!["txt".to_string()],
        ..SearchOptions::default()
    };
    let matches = search_directory(dir.path(), &keywords(&["roof"]), &opts).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].file_path.ends_with("notes.txt"));
}

#[tokio::test]
async fn test_single_worker_finds_everything() {
    let dir = setup();
    let opts = SearchOptions {
        max_workers: 1,
        ..SearchOptions::default()
    };
    let matches = search_directory(dir.path(), &keywords(&["tile", "line", "match"]), &opts)
        .await
        .unwrap();

    // 2 tile lines + 5 "line" lines + "no match here"
    assert_eq!(matches.len(), 8);
}

#[tokio::test]
async fn test_blank_keywords_yield_nothing() {
    let dir = setup();
    let matches = search_directory(dir.path(), &keywords(&["", "  "]), &SearchOptions::default())
        .await
        .unwrap();
    assert!(matches.is_empty());
}
