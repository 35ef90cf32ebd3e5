//! Unit tests for CLI commands.

use super::*;
use std::fs;

use cairn_core::utils::hash::hash_bytes;
use cairn_core::HashAlgorithm;
use cairn_store::FsStore;
use tempfile::TempDir;

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Context rooted in `temp_dir` that never reads the real global config
fn create_test_context(temp_dir: &TempDir) -> CommandContext {
    let cwd = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("utf-8 temp dir");
    CommandContext {
        loader: ConfigLoader::new(cwd.clone()).with_home(None),
        cwd,
        output: crate::output::OutputHandler::new(),
        overrides: HashMap::new(),
    }
}

fn write_tree(root: &std::path::Path) {
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("nested").join("b.txt"), "hello").unwrap();
    fs::write(root.join("c.txt"), "world").unwrap();
}

#[test]
fn test_parse_overrides() {
    let parsed = parse_overrides(&[
        "archiver.contains-batch-size=20".to_string(),
        " store.path = /tmp/store ".to_string(),
    ])
    .unwrap();

    assert_eq!(parsed["archiver.contains-batch-size"], "20");
    assert_eq!(parsed["store.path"], "/tmp/store");
}

#[test]
fn test_parse_overrides_rejects_missing_value() {
    assert!(parse_overrides(&["archiver.contains-batch-size".to_string()]).is_err());
    assert!(parse_overrides(&["=20".to_string()]).is_err());
}

#[tokio::test]
async fn test_archive_writes_content_to_store() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_tree(&temp_dir.path().join("data"));

    let request = archive::ArchiveRequest {
        paths: vec!["data".into()],
        ..Default::default()
    };
    archive::execute(request, &ctx).await.unwrap();

    let store_root = ctx.cwd.join(".cairn").join("store");
    let store = FsStore::new(&store_root, HashAlgorithm::Blake3).unwrap();
    let hello = hash_bytes(HashAlgorithm::Blake3, b"hello");
    let world = hash_bytes(HashAlgorithm::Blake3, b"world");
    assert!(store.contains_digest(&hello.digest));
    assert!(store.contains_digest(&world.digest));
    assert_eq!(store.get(&hello.digest).await.unwrap(), b"hello");
}

#[tokio::test]
async fn test_archive_honours_store_flag() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_tree(&temp_dir.path().join("data"));
    let store_root = temp_dir.path().join("elsewhere");

    let request = archive::ArchiveRequest {
        paths: vec![temp_dir.path().join("data")],
        store: Some(store_root.clone()),
        batch_size: Some(1),
        ..Default::default()
    };
    archive::execute(request, &ctx).await.unwrap();

    assert!(store_root.join("index.json").exists());
    assert!(!temp_dir.path().join(".cairn").exists());
}

#[tokio::test]
async fn test_archive_dry_run_leaves_no_store() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_tree(&temp_dir.path().join("data"));

    let request = archive::ArchiveRequest {
        paths: vec!["data".into()],
        dry_run: true,
        ..Default::default()
    };
    archive::execute(request, &ctx).await.unwrap();

    assert!(!temp_dir.path().join(".cairn").exists());
}

#[tokio::test]
async fn test_archive_reports_index_save_failure() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_tree(&temp_dir.path().join("data"));
    // A directory where the index is staged makes saving it fail
    fs::create_dir_all(temp_dir.path().join(".cairn/store/index.json.partial")).unwrap();

    let request = archive::ArchiveRequest {
        paths: vec!["data".into()],
        ..Default::default()
    };
    let err = archive::execute(request, &ctx).await.unwrap_err();
    assert!(matches!(err, CairnError::Io { .. }));
}

#[tokio::test]
async fn test_archive_rejects_zero_workers() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);

    let request = archive::ArchiveRequest {
        paths: vec!["data".into()],
        hash_workers: Some(0),
        dry_run: true,
        ..Default::default()
    };
    let err = archive::execute(request, &ctx).await.unwrap_err();
    assert!(matches!(err, CairnError::ConfigValidation { .. }));
}

#[tokio::test]
async fn test_check_reads_project_file() {
    let temp_dir = create_temp_dir();
    fs::write(
        temp_dir.path().join("cairn.toml"),
        "[archiver]\ncontains-batch-size = 7\n",
    )
    .unwrap();
    let ctx = create_test_context(&temp_dir);

    check::execute(&ctx).await.unwrap();

    let loaded = ctx.load_config(HashMap::new()).await.unwrap();
    assert_eq!(loaded.config.archiver.contains_batch_size, 7);
}

#[tokio::test]
async fn test_check_reports_invalid_project_file() {
    let temp_dir = create_temp_dir();
    fs::write(temp_dir.path().join("cairn.toml"), "[archiver\n").unwrap();
    let ctx = create_test_context(&temp_dir);

    assert!(check::execute(&ctx).await.is_err());
}
