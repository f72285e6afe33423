//! The pipeline against a real directory tree.

mod common;

use common::{fake_pdf, test_settings, FakeExtractor, ScriptedProvider};
use pdf2canvas::{FsVault, Pipeline, Vault};
use serde_json::Value;
use std::fs;
use std::sync::Arc;

fn write(root: &std::path::Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn canvases_land_on_disk_under_category_folders() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Papers/attention.pdf", &fake_pdf("Attention: A Survey\nbody"));
    write(root, "Papers/.hidden/skip.pdf", &fake_pdf("Hidden\nbody"));
    write(root, ".obsidian/cache.pdf", &fake_pdf("Cache\nbody"));
    fs::create_dir_all(root.join("Canvases/Existing")).unwrap();

    let provider = Arc::new(ScriptedProvider::new().with_category("Attention: A Survey", "Existing"));
    let pipeline = Pipeline::new(
        test_settings("Papers", "Canvases"),
        Arc::new(FsVault::new(root)),
        Arc::new(FakeExtractor),
        provider,
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.attempted(), 1);
    assert_eq!(report.succeeded(), 1);

    let canvas_file = root.join("Canvases/Existing/Attention__A_Survey.canvas");
    let canvas: Value = serde_json::from_str(&fs::read_to_string(&canvas_file).unwrap()).unwrap();
    assert_eq!(canvas["nodes"][0]["file"], "Papers/attention.pdf");
    assert_eq!(canvas["nodes"][1]["text"], "Summary of Attention: A Survey");
}

#[tokio::test]
async fn existing_canvas_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "In/paper.pdf", &fake_pdf("Paper\nbody"));
    write(root, "Out/General/Paper.canvas", b"{\"keep\":true}");

    let pipeline = Pipeline::new(
        test_settings("In", "Out"),
        Arc::new(FsVault::new(root)),
        Arc::new(FakeExtractor),
        Arc::new(ScriptedProvider::new()),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(
        fs::read_to_string(root.join("Out/General/Paper.canvas")).unwrap(),
        "{\"keep\":true}"
    );
}

#[tokio::test]
async fn vault_paths_cannot_escape_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let vault = FsVault::new(dir.path().join("vault"));
    fs::create_dir_all(vault.root()).unwrap();

    assert!(vault.read_binary("../secret.pdf").await.is_err());
    assert!(vault.create_file("../escape.canvas", "{}").await.is_err());
    assert!(!dir.path().join("escape.canvas").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_pdfs_are_listed_and_processed() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "store/real.bin", &fake_pdf("Linked Paper\nbody"));
    fs::create_dir_all(root.join("In")).unwrap();
    fs::create_dir_all(root.join("Out")).unwrap();
    symlink(root.join("store/real.bin"), root.join("In/linked.pdf")).unwrap();
    symlink(root.join("missing.pdf"), root.join("In/dangling.pdf")).unwrap();
    // A folder link back to the root must not send the walk in circles.
    symlink(root, root.join("In/loop")).unwrap();

    let vault = FsVault::new(root);
    assert_eq!(
        vault.list_files().await.unwrap(),
        vec!["In/linked.pdf", "store/real.bin"]
    );

    let pipeline = Pipeline::new(
        test_settings("In", "Out"),
        Arc::new(vault),
        Arc::new(FakeExtractor),
        Arc::new(ScriptedProvider::new()),
    );
    let report = pipeline.run().await.unwrap();
    assert_eq!(report.attempted(), 1);
    assert_eq!(
        report.processed().next().unwrap().canvas_path,
        "Out/General/Linked_Paper.canvas"
    );
}
