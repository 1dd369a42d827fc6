//! End-to-end scenarios: manifest loading, glob expansion, full project
//! checks against a scratch project directory.

use rzk_cli::parser::{ModuleParser, StubParser};
use rzk_cli::project::{find_project_root, Manifest};
use rzk_kernel::{check_module, Context};
use std::fs;

#[test]
fn new_style_project_checks_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("rzk.yaml"), "include:\n  - \"src/**/*.rzk\"\n").unwrap();
    fs::write(dir.path().join("src/main.rzk"), "# new rzk project\n").unwrap();

    let root = find_project_root(dir.path()).expect("should find the manifest");
    let manifest = Manifest::load(&root).expect("manifest should load");
    let files = manifest.resolve_files(&root).expect("globs should expand");
    assert_eq!(files.len(), 1);

    let parser = StubParser;
    let mut checker = rzk_kernel::Checker::new();
    let mut ctx = Context::new();
    for file in &files {
        let module = parser.parse_module_file(file).expect("stub parser should accept an empty module");
        check_module(&mut checker, &mut ctx, &module.decls).expect("empty module always checks");
    }
}

#[test]
fn manifest_with_no_matching_files_still_checks() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("rzk.yaml"), "include:\n  - \"src/**/*.rzk\"\n").unwrap();

    let manifest = Manifest::load(dir.path()).unwrap();
    let files = manifest.resolve_files(dir.path()).unwrap();
    assert!(files.is_empty());
}

#[test]
fn missing_manifest_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(find_project_root(dir.path()).is_none());
}
