use std::fs;

use casemap_core::merge::{merge_fragments, MergeError, CANONICAL_FILE, FRAGMENT_DELIMITER};

#[test]
fn fragments_merge_in_lexicographic_order() {
    let root = tempfile::tempdir().expect("tempdir");
    let dir = root.path().join("v1.2.0");
    fs::create_dir(&dir).expect("version dir");
    fs::write(dir.join("b.md"), "B").expect("b");
    fs::write(dir.join("a.md"), "A").expect("a");

    let report = merge_fragments(root.path(), "v1.2.0").expect("merge");
    let merged = fs::read_to_string(dir.join(CANONICAL_FILE)).expect("output");

    assert!(merged.starts_with("# v1.2.0 Test Cases\n\n"));
    let a = merged.find('A').expect("A present");
    let b = merged.find('B').expect("B present");
    assert!(a < b);
    assert!(merged.contains(&format!("A{FRAGMENT_DELIMITER}B")));
    assert_eq!(report.fragments, vec!["a.md".to_string(), "b.md".to_string()]);
    assert_eq!(report.bytes, merged.len());
}

#[test]
fn rerunning_merge_is_byte_identical() {
    let root = tempfile::tempdir().expect("tempdir");
    let dir = root.path().join("v1");
    fs::create_dir(&dir).expect("version dir");
    fs::write(dir.join("01-login.md"), "## Login\n\n- [TC-1] ok\n").expect("login");
    fs::write(dir.join("02-pay.md"), "## Pay\n\n- [TC-2] ok\n").expect("pay");

    merge_fragments(root.path(), "v1").expect("first merge");
    let first = fs::read(dir.join(CANONICAL_FILE)).expect("first");
    merge_fragments(root.path(), "v1").expect("second merge");
    let second = fs::read(dir.join(CANONICAL_FILE)).expect("second");

    assert_eq!(first, second);
}

#[test]
fn missing_version_directory_fails_without_writing() {
    let root = tempfile::tempdir().expect("tempdir");
    let err = merge_fragments(root.path(), "v9").expect_err("missing dir");

    assert!(matches!(err, MergeError::VersionNotFound { .. }));
    assert!(err.to_string().contains("v9"));
    assert!(!root.path().join("v9").exists());
}

#[test]
fn no_temporary_file_is_left_behind() {
    let root = tempfile::tempdir().expect("tempdir");
    let dir = root.path().join("v1");
    fs::create_dir(&dir).expect("version dir");
    fs::write(dir.join("a.md"), "A").expect("a");

    merge_fragments(root.path(), "v1").expect("merge");
    let mut names: Vec<String> = fs::read_dir(&dir)
        .expect("list")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["_index.md".to_string(), "a.md".to_string()]);
}
