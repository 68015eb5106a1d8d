use rulesync_fs::{NormalizedPath, RobustnessConfig, io};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("nested/rules/test.md"));

    io::write_atomic(&path, b"hello world", RobustnessConfig::default()).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.md");
    fs::write(&file_path, "original content that is longer").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::write_atomic(&path, b"updated", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("test.md"));
    io::write_atomic(&path, b"content", RobustnessConfig::default()).unwrap();

    let entries: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["test.md".to_string()]);
}

#[test]
fn test_read_text_nonexistent_file() {
    let path = NormalizedPath::new("/nonexistent/file.md");
    assert!(io::read_text(&path).is_err());
    assert!(io::read_bytes(&path).is_err());
}

#[test]
fn test_remove_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("gone.md");
    fs::write(&file_path, "x").unwrap();

    io::remove_file(&NormalizedPath::new(&file_path), RobustnessConfig::default()).unwrap();
    assert!(!file_path.exists());
}

#[test]
fn test_remove_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.md"));
    assert!(io::remove_file(&path, RobustnessConfig::default()).is_err());
}

#[test]
fn test_probe_writable_walks_to_existing_ancestor() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("not/yet/created.md"));
    assert!(io::probe_writable(&path).is_ok());
}

#[test]
fn test_probe_writable_rejects_file_ancestor() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("blocker"), "x").unwrap();
    let path = NormalizedPath::new(temp.path().join("blocker/child.md"));
    assert!(io::probe_writable(&path).is_err());
}

#[test]
#[cfg(unix)]
fn test_write_atomic_rejects_symlink_in_path() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let real_dir = dir.path().join("real");
    fs::create_dir(&real_dir).unwrap();
    let link = dir.path().join("link");
    symlink(&real_dir, &link).unwrap();

    let through_link = NormalizedPath::new(link.join("file.md"));
    let result = io::write_atomic(&through_link, b"content", RobustnessConfig::default());

    assert!(result.is_err(), "Should reject writes through symlinks");
    assert!(!real_dir.join("file.md").exists());
}
