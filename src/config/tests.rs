use super::*;

#[test]
fn test_default_compute() {
    let config = KernelConfig::default_compute();
    assert_eq!(config.group_size, [8, 8, 1]);
    assert!(!config.wave32);
    assert_eq!(config.bindless_space_base, 99);
    assert!(config.emit_resources);
    assert_eq!(KernelConfig::default(), config);
}

#[test]
fn test_resolve_default() {
    let config = KernelConfig::resolve("default").unwrap();
    assert_eq!(config, KernelConfig::default_compute());
}

#[test]
fn test_resolve_rejects_path_traversal() {
    assert!(KernelConfig::resolve("../etc/passwd").is_err());
    assert!(KernelConfig::resolve("./sneaky").is_err());
    assert!(KernelConfig::resolve("foo/bar").is_err());
    assert!(KernelConfig::resolve(".hidden").is_err());
}

#[test]
fn test_resolve_unknown() {
    let err = KernelConfig::resolve("no_such_kernel_config").unwrap_err();
    assert!(err.message.contains("unknown kernel config"));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("denoise.toml");
    std::fs::write(
        &path,
        r#"
# denoiser settings
[kernel]
name = "denoise"
group_size = [16, 8, 1]
wave32 = true
bindless_space_base = 40
emit_resources = false
"#,
    )
    .unwrap();

    let config = KernelConfig::load(&path).unwrap();
    assert_eq!(config.name, "denoise");
    assert_eq!(config.group_size, [16, 8, 1]);
    assert!(config.wave32);
    assert_eq!(config.bindless_space_base, 40);
    assert!(!config.emit_resources);
}

#[test]
fn test_load_keeps_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "[kernel]\nname = \"ao\"\n").unwrap();
    let config = KernelConfig::load(&path).unwrap();
    assert_eq!(config.name, "ao");
    assert_eq!(config.group_size, [8, 8, 1]);
    assert_eq!(config.bindless_space_base, DEFAULT_BINDLESS_SPACE);
}

#[test]
fn test_load_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[kernel]\ngroup_size = [8, 8]\n").unwrap();
    let err = KernelConfig::load(&path).unwrap_err();
    assert!(err.message.contains("group_size"));

    std::fs::write(&path, "[kernel]\nwave32 = yes\n").unwrap();
    assert!(KernelConfig::load(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let err = KernelConfig::load(Path::new("/nonexistent/kernel.toml")).unwrap_err();
    assert!(err.message.contains("cannot read kernel config"));
}
