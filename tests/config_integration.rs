use carve::config::{ConfigFlags, MirrorBacking, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".carverc");
    let content = r#"
# comment
--verbose

--batch-delay-ms 40

--backing=scratch
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.verbose);
    assert_eq!(flags.batch_delay_ms, Some(40));
    assert_eq!(flags.backing, Some(MirrorBacking::Scratch));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".carverc");
    let content = "--batch-delay-ms 40\n--autosave-delay-ms 1000\n--backing scratch\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "carve".to_string(),
        "main.rs".to_string(),
        "--batch-delay-ms".to_string(),
        "10".to_string(),
        "--backing=temp-file".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert_eq!(effective.batch_delay_ms, Some(10), "cli should override delay");
    assert_eq!(effective.backing, Some(MirrorBacking::TempFile), "cli should override backing");
    assert_eq!(
        effective.autosave_delay_ms,
        Some(1_000),
        "file config should be preserved when CLI does not override"
    );

    let config = effective.sync_config();
    assert_eq!(config.batch_delay_ms, 10);
    assert_eq!(config.autosave_delay_ms, 1_000);
    assert_eq!(config.extract_debounce_ms, 50);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        verbose: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        poll_interval_ms: Some(5),
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.verbose);
    assert_eq!(merged.poll_interval().as_millis(), 5);
}
