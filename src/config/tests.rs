use super::*;
use crate::checkers::complexity::CHECKER_ID;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn thresholds(options: &CheckerOptions) -> BTreeMap<String, u32> {
    options.get_option("thresholds").unwrap_or_default()
}

#[test]
fn test_normalize_checker_id() {
    assert_eq!(normalize_checker_id("secret-scan"), "secret-scan");
    assert_eq!(normalize_checker_id("cyclomatic_complexity"), "cyclomatic-complexity");
    assert_eq!(normalize_checker_id(" Git_Status "), "git-status");
}

#[test]
fn test_parse_duration() {
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
    assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("12").unwrap(), Duration::from_secs(12));
    assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    assert!(matches!(parse_duration("soon"), Err(ConfigError::InvalidDuration(_))));
    assert!(parse_duration("10 fortnights").is_err());
    assert!(parse_duration("").is_err());
}

#[test]
fn test_empty_documents_are_valid() {
    let yaml = HealthConfig::from_yaml_str("").unwrap();
    assert_eq!(yaml, HealthConfig::default());
    let commented = HealthConfig::from_yaml_str("# nothing here\n").unwrap();
    assert_eq!(commented, HealthConfig::default());
    assert_eq!(HealthConfig::from_toml_str("").unwrap(), HealthConfig::default());
    assert!(HealthConfig::default().validate().is_ok());
}

#[test]
fn test_default_engine_settings() {
    let settings = HealthConfig::default().engine_settings().unwrap();
    assert!(settings.max_concurrency >= 1);
    assert_eq!(settings.timeout, Duration::from_secs(60));
    assert!(settings.cache_enabled);
    assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
    assert_eq!(settings.retry_attempts, 2);
    assert_eq!(settings.retry_delay, Duration::from_secs(1));
    assert!(settings.cache_file.is_none());
}

#[test]
fn test_load_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "repos-health.yaml",
        r#"
repositories:
  - name: api
    path: services/api
    tags: [backend]
  - path: /srv/web
engine:
  max_concurrency: 3
  timeout: 30s
  cache_enabled: false
  cache_ttl: 5m
  retry_attempts: 3
  retry_delay: 250ms
  cache_file: cache.json
checkers:
  git_last_commit:
    enabled: false
  secret-scan:
    severity: high
    timeout: 10
    exclusions: ["**/fixtures/**"]
reporters:
  html:
    output_file: report.html
"#,
    );
    let config = HealthConfig::load(&path).unwrap();

    let settings = config.engine_settings().unwrap();
    assert_eq!(settings.max_concurrency, 3);
    assert_eq!(settings.timeout, Duration::from_secs(30));
    assert!(!settings.cache_enabled);
    assert_eq!(settings.cache_ttl, Duration::from_secs(300));
    assert_eq!(settings.retry_attempts, 3);
    assert_eq!(settings.retry_delay, Duration::from_millis(250));
    assert_eq!(settings.cache_file, Some(dir.path().join("cache.json")));

    let repos = config.repositories();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].name, "api");
    assert_eq!(repos[0].path, dir.path().join("services/api"));
    assert!(repos[0].has_tag("backend"));
    assert_eq!(repos[1].name, "web");
    assert_eq!(repos[1].path, PathBuf::from("/srv/web"));

    let registry = CheckerRegistry::from_config(&config).unwrap();
    assert!(!registry.get("git-last-commit").unwrap().enabled);
    let secrets = registry.get("secret-scan").unwrap();
    assert_eq!(secrets.severity, Severity::High);
    assert_eq!(secrets.timeout, Duration::from_secs(10));
    assert_eq!(secrets.exclusions, vec!["**/fixtures/**".to_string()]);
    // engine timeout applies where the checker sets none
    assert_eq!(registry.get("git-status").unwrap().timeout, Duration::from_secs(30));
    assert_eq!(
        config.reporters.get("html").unwrap().output_file,
        Some(PathBuf::from("report.html"))
    );
}

#[test]
fn test_load_toml_and_json() {
    let dir = TempDir::new().unwrap();
    let toml_path = write_config(
        &dir,
        "health.toml",
        r#"
[engine]
retry_attempts = 1
timeout = "2m"

[checkers.readme-sections.options]
required_sections = ["Usage"]
"#,
    );
    let config = HealthConfig::load(&toml_path).unwrap();
    assert_eq!(config.engine_settings().unwrap().timeout, Duration::from_secs(120));
    let registry = CheckerRegistry::from_config(&config).unwrap();
    let readme = registry.get("readme-sections").unwrap();
    assert_eq!(
        readme.options.get_option::<Vec<String>>("required_sections"),
        Some(vec!["Usage".to_string()])
    );

    let json_path = write_config(
        &dir,
        "health.json",
        r#"{"engine": {"retry_attempts": 4}, "analyzers": {"go": {"complexity_threshold": 15}}}"#,
    );
    let config = HealthConfig::load(&json_path).unwrap();
    assert_eq!(config.engine_settings().unwrap().retry_attempts, 4);
    let go = config
        .analyzer_definitions()
        .unwrap()
        .into_iter()
        .find(|a| a.language == "go")
        .unwrap();
    assert_eq!(go.complexity_threshold, 15);
}

#[test]
fn test_load_errors() {
    let dir = TempDir::new().unwrap();
    let ini = write_config(&dir, "health.ini", "x=1");
    assert!(matches!(
        HealthConfig::load(&ini),
        Err(ConfigError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        HealthConfig::load(&dir.path().join("missing.yaml")),
        Err(ConfigError::Io { .. })
    ));
    let broken = write_config(&dir, "broken.yaml", "engine: [unclosed");
    assert!(matches!(
        HealthConfig::load(&broken),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_validation_rejects_unknown_and_mistyped_entries() {
    let unknown_checker = HealthConfig::from_yaml_str("checkers:\n  lint-everything: {}\n").unwrap();
    assert!(matches!(
        unknown_checker.validate(),
        Err(ConfigError::UnknownChecker(id)) if id == "lint-everything"
    ));

    let unknown_analyzer = HealthConfig::from_yaml_str("analyzers:\n  cobol: {}\n").unwrap();
    assert!(matches!(
        unknown_analyzer.validate(),
        Err(ConfigError::UnknownAnalyzer(lang)) if lang == "cobol"
    ));

    let bad_severity =
        HealthConfig::from_yaml_str("checkers:\n  git-status:\n    severity: urgent\n").unwrap();
    assert!(matches!(
        bad_severity.validate(),
        Err(ConfigError::InvalidSeverity(_))
    ));

    let mistyped = HealthConfig::from_yaml_str(
        "checkers:\n  git-status:\n    options:\n      max_untracked: many\n",
    )
    .unwrap();
    assert!(matches!(
        mistyped.validate(),
        Err(ConfigError::InvalidOption { option, .. }) if option == "max_untracked"
    ));

    let bad_duration = HealthConfig::from_yaml_str("engine:\n  timeout: forever\n").unwrap();
    assert!(matches!(
        bad_duration.validate(),
        Err(ConfigError::InvalidDuration(_))
    ));

    let bad_reporter = HealthConfig::from_yaml_str("reporters:\n  pdf: {}\n").unwrap();
    assert!(matches!(
        bad_reporter.validate(),
        Err(ConfigError::UnknownReporter(id)) if id == "pdf"
    ));
}

#[test]
fn test_complexity_precedence_checker_block_over_flat_block() {
    let config = HealthConfig::from_yaml_str(
        r#"
cyclomatic_complexity:
  detailed_report: true
  thresholds:
    python: 8
    go: 12
checkers:
  cyclomatic-complexity:
    options:
      detailed_report: false
      thresholds:
        python: 20
"#,
    )
    .unwrap();
    let options = config.resolve_complexity_options().unwrap();
    let resolved = thresholds(&options);
    assert_eq!(resolved.get("python"), Some(&20));
    assert_eq!(resolved.get("go"), Some(&12));
    assert_eq!(options.get_option::<bool>("detailed_report"), Some(false));

    let registry = CheckerRegistry::from_config(&config).unwrap();
    assert_eq!(registry.get(CHECKER_ID).unwrap().options, options);
}

#[test]
fn test_complexity_precedence_flat_block_over_analyzer_threshold() {
    let config = HealthConfig::from_yaml_str(
        r#"
analyzers:
  rust: { complexity_threshold: 25 }
  java: { complexity_threshold: 30 }
cyclomatic_complexity:
  thresholds:
    rust: 14
"#,
    )
    .unwrap();
    let options = config.resolve_complexity_options().unwrap();
    // the flat block sets rust; java falls back to the analyzer threshold
    assert_eq!(thresholds(&options).get("rust"), Some(&14));
    assert_eq!(thresholds(&options).get("java"), None);
    let java = config
        .analyzer_definitions()
        .unwrap()
        .into_iter()
        .find(|a| a.language == "java")
        .unwrap();
    assert_eq!(java.complexity_threshold, 30);
    assert_eq!(options.get_option::<bool>("detailed_report"), Some(false));
}

#[test]
fn test_complexity_thresholds_must_be_integers() {
    let config = HealthConfig::from_yaml_str(
        "checkers:\n  cyclomatic-complexity:\n    options:\n      thresholds: lots\n",
    )
    .unwrap();
    assert!(matches!(
        config.resolve_complexity_options(),
        Err(ConfigError::InvalidOption { option, .. }) if option == "thresholds"
    ));
}

#[test]
fn test_discover() {
    let dir = TempDir::new().unwrap();
    assert_eq!(HealthConfig::discover(dir.path()).unwrap(), HealthConfig::default());
    write_config(&dir, "repos-health.toml", "[engine]\nretry_attempts = 0\n");
    let config = HealthConfig::discover(dir.path()).unwrap();
    assert_eq!(config.engine.retry_attempts, 0);
}
