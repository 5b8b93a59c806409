// tests/logging_filter.rs

use taskflow::cli::LogLevel;
use taskflow::logging::{build_filter, parse_level_str};

fn directives(cli: Option<LogLevel>, env: Option<&str>) -> String {
    build_filter(cli, env).unwrap().to_string().to_lowercase()
}

#[test]
fn default_scopes_info_to_the_crate() {
    let filter = directives(None, None);
    assert!(filter.contains("taskflow=info"), "{filter}");
    assert!(filter.contains("warn"), "{filter}");
}

#[test]
fn cli_level_wins_over_environment() {
    let filter = directives(Some(LogLevel::Debug), Some("taskflow=trace"));
    assert!(filter.contains("taskflow=debug"), "{filter}");
    assert!(!filter.contains("trace"), "{filter}");
}

#[test]
fn bare_env_level_is_scoped_like_the_flag() {
    let filter = directives(None, Some(" Warning "));
    assert!(filter.contains("taskflow=warn"), "{filter}");
}

#[test]
fn env_directives_allow_per_module_levels() {
    let filter = directives(None, Some("taskflow=info,taskflow::engine=trace"));
    assert!(filter.contains("taskflow::engine=trace"), "{filter}");
    assert!(filter.contains("taskflow=info"), "{filter}");
}

#[test]
fn malformed_env_directives_are_reported() {
    let err = build_filter(None, Some("taskflow=loud")).unwrap_err();
    assert!(err.to_string().contains("TASKFLOW_LOG"));
}

#[test]
fn level_names_are_normalised() {
    assert_eq!(parse_level_str("WARNING"), Some("warn"));
    assert_eq!(parse_level_str("Trace"), Some("trace"));
    assert_eq!(parse_level_str("taskflow=debug"), None);
}
