// tests/config_error_handling.rs

use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;
use taskflow::cli::CliArgs;
use taskflow::config::{
    ConfigFile, DataNodeConfig, Workspace, load_and_validate, parse_duration, parse_validity,
};
use taskflow::data::DataNode;
use taskflow::errors::CoreError;
use taskflow::task::FunctionRegistry;
use taskflow::types::JobExecutionMode;
use taskflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn args_for(file: &NamedTempFile) -> CliArgs {
    CliArgs {
        config: file.path().display().to_string(),
        sequence: None,
        task: None,
        force: false,
        timeout: Some(10),
        log_level: None,
        dry_run: false,
    }
}

const HELLO_WORLD: &str = r#"
[core]
mode = "development"

[data_node.hello]
default = "Hello "

[data_node.world]
default = "world !"

[data_node.hello_world]
cacheable = true
validity_period = "1d"

[task.say_hello]
function = "concat"
inputs = ["hello", "world"]
outputs = ["hello_world"]

[sequence.greet]
tasks = ["say_hello"]
"#;

#[test]
fn test_valid_config_builds_workspace() {
    let file = write_config(HELLO_WORLD);
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.core.mode, JobExecutionMode::Development);
    assert_eq!(cfg.core.max_nb_of_workers, 1);

    let workspace = Workspace::build(&cfg, &FunctionRegistry::with_builtins()).unwrap();
    let hello_world = workspace.data_node("hello_world").unwrap();
    assert!(hello_world.cacheable());
    assert_eq!(
        hello_world.validity_period(),
        Some(chrono::TimeDelta::days(1))
    );
    assert_eq!(workspace.data_node("hello").unwrap().read().unwrap(), json!("Hello "));

    let sequence = workspace.sequence("greet").unwrap();
    assert!(sequence.is_consistent());
    assert_eq!(sequence.tasks().len(), 1);
    assert!(workspace.task("say_hello").unwrap().skippable());
    assert!(workspace.task("missing").is_err());
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[data_node.a]
[data_node.b]

[task.A]
function = "identity"
inputs = ["a"]
outputs = ["b"]

[task.B]
function = "identity"
inputs = ["b"]
outputs = ["a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(CoreError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_data_node_returns_config_error() {
    let file = write_config(
        r#"
[data_node.a]

[task.A]
function = "identity"
inputs = ["a"]
outputs = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(CoreError::ConfigError(msg)) => {
            assert!(msg.contains("unknown data node"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = write_config("[task.A\nfunction = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(CoreError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_returns_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Taskflow.toml"),
        Err(CoreError::IoError(_))
    ));
}

#[test]
fn test_config_without_tasks_is_rejected() {
    let raw = ConfigFileBuilder::new().with_node("a").raw();
    match ConfigFile::try_from(raw) {
        Err(CoreError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("Expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_zero_workers_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .standalone(0)
        .with_node("a")
        .with_task("t", TaskConfigBuilder::new("identity").output("a").build())
        .raw();
    match ConfigFile::try_from(raw) {
        Err(CoreError::ConfigError(msg)) => assert!(msg.contains("max_nb_of_workers")),
        other => panic!("Expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_bad_validity_period_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_data_node(
            "a",
            DataNodeConfig {
                validity_period: Some("soon".to_string()),
                ..DataNodeConfig::default()
            },
        )
        .with_task("t", TaskConfigBuilder::new("identity").output("a").build())
        .raw();
    match ConfigFile::try_from(raw) {
        Err(CoreError::ConfigError(msg)) => assert!(msg.contains("validity_period")),
        other => panic!("Expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_task_reading_its_own_output_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_node("a")
        .with_task(
            "t",
            TaskConfigBuilder::new("identity").input("a").output("a").build(),
        )
        .raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(CoreError::ConfigError(_))
    ));
}

#[test]
fn test_unknown_sequence_task_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_node("a")
        .with_task("t", TaskConfigBuilder::new("identity").output("a").build())
        .with_sequence("s", &["t", "ghost"])
        .raw();
    match ConfigFile::try_from(raw) {
        Err(CoreError::ConfigError(msg)) => assert!(msg.contains("ghost")),
        other => panic!("Expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unknown_function_fails_at_build_time() {
    let cfg = ConfigFileBuilder::new()
        .with_node("a")
        .with_task("t", TaskConfigBuilder::new("frobnicate").output("a").build())
        .build();
    match Workspace::build(&cfg, &FunctionRegistry::with_builtins()) {
        Err(CoreError::UnknownFunction(name)) => assert_eq!(name, "frobnicate"),
        other => panic!("Expected UnknownFunction, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duration_parsing() {
    assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
    assert_eq!(parse_duration("2m").unwrap().as_secs(), 120);
    assert_eq!(parse_validity("1d").unwrap(), chrono::TimeDelta::days(1));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("3w").is_err());
}

#[test]
fn test_run_executes_configured_sequences() {
    let file = write_config(HELLO_WORLD);
    taskflow::run(args_for(&file)).unwrap();
}

#[test]
fn test_dry_run_does_not_execute() {
    let file = write_config(HELLO_WORLD);
    let mut args = args_for(&file);
    args.dry_run = true;
    taskflow::run(args).unwrap();
}

#[test]
fn test_run_reports_failed_jobs() {
    let file = write_config(
        r#"
[data_node.in]
default = 1

[data_node.out]

[task.broken]
function = "fail"
inputs = ["in"]
outputs = ["out"]
"#,
    );
    let err = taskflow::run(args_for(&file)).unwrap_err();
    assert!(err.to_string().contains("failed"));
}
