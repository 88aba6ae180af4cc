// tests/declared_script.rs

#![cfg(unix)]

use std::fs;
use std::path::Path;

use buildrig::cli::CommandArguments;
use buildrig::config::loader::load_and_validate;
use buildrig::errors::BuildError;
use buildrig::runner::CommandExecutor;
use buildrig::script::DefaultScriptLocator;
use buildrig::status_codes;
use buildrig_test_utils::{init_tracing, with_timeout};

fn write_description(dir: &Path, body: &str) {
    fs::write(dir.join("Buildrig.toml"), body).unwrap();
}

async fn run_in(dir: &Path, args: CommandArguments) -> i32 {
    let exec = CommandExecutor::new(args, DefaultScriptLocator::with_root(dir));
    with_timeout(exec.execute()).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn runs_shell_tasks_in_dependency_order_with_properties() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.log");
    write_description(
        dir.path(),
        &format!(
            r#"
[settings]
default_target = "package"

[properties]
version = "1.0.0"

[target.compile]
description = "Compile"
[[target.compile.task]]
cmd = "echo compile >> '{out}'"

[target.package]
description = "Package"
depends_on = ["compile"]
[[target.package.task]]
cmd = "echo package-${{version}} >> '{out}'"
"#,
            out = out.display()
        ),
    );

    let args = CommandArguments {
        script_args: [("version".to_string(), "2.5.0".to_string())].into(),
        ..CommandArguments::default()
    };
    let code = run_in(dir.path(), args).await;

    assert_eq!(code, status_codes::SUCCESS);
    assert_eq!(fs::read_to_string(&out).unwrap(), "compile\npackage-2.5.0\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_command_fires_group_hooks_and_maps_to_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("hooks.log");
    let later = dir.path().join("later.log");
    write_description(
        dir.path(),
        &format!(
            r#"
[target.deploy]

[[target.deploy.task]]
cmd = "exit 3"
group = "upload"

[[target.deploy.task]]
cmd = "touch '{later}'"

[target.deploy.group.upload]
on_error = "echo error >> '{marker}'"
on_finally = "echo finally >> '{marker}'"
"#,
            marker = marker.display(),
            later = later.display()
        ),
    );

    let args = CommandArguments {
        main_targets: vec!["deploy".into()],
        ..CommandArguments::default()
    };
    let code = run_in(dir.path(), args).await;

    assert_eq!(code, status_codes::FAILURE);
    assert_eq!(fs::read_to_string(&marker).unwrap(), "error\nfinally\n");
    assert!(!later.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_dependencies_from_description_run_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.log");
    write_description(
        dir.path(),
        &format!(
            r#"
[target.restore]
[[target.restore.task]]
cmd = "echo restore >> '{out}'"

[target.docs]
depends_on = ["restore"]
[[target.docs.task]]
cmd = "echo docs >> '{out}'"

[target.tests]
depends_on = ["restore"]
[[target.tests.task]]
cmd = "echo tests >> '{out}'"

[target.release]
default = true
depends_on = [{{ name = "docs", mode = "parallel" }}, {{ name = "tests", mode = "parallel" }}]
[[target.release.task]]
cmd = "echo release >> '{out}'"
"#,
            out = out.display()
        ),
    );

    let code = run_in(dir.path(), CommandArguments::default()).await;
    assert_eq!(code, status_codes::SUCCESS);

    let lines: Vec<String> = fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines.first().map(String::as_str), Some("restore"));
    assert_eq!(lines.last().map(String::as_str), Some("release"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_description_is_a_generic_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_description(
        dir.path(),
        r#"
[target.a]
depends_on = ["b"]
[target.b]
depends_on = ["a"]
"#,
    );

    let code = run_in(dir.path(), CommandArguments::default()).await;
    assert_eq!(code, status_codes::FAILURE);

    assert!(matches!(
        load_and_validate(dir.path().join("Buildrig.toml")),
        Err(BuildError::DependencyCycle(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_script_path_is_used() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ran");
    fs::write(
        dir.path().join("ci.toml"),
        format!(
            "[target.ci]\ndefault = true\n[[target.ci.task]]\ncmd = \"touch '{}'\"\n",
            out.display()
        ),
    )
    .unwrap();

    let args = CommandArguments {
        script: Some("ci.toml".into()),
        ..CommandArguments::default()
    };
    let code = run_in(dir.path(), args).await;

    assert_eq!(code, status_codes::SUCCESS);
    assert!(out.exists());
}
