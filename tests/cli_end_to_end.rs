#![cfg(unix)]

//! End-to-end tests through the built binary: printed-stream ordering and
//! stdin forwarding are only observable across the process boundary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde_json::json;

fn multirun() -> Command {
    Command::new(env!("CARGO_BIN_EXE_multirun"))
}

fn write_instructions(dir: &Path, instructions: serde_json::Value) -> PathBuf {
    let path = dir.join("instructions.json");
    std::fs::write(&path, instructions.to_string()).unwrap();
    path
}

fn sh_command(tag: &str, script: &str) -> serde_json::Value {
    json!({
        "path": "/bin/sh",
        "tag": tag,
        "args": ["-c", script],
        "env": {}
    })
}

#[test]
fn serial_run_stops_at_the_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one");
    let three = dir.path().join("three");

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("one", &format!("touch {}", one.display())),
                sh_command("two", "exit 1"),
                sh_command("three", &format!("touch {}", three.display())),
            ],
            "jobs": 1,
            "print_command": false,
            "buffer_output": false,
            "keep_going": false,
            "forward_stdin": false
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(one.exists());
    assert!(!three.exists());
}

#[test]
fn serial_keep_going_runs_everything_and_still_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one");
    let three = dir.path().join("three");

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("one", &format!("touch {}", one.display())),
                sh_command("two", "exit 1"),
                sh_command("three", &format!("touch {}", three.display())),
            ],
            "jobs": 1,
            "keep_going": true
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(one.exists());
    assert!(three.exists());
}

#[test]
fn concurrent_run_dispatches_everything_and_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one");
    let three = dir.path().join("three");

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("one", &format!("touch {}", one.display())),
                sh_command("two", "exit 1"),
                sh_command("three", &format!("touch {}", three.display())),
            ],
            "jobs": 0,
            "buffer_output": true
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(one.exists());
    assert!(three.exists());
}

#[test]
fn buffered_blocks_print_in_dispatch_order_not_completion_order() {
    let dir = tempfile::tempdir().unwrap();

    // A finishes last but was dispatched first, so its block prints first.
    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("a", "sleep 0.5; echo A"),
                sh_command("b", "echo B"),
            ],
            "jobs": 0,
            "buffer_output": true
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "A\nB\n");
}

#[test]
fn tags_precede_their_buffered_blocks() {
    let dir = tempfile::tempdir().unwrap();

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("first", "echo out1"),
                sh_command("second", "echo out2"),
            ],
            "jobs": 0,
            "print_command": true,
            "buffer_output": true
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "first\nout1\nsecond\nout2\n"
    );
}

#[test]
fn serial_tags_print_before_each_command_runs() {
    let dir = tempfile::tempdir().unwrap();

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("greet", "echo hello"),
            ],
            "jobs": 1,
            "print_command": true
        }),
    );

    let output = multirun().arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "greet\nhello\n");
}

#[test]
fn stdin_lines_are_broadcast_to_every_child_in_order() {
    let dir = tempfile::tempdir().unwrap();

    let echo_loop = |prefix: &str| {
        format!("while read line; do echo \"{prefix}:$line\"; done")
    };

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("a", &echo_loop("A")),
                sh_command("b", &echo_loop("B")),
            ],
            "jobs": 0,
            "buffer_output": true,
            "forward_stdin": true
        }),
    );

    let mut child = multirun()
        .arg(&instructions)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    // Give both children time to start and register their stdin pipes
    // before any input is broadcast.
    std::thread::sleep(Duration::from_millis(400));

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"1\n2\n").unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "A:1\nA:2\nB:1\nB:2\n"
    );
}

#[test]
fn extra_arguments_fan_out_to_every_command() {
    let dir = tempfile::tempdir().unwrap();

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                {
                    "path": "/bin/sh",
                    "tag": "args",
                    "args": ["-c", "printf '%s\\n' \"$@\"", "sh"],
                    "env": {}
                }
            ],
            "jobs": 1
        }),
    );

    let output = multirun()
        .arg(&instructions)
        .arg("extra-one")
        .arg("extra-two")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "extra-one\nextra-two\n"
    );
}

#[test]
fn command_env_keys_win_over_the_parent_environment() {
    let dir = tempfile::tempdir().unwrap();

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                {
                    "path": "/bin/sh",
                    "tag": "env",
                    "args": ["-c", "echo \"$MULTIRUN_TEST_VALUE\""],
                    "env": { "MULTIRUN_TEST_VALUE": "override" }
                }
            ],
            "jobs": 1
        }),
    );

    let output = multirun()
        .arg(&instructions)
        .env("MULTIRUN_TEST_VALUE", "parent")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "override\n");
}

#[test]
fn dry_run_prints_the_plan_without_executing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let instructions = write_instructions(
        dir.path(),
        json!({
            "commands": [
                sh_command("touch", &format!("touch {}", marker.display())),
            ],
            "jobs": 1
        }),
    );

    let output = multirun().arg("--dry-run").arg(&instructions).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("dry-run"));
    assert!(!marker.exists());
}

#[test]
fn empty_command_list_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let instructions = write_instructions(dir.path(), json!({ "commands": [] }));

    let output = multirun().arg(&instructions).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn missing_instructions_file_is_a_configuration_error() {
    let output = multirun().arg("/no/such/instructions.json").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("multirun error"));
}
