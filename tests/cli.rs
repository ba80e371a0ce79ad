use std::io::Write;
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

fn handle_avail() -> Command {
    Command::new(env!("CARGO_BIN_EXE_handle-avail"))
}

fn dictionary(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write dictionary");
    file
}

fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> Output {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            if let Some(ref mut stdin) = child.stdin {
                stdin.write_all(input).ok();
            }
            child.wait_with_output()
        })
        .expect("failed to execute")
}

// Longer than Twitter allows, so no request is ever sent.
const OFFLINE_WORDS: &str = "abcdefghijklmnopq\nrstuvwxyzabcdefgh\n";

#[test]
fn negative_wait_exits_with_code_2() {
    let dict = dictionary(OFFLINE_WORDS);
    let output = handle_avail()
        .args(["-w", "-1", "-d"])
        .arg(dict.path())
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--wait"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn unknown_maybe_exits_with_code_2() {
    let output = handle_avail()
        .args(["--maybe", "perhaps"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("perhaps"), "stderr: {stderr}");
    assert!(stderr.contains("annotate"), "stderr: {stderr}");
}

#[test]
fn missing_dictionary_exits_with_code_2() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = handle_avail()
        .arg("-d")
        .arg(dir.path().join("no-such-words"))
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("is not a valid dictionary file"),
        "stderr: {stderr}"
    );
}

#[test]
fn over_long_words_finish_without_output() {
    let dict = dictionary(OFFLINE_WORDS);
    let output = handle_avail()
        .args(["-w", "0", "-d"])
        .arg(dict.path())
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("last word searched: rstuvwxyzabcdefgh"),
        "stderr: {stderr}"
    );
    assert!(stderr.ends_with('\n'), "stderr: {stderr:?}");
}

#[test]
fn suppress_status_keeps_stderr_empty() {
    let dict = dictionary(OFFLINE_WORDS);
    let output = handle_avail()
        .args(["-s", "-w", "0", "-d"])
        .arg(dict.path())
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty(), "stderr should be empty");
}

#[test]
fn stdin_dictionary_piping() {
    let output = run_with_stdin(
        handle_avail().args(["-d", "-", "-w", "0"]),
        OFFLINE_WORDS.as_bytes(),
    );
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("last word searched: abcdefghijklmnopq"),
        "stderr: {stderr}"
    );
}

#[test]
fn annotated_match_is_tab_separated() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/moth");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/users/username_available")
            .query_param("username", "moth");
        then.status(200).json_body(json!({ "valid": false }));
    });

    let base_url = server.base_url();
    let dict = dictionary("moth\n");
    let output = handle_avail()
        .args(["-s", "-w", "0", "--twitter-url", base_url.as_str(), "-d"])
        .arg(dict.path())
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "moth\tm\n");
}

#[test]
fn github_flag_uses_signup_check() {
    let server = MockServer::start();
    let signup = server.mock(|when, then| {
        when.method(POST)
            .path("/signup_check/username")
            .x_www_form_urlencoded_tuple("value", "hubot");
        then.status(200);
    });

    let base_url = server.base_url();
    let output = run_with_stdin(
        handle_avail().args([
            "-g",
            "-s",
            "-m",
            "no",
            "-w",
            "0",
            "--github-url",
            base_url.as_str(),
            "-d",
            "-",
        ]),
        b"hubot\n",
    );
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hubot\n");
    signup.assert_hits(1);
}

#[test]
fn rate_limit_exits_with_code_1() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/first");
        then.status(429);
    });
    let second = server.mock(|when, then| {
        when.method(GET).path("/second");
        then.status(404);
    });

    let base_url = server.base_url();
    let dict = dictionary("first\nsecond\n");
    let output = handle_avail()
        .args(["-w", "0", "-m", "yes", "--twitter-url", base_url.as_str(), "-d"])
        .arg(dict.path())
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Twitter is spouting 429s"), "stderr: {stderr}");
    second.assert_hits(0);
}
