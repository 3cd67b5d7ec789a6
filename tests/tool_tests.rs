// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

#![cfg(feature = "tool")]

//! Integration tests for the `wordidx` CLI tool binary.
//!
//! These tests run the actual binary and verify its behavior.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the wordidx binary
fn wordidx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps
    path.push("wordidx");
    path
}

/// Run the wordidx binary with flags and CLI arguments
fn run_cli(index_path: &Path, flags: &[&str], args: &[&str]) -> (String, String, bool) {
    let mut cmd_args = flags.to_vec();
    cmd_args.push(index_path.to_str().unwrap());
    cmd_args.extend(args);

    let output = Command::new(wordidx_binary())
        .args(&cmd_args)
        .output()
        .expect("Failed to execute wordidx binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Create a temporary directory for test indexes
fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a text file and return its path as the index sees it
fn write_text(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("Failed to write text file");
    path.to_str().unwrap().to_owned()
}

// ============================================================================
// CLI Command Tests
// ============================================================================

#[test]
fn test_cli_add_and_query() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "hello world");
    let b = write_text(dir.path(), "b.txt", "hello there");

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["add", &a, &b]);
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("OK (2 documents)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["query", "hello"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains(&a), "Expected {} in output: {}", a, stdout);
    assert!(stdout.contains(&b), "Expected {} in output: {}", b, stdout);
    assert!(stdout.contains("OK (2 documents)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["query", "world"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains(&a), "Expected {} in output: {}", a, stdout);
    assert!(!stdout.contains(&b), "Unexpected {} in output: {}", b, stdout);
}

#[test]
fn test_cli_query_missing_word() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["query", "nothing"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains("OK (0 documents)"), "Expected empty result: {}", stdout);
}

#[test]
fn test_cli_prefix() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "Apple apricot banana");
    let b = write_text(dir.path(), "b.txt", "apple");

    let (_, stderr, success) = run_cli(&index_path, &[], &["add", &a, &b]);
    assert!(success, "add failed: {}", stderr);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["prefix", "ap"]);
    assert!(success, "prefix failed: {}", stderr);
    assert!(stdout.contains("apple (1)"), "Expected apple in output: {}", stdout);
    assert!(stdout.contains("apricot (1)"), "Expected apricot in output: {}", stdout);
    assert!(!stdout.contains("Apple"), "Unexpected Apple in output: {}", stdout);
    assert!(stdout.contains("OK (2 words)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["prefix", "-i", "AP"]);
    assert!(success, "prefix -i failed: {}", stderr);
    assert!(stdout.contains("Apple (1)"), "Expected Apple in output: {}", stdout);
    assert!(stdout.contains("OK (3 words)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["prefix", "-d", "ban"]);
    assert!(success, "prefix -d failed: {}", stderr);
    assert!(stdout.contains(&a), "Expected {} in output: {}", a, stdout);
    assert!(stdout.contains("OK (1 documents)"), "Expected OK in output: {}", stdout);
}

#[test]
fn test_cli_match() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "cat cut coat Cot");

    let (_, stderr, success) = run_cli(&index_path, &[], &["add", &a]);
    assert!(success, "add failed: {}", stderr);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["match", "c?t"]);
    assert!(success, "match failed: {}", stderr);
    assert!(stdout.contains("cat (1)"), "Expected cat in output: {}", stdout);
    assert!(stdout.contains("cut (1)"), "Expected cut in output: {}", stdout);
    assert!(!stdout.contains("coat"), "Unexpected coat in output: {}", stdout);
    assert!(stdout.contains("OK (2 words)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["match", "-i", "c*t"]);
    assert!(success, "match -i failed: {}", stderr);
    assert!(stdout.contains("Cot (1)"), "Expected Cot in output: {}", stdout);
    assert!(stdout.contains("OK (4 words)"), "Expected OK in output: {}", stdout);
}

#[test]
fn test_cli_remove_and_files() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "shared");
    let b = write_text(dir.path(), "b.txt", "shared");

    let (_, stderr, success) = run_cli(&index_path, &[], &["add", &a, &b]);
    assert!(success, "add failed: {}", stderr);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["rm", &a]);
    assert!(success, "rm failed: {}", stderr);
    assert!(stdout.contains("OK (1 documents)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["ls"]);
    assert!(success, "ls failed: {}", stderr);
    assert!(!stdout.contains(&a), "Unexpected {} in output: {}", a, stdout);
    assert!(stdout.contains(&b), "Expected {} in output: {}", b, stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["files", "b.txt"]);
    assert!(success, "files failed: {}", stderr);
    assert!(stdout.contains("OK (1 documents)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["query", "shared"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains("OK (1 documents)"), "Expected OK in output: {}", stdout);
}

#[test]
fn test_cli_remove_missing_fails() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "word");

    let (_, stderr, success) = run_cli(&index_path, &[], &["add", &a]);
    assert!(success, "add failed: {}", stderr);

    let (_, stderr, success) = run_cli(&index_path, &[], &["rm", "nope", &a]);
    assert!(!success, "rm of a missing document should fail");
    assert!(stderr.contains("nope"), "Expected path in error: {}", stderr);

    // The document that was found is removed anyway
    let (stdout, stderr, success) = run_cli(&index_path, &[], &["ls"]);
    assert!(success, "ls failed: {}", stderr);
    assert!(stdout.contains("OK (0 documents)"), "Expected empty index: {}", stdout);
}

#[test]
fn test_cli_info() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "one two two");

    let (_, stderr, success) = run_cli(&index_path, &["-f", "simple"], &["add", &a]);
    assert!(success, "add failed: {}", stderr);

    let (stdout, stderr, success) = run_cli(&index_path, &["-f", "simple"], &["info"]);
    assert!(success, "info failed: {}", stderr);
    assert!(stdout.contains("Documents: 1"), "Expected document count: {}", stdout);
    assert!(stdout.contains("Words: 2"), "Expected word count: {}", stdout);
    assert!(stdout.contains("Disk space:"), "Expected disk space: {}", stdout);
}

#[test]
fn test_cli_merge_threshold() {
    let dir = temp_dir();
    let index_path = dir.path().join("test.idx");
    let a = write_text(dir.path(), "a.txt", "alpha");
    let b = write_text(dir.path(), "b.txt", "beta");

    let (stdout, stderr, success) = run_cli(&index_path, &["-t", "1"], &["add", &a, &b]);
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("OK (2 documents)"), "Expected OK in output: {}", stdout);

    let (stdout, stderr, success) = run_cli(&index_path, &[], &["merge"]);
    assert!(success, "merge failed: {}", stderr);
    assert!(stdout.contains("OK (merged)"), "Expected OK in output: {}", stdout);
}
