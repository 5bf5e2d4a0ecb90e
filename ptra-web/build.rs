//! Stamps the binary with `PTRA_BUILD_ID`
//!
//! Format: `<commit>[+dirty] <profile> <utc timestamp>`, for example
//! `3f2a9c1d+dirty release 2026-03-01T09:15:00Z`.

use std::path::Path;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

fn commit_label() -> String {
    let Some(commit) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return "nogit".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}+dirty", commit),
        _ => commit,
    }
}

/// Rebuild when HEAD moves or the working tree is committed
fn watch_git_state() {
    let Some(git_dir) = git(&["rev-parse", "--git-dir"]) else {
        return;
    };
    let git_dir = Path::new(&git_dir);
    for name in ["HEAD", "index"] {
        println!("cargo:rerun-if-changed={}", git_dir.join(name).display());
    }
    if let Some(head_ref) = git(&["symbolic-ref", "-q", "HEAD"]) {
        println!("cargo:rerun-if-changed={}", git_dir.join(head_ref).display());
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    watch_git_state();

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=PTRA_BUILD_ID={} {} {}", commit_label(), profile, stamp);
}
