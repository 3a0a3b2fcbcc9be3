// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=EFFECT_CAM_VERSION");

    // Packagers can pin the version string without a git checkout
    let version = std::env::var("EFFECT_CAM_VERSION")
        .ok()
        .or_else(describe_head)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output with the leading `v` removed.
///
/// - "v0.1.0" at a tag becomes "0.1.0"
/// - "v0.1.0-5-gabcdef1" after a tag becomes "0.1.0+5.abcdef1"
/// - a bare commit hash (no tags yet) is returned as-is
fn describe_head() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let raw = raw.strip_prefix('v').unwrap_or(&raw);

    let parts: Vec<&str> = raw.rsplitn(3, '-').collect();
    if parts.len() == 3 {
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        Some(format!("{}+{}.{}", parts[2], parts[1], hash))
    } else {
        Some(raw.to_string())
    }
}
