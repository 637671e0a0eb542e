//! Build script for sqdctl
//!
//! Embeds the git revision and build time shown by `sqdctl --version`.

use std::process::Command;

use chrono::Utc;

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_hash().unwrap_or_else(|| "unknown".to_string()));
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Short revision of HEAD, `None` outside a git checkout or without git
fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}
