use std::process::Command;

const VERSION_ENV: &str = "HOMEWORK_TRACKER_VERSION";

fn strip_tag_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('v') {
        Some(rest) if rest.starts_with(|ch: char| ch.is_ascii_digit()) => rest.to_string(),
        _ => trimmed.to_string(),
    }
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = strip_tag_prefix(&String::from_utf8(output.stdout).ok()?);
    (!described.is_empty()).then_some(described)
}

fn main() {
    println!("cargo:rerun-if-env-changed={VERSION_ENV}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let version = std::env::var(VERSION_ENV)
        .ok()
        .map(|raw| strip_tag_prefix(&raw))
        .filter(|value| !value.is_empty())
        .or_else(git_describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=HOMEWORK_TRACKER_BUILD_VERSION={version}");
}
