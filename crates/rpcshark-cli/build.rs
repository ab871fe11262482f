use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for var in ["GITHUB_SHA", "SOURCE_DATE_EPOCH"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let commit = non_empty_env("GITHUB_SHA")
        .or_else(|| git(&["rev-parse", "HEAD"]))
        .map(|full| full.chars().take(12).collect::<String>())
        .unwrap_or_else(|| UNKNOWN.to_string());

    // Reproducible builds pin the date through SOURCE_DATE_EPOCH.
    let date = non_empty_env("SOURCE_DATE_EPOCH")
        .map(|epoch| format!("@{epoch}"))
        .or_else(|| git(&["log", "-1", "--format=%cs"]))
        .unwrap_or_else(|| UNKNOWN.to_string());

    println!("cargo:rustc-env=RPCSHARK_BUILD_COMMIT={commit}");
    println!("cargo:rustc-env=RPCSHARK_BUILD_DATE={date}");
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}
