use std::env;
use std::process::Command;

/// `GRIDWATCH_BUILD_CHANNEL`: `stable` (default), `nightly` or `dev`
fn build_channel() -> String {
    env::var("GRIDWATCH_BUILD_CHANNEL")
        .map(|c| c.trim().to_ascii_lowercase())
        .ok()
        .filter(|c| matches!(c.as_str(), "nightly" | "dev"))
        .unwrap_or_else(|| "stable".to_string())
}

fn git_sha() -> Option<String> {
    let from_git = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());
    from_git
        .or_else(|| env::var("GIT_SHA").ok())
        .filter(|s| !s.is_empty())
}

fn main() {
    let base = env!("CARGO_PKG_VERSION");
    let channel = build_channel();

    let version = match (channel.as_str(), git_sha()) {
        ("stable", _) => base.to_string(),
        (channel, Some(sha)) => format!("{}-{}+{}", base, channel, sha),
        (channel, None) => format!("{}-{}", base, channel),
    };

    // EIA asks API consumers to identify themselves; an operator contact is optional
    let user_agent = match env::var("GRIDWATCH_CONTACT") {
        Ok(contact) if !contact.trim().is_empty() => {
            format!("gridwatch/{} (+{})", version, contact.trim())
        }
        _ => format!("gridwatch/{}", version),
    };

    println!("cargo:rustc-env=APP_VERSION={}", version);
    println!("cargo:rustc-env=APP_USER_AGENT={}", user_agent);

    println!("cargo:rerun-if-env-changed=GRIDWATCH_BUILD_CHANNEL");
    println!("cargo:rerun-if-env-changed=GRIDWATCH_CONTACT");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
