//! Repository addressing for the platform CLIs.

use regex::Regex;
use std::sync::LazyLock;

static REMOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z+]+://)?(?:[^@/]+@)?([^/:]+)(?::\d+)?[/:](.+)$")
        .expect("remote URL regex is valid")
});

const DEFAULT_HOSTS: &[&str] = &["github.com", "gitlab.com"];

/// Repository argument for `--repo` / `-R`, derived from a repository URL.
///
/// `https://github.com/acme/game.git` becomes `acme/game`; repositories on other hosts
/// keep the host (`git.example.com/acme/game`). Returns `None` when the URL names no
/// repository path.
pub fn repo_slug(url: &str) -> Option<String> {
    let url = url.trim();
    let caps = REMOTE_URL_RE.captures(url)?;
    let host = caps.get(1)?.as_str().to_ascii_lowercase();

    let path = caps.get(2)?.as_str();
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    // GitLab web URLs append `/-/...` to the project path
    let path = path.split("/-/").next().unwrap_or(path).trim_end_matches('/');

    if path.split('/').filter(|s| !s.is_empty()).count() < 2 {
        return None;
    }

    if DEFAULT_HOSTS.contains(&host.as_str()) {
        Some(path.to_string())
    } else {
        Some(format!("{}/{}", host, path))
    }
}
