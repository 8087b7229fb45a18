//! Session metadata carried by a rollout's `session_meta` record.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Descriptive fields of a session. At most one per session; the first
/// `session_meta` record wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SessionMeta {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub cwd: Option<String>,
    pub originator: Option<String>,
    pub cli_version: Option<String>,
    pub instructions: Option<String>,
    pub source: Option<String>,
    pub model_provider: Option<String>,
    /// Free-form git info, usually `repository_url`, `branch`, `commit_hash`
    pub git: Option<Map<String, Value>>,
}

impl SessionMeta {
    /// The git remote URL, if recorded.
    pub fn repository_url(&self) -> Option<&str> {
        self.git_str("repository_url")
    }

    /// The git branch, if recorded.
    pub fn branch(&self) -> Option<&str> {
        self.git_str("branch")
    }

    /// `owner/name` of the GitHub repository the session ran in.
    pub fn github_repo(&self) -> Option<String> {
        self.repository_url().and_then(detect_github_repo)
    }

    fn git_str(&self, key: &str) -> Option<&str> {
        self.git.as_ref()?.get(key)?.as_str()
    }
}

fn github_repo_re() -> &'static Regex {
    static GITHUB_REPO_RE: OnceLock<Regex> = OnceLock::new();
    GITHUB_REPO_RE.get_or_init(|| {
        Regex::new(r"github\.com[:/](?P<repo>[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+?)(?:\.git)?/?$")
            .expect("valid github repo regex")
    })
}

/// Extract `owner/name` from an https or ssh GitHub remote URL.
pub fn detect_github_repo(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    github_repo_re()
        .captures(url)
        .and_then(|caps| caps.name("repo"))
        .map(|m| m.as_str().to_string())
}
