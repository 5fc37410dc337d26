// src/resolve.rs

//! Executable path resolution.
//!
//! Declared command paths are workspace-relative; mapping them to an
//! invocable location is not the executor's business. The executor receives
//! a [`PathResolver`] and treats whatever it returns as opaque, so tests can
//! substitute a fake without touching any global state.

use std::path::{Path, PathBuf};

/// Maps a declared command path to an invocable location.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, declared: &str) -> PathBuf;
}

/// Production resolver for workspace-relative command paths.
///
/// Rules:
/// - absolute paths pass through untouched
/// - `../repo/path` strips the leading `../` and joins it onto the root
///   (a reference into a sibling repository)
/// - anything else joins as `root/workspace_name/path`
///
/// The root comes from the `RUNFILES_DIR` environment variable when set,
/// otherwise the current working directory.
pub struct WorkspaceResolver {
    workspace_name: String,
    root: PathBuf,
}

impl WorkspaceResolver {
    pub fn new(workspace_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_name: workspace_name.into(),
            root: root.into(),
        }
    }

    /// Construct a resolver with the root taken from the environment.
    pub fn from_env(workspace_name: impl Into<String>) -> Self {
        let root = std::env::var_os("RUNFILES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(workspace_name, root)
    }
}

impl PathResolver for WorkspaceResolver {
    fn resolve(&self, declared: &str) -> PathBuf {
        let path = Path::new(declared);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        if let Some(stripped) = declared.strip_prefix("../") {
            return self.root.join(stripped);
        }
        self.root.join(&self.workspace_name).join(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_pass_through() {
        let r = WorkspaceResolver::new("ws", "/runfiles");
        assert_eq!(r.resolve("/usr/bin/env"), PathBuf::from("/usr/bin/env"));
    }

    #[test]
    fn workspace_relative_paths_join_workspace() {
        let r = WorkspaceResolver::new("ws", "/runfiles");
        assert_eq!(r.resolve("tools/lint"), PathBuf::from("/runfiles/ws/tools/lint"));
    }

    #[test]
    fn parent_prefixed_paths_skip_the_workspace() {
        let r = WorkspaceResolver::new("ws", "/runfiles");
        assert_eq!(
            r.resolve("../other_repo/bin/tool"),
            PathBuf::from("/runfiles/other_repo/bin/tool")
        );
    }
}
