use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::types::{normalize_separators, Scope};

/// Source of the set of files changed since the last commit.
pub trait ChangeSource: Send + Sync {
    /// Workspace-relative paths of staged, unstaged and untracked files.
    fn changed_files(&self, root: &Path) -> Result<Vec<String>>;
}

/// Asks git for changed files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitChangeSource;

impl GitChangeSource {
    fn git_lines(root: &Path, args: &[&str]) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(normalize_separators)
            .collect())
    }
}

impl ChangeSource for GitChangeSource {
    fn changed_files(&self, root: &Path) -> Result<Vec<String>> {
        let mut files = Self::git_lines(root, &["diff", "--name-only", "--relative"])?;
        files.extend(Self::git_lines(
            root,
            &["diff", "--name-only", "--cached", "--relative"],
        )?);
        files.extend(Self::git_lines(
            root,
            &["ls-files", "--others", "--exclude-standard"],
        )?);
        Ok(files)
    }
}

/// Scope chosen for one run plus the files that must be re-extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSelection {
    pub scope: Scope,
    /// Empty for [`Scope::Full`].
    pub changed: HashSet<String>,
}

impl ScopeSelection {
    pub fn full() -> Self {
        Self {
            scope: Scope::Full,
            changed: HashSet::new(),
        }
    }

    /// Whether `file` must be re-extracted in this scope.
    pub fn needs_extraction(&self, file: &str) -> bool {
        match self.scope {
            Scope::Full => true,
            Scope::Incremental => self.changed.contains(file),
        }
    }
}

/// Pick the scope for a run. Falls back to full when the change source fails
/// or none of the changed files is a walked source file.
pub fn select_scope(
    source: &dyn ChangeSource,
    root: &Path,
    walked: &HashSet<String>,
) -> ScopeSelection {
    let changed = match source.changed_files(root) {
        Ok(files) => files,
        Err(e) => {
            debug!(error = %e, "change detection unavailable, using full scope");
            return ScopeSelection::full();
        }
    };

    let relevant: HashSet<String> = changed
        .into_iter()
        .filter(|f| walked.contains(f))
        .collect();
    if relevant.is_empty() {
        debug!("no changed source files, using full scope");
        return ScopeSelection::full();
    }

    info!(changed = relevant.len(), "incremental scope selected");
    ScopeSelection {
        scope: Scope::Incremental,
        changed: relevant,
    }
}
