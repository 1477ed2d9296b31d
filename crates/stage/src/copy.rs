//! Artifact copier.
//!
//! Copies the files matching a pattern set out of a dependency's source
//! directories into one flat target directory.

use relstage_core::{ArtifactKind, Error, PatternSet, PlatformRule, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Destination paths written by one copy operation, in copy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyResult {
    files: Vec<PathBuf>,
}

impl CopyResult {
    /// The destination paths.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of destination paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File names of the destinations, for reporting.
    pub fn file_names(&self) -> impl Iterator<Item = String> + '_ {
        self.files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Consume the result into its paths.
    #[must_use]
    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }
}

/// Copies matching artifacts into a flat directory using one platform rule.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactCopier {
    rule: PlatformRule,
}

impl ArtifactCopier {
    /// Create a copier for the active platform rule.
    #[must_use]
    pub fn new(rule: PlatformRule) -> Self {
        Self { rule }
    }

    /// Copy every file under `source_dirs` whose name matches one of
    /// `patterns` (expanded for `kind`) into `target_dir`.
    ///
    /// Relative structure is discarded. Results are ordered by source
    /// directory, pattern, then file name. Missing source directories are
    /// skipped. When two sources share a file name the last one copied wins
    /// and the destination is listed once.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the target directory cannot be created, a
    /// source directory cannot be read, or a file cannot be written.
    pub fn copy(
        &self,
        source_dirs: &[PathBuf],
        patterns: &PatternSet,
        kind: ArtifactKind,
        target_dir: &Path,
    ) -> Result<CopyResult> {
        fs::create_dir_all(target_dir).map_err(|e| {
            Error::io(e, Some(target_dir.to_path_buf()), "create target directory")
        })?;

        let matchers = patterns
            .iter()
            .map(|pattern| {
                let expanded = self.rule.expand(pattern, kind);
                glob::Pattern::new(&expanded)
                    .map_err(|e| Error::invalid_pattern("", expanded.clone(), e.msg))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = CopyResult::default();
        let mut listed = HashSet::new();

        for source_dir in source_dirs {
            if !source_dir.is_dir() {
                debug!(source = %source_dir.display(), "Source directory missing, skipping");
                continue;
            }
            for matcher in &matchers {
                for source in matching_files(source_dir, matcher, self.rule.match_options())? {
                    let Some(name) = source.file_name() else {
                        continue;
                    };
                    let dest = target_dir.join(name);
                    copy_artifact(&source, &dest)?;
                    trace!(from = %source.display(), to = %dest.display(), "Copied artifact");
                    if listed.insert(dest.clone()) {
                        result.files.push(dest);
                    }
                }
            }
        }

        debug!(
            target = %target_dir.display(),
            count = result.len(),
            "Copy finished"
        );
        Ok(result)
    }
}

/// Files (or symlinks to files) under `dir` whose name matches, sorted by
/// file name.
fn matching_files(
    dir: &Path,
    matcher: &glob::Pattern,
    options: glob::MatchOptions,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf);
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory loop"));
            Error::io(source, path, "scan source directory")
        })?;

        let file_type = entry.file_type();
        let is_file = file_type.is_file()
            || (file_type.is_symlink() && entry.path().metadata().is_ok_and(|m| m.is_file()));
        if !is_file {
            continue;
        }

        if matcher.matches_with(&entry.file_name().to_string_lossy(), options) {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    Ok(files)
}

/// Whether a symlink target can resolve outside the directory holding the link.
#[cfg(unix)]
fn link_leaves_directory(link: &Path) -> bool {
    link.is_absolute()
        || link
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// Copy one artifact so that a concurrent reader never sees a partial file.
fn copy_artifact(source: &Path, dest: &Path) -> Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |e: io::Error, path: &Path, op: &str| Error::io(e, Some(path.to_path_buf()), op);

    #[cfg(unix)]
    {
        let meta =
            fs::symlink_metadata(source).map_err(|e| io_err(e, source, "inspect artifact"))?;
        if meta.file_type().is_symlink() {
            let link = fs::read_link(source).map_err(|e| io_err(e, source, "read symlink"))?;
            if link_leaves_directory(&link) {
                tracing::warn!(
                    source = %source.display(),
                    target = %link.display(),
                    "Symlink target is outside the staged directory and may dangle"
                );
            }
            let staged = tempfile::Builder::new()
                .prefix(".relstage-")
                .make_in(dir, |path| std::os::unix::fs::symlink(&link, path))
                .map_err(|e| io_err(e, dest, "create symlink"))?;
            staged
                .persist(dest)
                .map_err(|e| io_err(e.error, dest, "install symlink"))?;
            return Ok(());
        }
    }

    let mut input = fs::File::open(source).map_err(|e| io_err(e, source, "open artifact"))?;
    let permissions = input
        .metadata()
        .map_err(|e| io_err(e, source, "inspect artifact"))?
        .permissions();

    let mut staged = tempfile::Builder::new()
        .prefix(".relstage-")
        .tempfile_in(dir)
        .map_err(|e| io_err(e, dir, "create temporary file"))?;
    io::copy(&mut input, staged.as_file_mut()).map_err(|e| io_err(e, dest, "copy artifact"))?;
    fs::set_permissions(staged.path(), permissions)
        .map_err(|e| io_err(e, dest, "set permissions"))?;
    staged
        .persist(dest)
        .map_err(|e| io_err(e.error, dest, "install artifact"))?;
    Ok(())
}
