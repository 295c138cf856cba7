//! Man page scanner.
//!
//! Collects every regular file whose name ends with the man page suffix into
//! one source unit. Traversal is depth-first with directory entries visited
//! in lexical byte order, so the `Files` order is stable across runs.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::unit::{Key, SourceUnit};
use crate::ports::Scanner;

pub const MAN_PAGE_SUFFIX: &str = ".1p.txt";
pub const MAN_UNIT_NAME: &str = "man";
pub const MAN_UNIT_TYPE: &str = "ManPages";

#[derive(Debug, Clone)]
pub struct ManPageScanner {
    pub suffix: String,
    pub unit_name: String,
    pub unit_type: String,
}

impl Default for ManPageScanner {
    fn default() -> Self {
        Self {
            suffix: MAN_PAGE_SUFFIX.to_string(),
            unit_name: MAN_UNIT_NAME.to_string(),
            unit_type: MAN_UNIT_TYPE.to_string(),
        }
    }
}

impl ManPageScanner {
    fn matches(&self, file_name: &std::ffi::OsStr) -> bool {
        file_name.to_string_lossy().ends_with(&self.suffix)
    }
}

impl Scanner for ManPageScanner {
    /// Resolves symlinks in `root`, then walks the real path. Any walk error
    /// aborts the scan. Zero matches still yield one unit.
    fn scan(&self, root: &Path) -> Result<Vec<SourceUnit>> {
        let scan_dir = fs::canonicalize(root)
            .with_context(|| format!("resolving the path to scan {} failed", root.display()))?;
        info!(root = %scan_dir.display(), suffix = %self.suffix, "scanning for man pages");

        let mut files = Vec::new();
        for entry in WalkDir::new(&scan_dir).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("walking directory {} failed", scan_dir.display()))?;
            if !entry.file_type().is_file() || !self.matches(entry.file_name()) {
                continue;
            }
            let rel = entry.path().strip_prefix(&scan_dir).with_context(|| {
                format!(
                    "making path {} relative to {} failed",
                    entry.path().display(),
                    scan_dir.display()
                )
            })?;
            let rel = rel
                .to_str()
                .ok_or_else(|| anyhow!("path {} is not valid UTF-8", entry.path().display()))?;
            debug!(file = rel, "found man page");
            files.push(rel.to_string());
        }
        info!(matches = files.len(), "scan finished");

        Ok(vec![SourceUnit::new(
            Key::new(self.unit_type.clone(), self.unit_name.clone()),
            files,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "NAME\n").unwrap();
    }

    #[test]
    fn test_scan_selects_suffix_only() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "foo.1p.txt");
        touch(dir.path(), "bar.1p.txt");
        touch(dir.path(), "README.md");
        touch(dir.path(), "notes.1p.txt.bak");
        touch(dir.path(), "sub/baz.1p.txt");
        fs::create_dir_all(dir.path().join("dir.1p.txt")).unwrap();

        let units = ManPageScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.key.name, "man");
        assert_eq!(unit.key.unit_type, "ManPages");

        let expected: Vec<String> = vec![
            "bar.1p.txt".to_string(),
            "foo.1p.txt".to_string(),
            Path::new("sub").join("baz.1p.txt").to_string_lossy().into_owned(),
        ];
        assert_eq!(unit.info.files, expected);
    }

    #[test]
    fn test_scan_empty_tree_yields_one_empty_unit() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "README.md");

        let units = ManPageScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].info.files.is_empty());
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ManPageScanner::default().scan(&missing).unwrap_err();
        assert!(err.to_string().contains("resolving the path to scan"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_aborts_on_unreadable_subdirectory() {
        use crate::application::ScanUsecase;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        touch(dir.path(), "a.1p.txt");
        touch(dir.path(), "locked/b.1p.txt");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode bits; nothing to observe then.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scanner = ManPageScanner::default();
        let err = scanner.scan(dir.path()).unwrap_err();
        assert!(err.to_string().contains("walking directory"), "got: {:#}", err);

        let mut out = Vec::new();
        assert!(ScanUsecase { scanner: &scanner }.run(dir.path(), &mut out).is_err());
        assert!(out.is_empty());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_symlinks_and_resolves_root() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        touch(&real, "ls.1p.txt");
        symlink(real.join("ls.1p.txt"), real.join("link.1p.txt")).unwrap();
        let alias = dir.path().join("alias");
        symlink(&real, &alias).unwrap();

        let units = ManPageScanner::default().scan(&alias).unwrap();
        assert_eq!(units[0].info.files, vec!["ls.1p.txt".to_string()]);
    }
}
