//! Atomic mutation engine.
//!
//! Every strategy except `append` stages the complete new content in a
//! temporary sibling (`.confine-*`), flushes it, applies permissions and then
//! renames it over the target. The rename is the atomicity boundary: readers
//! see either the old file or the new one. A staging failure drops the
//! temporary file and leaves the target untouched.
//!
//! On Windows a failed replace falls back to remove-then-rename, which opens a
//! brief window where the target is absent.
//!
//! These functions are synchronous; the async layer runs them on the blocking
//! pool while holding the path lock.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use confine_types::WriteStrategy;
use tracing::debug;

use crate::error::{ErrorKind, FsError, FsResult};

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIR_MODE: u32 = 0o755;

const STAGING_PREFIX: &str = ".confine-";

/// Parse an octal permission string such as `"644"`, `"0755"` or `"0o600"`.
pub fn parse_mode(raw: &str) -> Result<u32, ErrorKind> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ErrorKind::InvalidArgument("empty mode".into()));
    }
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| ErrorKind::InvalidArgument(format!("invalid octal mode {raw:?}")))?;
    if mode > 0o777 {
        return Err(ErrorKind::InvalidArgument(format!(
            "mode {raw:?} exceeds 0777"
        )));
    }
    Ok(mode)
}

/// Render permission bits the way results report them (`"0644"`).
pub fn format_mode(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

/// Permission bits of an existing file.
#[cfg(unix)]
pub fn permission_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
pub fn permission_bits(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, perms)
}

/// `symlink_metadata` that maps a missing path to `None`.
pub fn lstat(path: &Path) -> io::Result<Option<Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Make sure the parent directory of `target` exists.
///
/// Missing parents are created (mode 0755) only when `create_dirs` is set.
pub fn ensure_parent(target: &Path, create_dirs: bool) -> FsResult<()> {
    let display = target.display().to_string();
    let Some(parent) = target.parent() else {
        return Ok(());
    };
    match fs::metadata(parent) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::new("write", display, ErrorKind::NotDirectory)),
        Err(e) if e.kind() == io::ErrorKind::NotFound && create_dirs => {
            create_dir_all(parent, DEFAULT_DIR_MODE).map_err(FsError::io_with("write", &display))
        }
        Err(e) => Err(FsError::io("write", display, e)),
    }
}

#[cfg(unix)]
pub(crate) fn create_dir_all(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
pub(crate) fn create_dir_all(path: &Path, _mode: u32) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}

/// Stage content produced by `fill` next to `target` and rename it into place.
///
/// With `no_clobber` the final step refuses to replace an existing file, so
/// create-only writes cannot race with a concurrent creator.
pub fn stage_and_commit<F>(target: &Path, mode: u32, no_clobber: bool, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    fill(staged.as_file_mut())?;
    staged.as_file_mut().flush()?;
    staged.as_file().sync_all()?;
    set_mode(staged.path(), mode)?;

    if no_clobber {
        staged.persist_noclobber(target).map_err(|e| e.error)?;
    } else {
        persist_replace(staged, target)?;
    }
    sync_dir(dir);
    Ok(())
}

/// Replace `target` with `data` atomically.
pub fn atomic_write(target: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    stage_and_commit(target, mode, false, |file| file.write_all(data))
}

#[cfg(not(windows))]
fn persist_replace(staged: tempfile::NamedTempFile, target: &Path) -> io::Result<()> {
    staged.persist(target).map(|_| ()).map_err(|e| e.error)
}

#[cfg(windows)]
fn persist_replace(staged: tempfile::NamedTempFile, target: &Path) -> io::Result<()> {
    match staged.persist(target) {
        Ok(_) => Ok(()),
        Err(e) => {
            debug!(target = %target.display(), error = %e.error, "rename failed, removing target first");
            match fs::remove_file(target) {
                Ok(()) => {}
                Err(rm) if rm.kind() == io::ErrorKind::NotFound => {}
                Err(rm) => return Err(rm),
            }
            e.file.persist(target).map(|_| ()).map_err(|e| e.error)
        }
    }
}

/// Best-effort flush of the directory entry after a rename.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn check_size(display: &str, size: u64, limit: u64) -> FsResult<()> {
    if size > limit {
        return Err(FsError::new(
            "write",
            display,
            ErrorKind::FileTooLarge { size, limit },
        ));
    }
    Ok(())
}

fn require_regular(display: &str, meta: &Metadata) -> FsResult<()> {
    if meta.is_dir() {
        return Err(FsError::new("write", display, ErrorKind::IsDirectory));
    }
    if !meta.is_file() {
        return Err(FsError::new("write", display, ErrorKind::NotRegularFile));
    }
    Ok(())
}

/// Apply `strategy` to `target`.
///
/// `mode` overrides the permission bits; otherwise an existing file keeps its
/// bits and a new file gets 0644. Payloads whose resulting file would exceed
/// `max_size` are refused before anything is touched.
///
/// Returns whether the target was newly created.
pub fn apply(
    target: &Path,
    strategy: WriteStrategy,
    payload: &[u8],
    mode: Option<u32>,
    max_size: u64,
) -> FsResult<bool> {
    let display = target.display().to_string();
    let existing = lstat(target).map_err(FsError::io_with("write", &display))?;
    if existing.as_ref().is_some_and(|m| m.file_type().is_symlink()) {
        return Err(FsError::new("write", &display, ErrorKind::IsSymlink));
    }

    let perm = mode
        .or_else(|| existing.as_ref().map(permission_bits))
        .unwrap_or(DEFAULT_FILE_MODE);
    let created = existing.is_none();

    match strategy {
        WriteStrategy::Overwrite | WriteStrategy::NoClobber => {
            let no_clobber = strategy == WriteStrategy::NoClobber;
            if let Some(meta) = &existing {
                if meta.is_dir() {
                    return Err(FsError::new("write", &display, ErrorKind::IsDirectory));
                }
                if no_clobber {
                    return Err(FsError::new("write", &display, ErrorKind::AlreadyExists));
                }
            }
            check_size(&display, payload.len() as u64, max_size)?;
            stage_and_commit(target, perm, no_clobber, |file| file.write_all(payload))
                .map_err(FsError::io_with("write", &display))?;
        }

        WriteStrategy::Append => {
            let current = match &existing {
                Some(meta) => {
                    require_regular(&display, meta)?;
                    meta.len()
                }
                None => 0,
            };
            check_size(&display, current + payload.len() as u64, max_size)?;
            append(target, payload, perm, mode.is_some())
                .map_err(FsError::io_with("write", &display))?;
        }

        WriteStrategy::Prepend => {
            let old = match &existing {
                Some(meta) => {
                    require_regular(&display, meta)?;
                    check_size(&display, meta.len() + payload.len() as u64, max_size)?;
                    fs::read(target).map_err(FsError::io_with("write", &display))?
                }
                None => Vec::new(),
            };
            check_size(&display, (old.len() + payload.len()) as u64, max_size)?;
            stage_and_commit(target, perm, false, |file| {
                file.write_all(payload)?;
                file.write_all(&old)
            })
            .map_err(FsError::io_with("write", &display))?;
        }

        WriteStrategy::ReplaceRange { start, end } => {
            let Some(meta) = &existing else {
                return Err(FsError::new("write", &display, ErrorKind::NotFound));
            };
            require_regular(&display, meta)?;
            let old = fs::read(target).map_err(FsError::io_with("write", &display))?;
            let len = old.len() as u64;
            if start < 0 || end < start || end as u64 > len {
                return Err(FsError::new(
                    "write",
                    &display,
                    ErrorKind::InvalidRange { start, end, len },
                ));
            }
            let (start, end) = (start as usize, end as usize);
            check_size(
                &display,
                (old.len() - (end - start) + payload.len()) as u64,
                max_size,
            )?;
            stage_and_commit(target, perm, false, |file| {
                file.write_all(&old[..start])?;
                file.write_all(payload)?;
                file.write_all(&old[end..])
            })
            .map_err(FsError::io_with("write", &display))?;
        }
    }

    debug!(path = %target.display(), strategy = %strategy, bytes = payload.len(), created, "write applied");
    Ok(created)
}

fn append(target: &Path, payload: &[u8], perm: u32, reset_mode: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(perm);
    }
    let mut file = options.open(target)?;
    file.write_all(payload)?;
    file.sync_all()?;
    if reset_mode {
        set_mode(target, perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confine_types::ErrorCode;
    use tempfile::TempDir;

    const MAX: u64 = 1 << 30;

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(STAGING_PREFIX))
            .collect()
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o600").unwrap(), 0o600);
        assert!(parse_mode("").is_err());
        assert!(parse_mode("999").is_err());
        assert!(parse_mode("1777").is_err());
        assert_eq!(format_mode(0o644), "0644");
    }

    #[test]
    fn test_strategy_sequence() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("seq.txt");

        assert!(apply(&p, WriteStrategy::Overwrite, b"A", None, MAX).unwrap());
        assert!(!apply(&p, WriteStrategy::Append, b"C", None, MAX).unwrap());
        apply(&p, WriteStrategy::Prepend, b"Z", None, MAX).unwrap();
        assert_eq!(fs::read(&p).unwrap(), b"ZAC");
        apply(&p, WriteStrategy::ReplaceRange { start: 1, end: 2 }, b"XY", None, MAX).unwrap();
        assert_eq!(fs::read(&p).unwrap(), b"ZXYC");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_no_clobber() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("keep.txt");
        fs::write(&p, "original").unwrap();

        let err = apply(&p, WriteStrategy::NoClobber, b"new", None, MAX).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(fs::read_to_string(&p).unwrap(), "original");

        let fresh = dir.path().join("fresh.txt");
        assert!(apply(&fresh, WriteStrategy::NoClobber, b"new", None, MAX).unwrap());
        assert_eq!(fs::read_to_string(&fresh).unwrap(), "new");
    }

    #[test]
    fn test_invalid_ranges() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("r.txt");
        fs::write(&p, "abc").unwrap();

        for (start, end) in [(-1, 1), (2, 1), (0, 4)] {
            let err = apply(&p, WriteStrategy::ReplaceRange { start, end }, b"x", None, MAX)
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidRange);
        }
        assert_eq!(fs::read_to_string(&p).unwrap(), "abc");

        // Insertion at the end is a valid empty range.
        apply(&p, WriteStrategy::ReplaceRange { start: 3, end: 3 }, b"d", None, MAX).unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "abcd");

        let missing = dir.path().join("missing.txt");
        let err = apply(&missing, WriteStrategy::ReplaceRange { start: 0, end: 0 }, b"x", None, MAX)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_directory_targets_refused() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        for strategy in [
            WriteStrategy::Overwrite,
            WriteStrategy::NoClobber,
            WriteStrategy::Append,
            WriteStrategy::Prepend,
        ] {
            let err = apply(&sub, strategy, b"x", None, MAX).unwrap_err();
            assert_eq!(err.code(), ErrorCode::IsDirectory, "{strategy}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_target_refused() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.txt");
        fs::write(&real, "real").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let err = apply(&link, WriteStrategy::Overwrite, b"x", None, MAX).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IsSymlink);
        assert_eq!(fs::read_to_string(&real).unwrap(), "real");
    }

    #[test]
    fn test_staging_failure_leaves_original() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("precious.txt");
        fs::write(&p, "precious").unwrap();

        let err = stage_and_commit(&p, 0o644, false, |file| {
            file.write_all(b"half-writ")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(fs::read_to_string(&p).unwrap(), "precious");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("big.txt");
        fs::write(&p, "0123456789").unwrap();

        let err = apply(&p, WriteStrategy::Overwrite, &[b'x'; 2048], None, 1024).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileTooLarge);
        let err = apply(&p, WriteStrategy::Append, &[b'x'; 1020], None, 1024).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileTooLarge);
        assert_eq!(fs::read_to_string(&p).unwrap(), "0123456789");
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_preserved_and_overridden() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let p = dir.path().join("m.sh");
        fs::write(&p, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&p, fs::Permissions::from_mode(0o750)).unwrap();

        apply(&p, WriteStrategy::Overwrite, b"echo hi\n", None, MAX).unwrap();
        assert_eq!(fs::metadata(&p).unwrap().permissions().mode() & 0o777, 0o750);

        apply(&p, WriteStrategy::Overwrite, b"echo hi\n", Some(0o600), MAX).unwrap();
        assert_eq!(fs::metadata(&p).unwrap().permissions().mode() & 0o777, 0o600);

        let fresh = dir.path().join("fresh.txt");
        apply(&fresh, WriteStrategy::Overwrite, b"x", None, MAX).unwrap();
        assert_eq!(
            fs::metadata(&fresh).unwrap().permissions().mode() & 0o777,
            DEFAULT_FILE_MODE
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_mode_ignores_umask_for_every_strategy() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let appended = dir.path().join("appended.log");
        let overwritten = dir.path().join("overwritten.log");

        apply(&appended, WriteStrategy::Append, b"a", Some(0o666), MAX).unwrap();
        apply(&overwritten, WriteStrategy::Overwrite, b"a", Some(0o666), MAX).unwrap();

        let bits = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(bits(&appended), 0o666);
        assert_eq!(bits(&overwritten), 0o666);
    }

    #[test]
    fn test_ensure_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c.txt");

        let err = ensure_parent(&nested, false).unwrap_err();
        assert!(err.is_not_found());

        ensure_parent(&nested, true).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }
}
