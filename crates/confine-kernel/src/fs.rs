//! The confined filesystem: every operation, wired together.
//!
//! Control flow is the same for every call. The request path is resolved
//! against the [`Root`] first; reads use fully-resolved paths, anything that
//! may create its target uses parent-resolved ones. Mutations then take the
//! path lock and run the mutation engine on the blocking pool. Scans go
//! through the [`ScanEngine`] and never lock.
//!
//! Errors are re-labelled with the public operation name and the path exactly
//! as the caller sent it.

use std::fs::{FileType, Metadata};
use std::io::{self, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use confine_types::{
    EditArgs, EditResult, EntryKind, FileMeta, GlobArgs, GlobResult, ListArgs, ListEntry,
    ListResult, MkdirArgs, MkdirResult, PeekArgs, PeekResult, ReadArgs, ReadResult, ResolveArgs,
    ResolveMode, ResolveResult, RmdirArgs, RmdirResult, SearchArgs, SearchResult, TextEncoding,
    WriteArgs, WriteResult, WriteStrategy,
};
use regex::bytes::{NoExpand, Regex as BytesRegex};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::brace::expand_braces;
use crate::classify::{detect_mime, hash_file, is_text, sample_file};
use crate::config::FsConfig;
use crate::error::{ErrorKind, FsError, FsResult};
use crate::lock::{PathLocker, SentinelLocker};
use crate::mutate::{self, DEFAULT_DIR_MODE, format_mode, parse_mode, permission_bits};
use crate::resolve::{ResolvedPath, Root};
use crate::scan::{LineMatcher, ScanEngine, ScanLimits, compile_glob, static_prefix};

/// Root-confined, lock-aware file access.
pub struct ConfinedFs {
    root: Root,
    config: FsConfig,
    locker: Arc<dyn PathLocker>,
    scanner: ScanEngine,
}

impl std::fmt::Debug for ConfinedFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfinedFs")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConfinedFs {
    /// Confine operations to `root` with the given configuration.
    pub fn new(root: impl AsRef<Path>, config: FsConfig) -> FsResult<Self> {
        config
            .validate()
            .map_err(|e| FsError::new("config", "", ErrorKind::InvalidArgument(e.to_string())))?;
        let root = Root::new(root)?;
        let locker: Arc<dyn PathLocker> = Arc::new(SentinelLocker::from_config(&config));
        let scanner = ScanEngine::new(root.clone(), ScanLimits::from(&config));
        Ok(Self {
            root,
            config,
            locker,
            scanner,
        })
    }

    /// Swap the lock implementation.
    pub fn with_locker(mut self, locker: Arc<dyn PathLocker>) -> Self {
        self.locker = locker;
        self
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn resolve_for(&self, op: &'static str, request: &str, mode: ResolveMode) -> FsResult<ResolvedPath> {
        self.root
            .resolve(request, mode)
            .map_err(|e| e.in_op(op).for_path(request))
    }

    /// Resolve a path without touching its content.
    #[tracing::instrument(skip(self, args), fields(path = %args.path), name = "fs.resolve")]
    pub fn resolve(&self, args: &ResolveArgs) -> FsResult<ResolveResult> {
        let resolved = self.resolve_for("resolve", &args.path, args.mode)?;
        Ok(ResolveResult {
            path: self.root.relative(&resolved),
            absolute: resolved.display().to_string(),
        })
    }

    /// Read the head of a file.
    #[tracing::instrument(skip(self, args), fields(path = %args.path), name = "fs.read")]
    pub async fn read(&self, args: &ReadArgs) -> FsResult<ReadResult> {
        let op = "read";
        let target = self.resolve_for(op, &args.path, ResolveMode::FullyResolved)?;
        let meta = regular_file(op, &args.path, &target).await?;
        let limit = nonzero(args.max_bytes).unwrap_or(self.config.read_max_bytes);

        let file = tokio::fs::File::open(&target)
            .await
            .map_err(FsError::io_with(op, &args.path))?;
        let mut buf = Vec::new();
        file.take(limit)
            .read_to_end(&mut buf)
            .await
            .map_err(FsError::io_with(op, &args.path))?;

        let truncated = meta.len() > buf.len() as u64;
        let sha256 = self.hash_of(&target, meta.len()).await;
        let mime_type = self.mime_of(&target, &buf);
        let (encoding, content) = encode(args.encoding, &buf);
        debug!(size = meta.len(), returned = buf.len(), truncated, "read");

        Ok(ReadResult {
            path: args.path.clone(),
            size: meta.len(),
            mime_type,
            sha256,
            encoding,
            content,
            truncated,
            meta: file_meta(&meta),
        })
    }

    /// Read a window of a file starting at a byte offset.
    #[tracing::instrument(skip(self, args), fields(path = %args.path, offset = args.offset), name = "fs.peek")]
    pub async fn peek(&self, args: &PeekArgs) -> FsResult<PeekResult> {
        let op = "peek";
        let target = self.resolve_for(op, &args.path, ResolveMode::FullyResolved)?;
        let meta = regular_file(op, &args.path, &target).await?;
        let window = nonzero(args.max_bytes).unwrap_or(self.config.peek_max_bytes);
        let size = meta.len();

        let mut buf = Vec::new();
        if args.offset < size {
            let mut file = tokio::fs::File::open(&target)
                .await
                .map_err(FsError::io_with(op, &args.path))?;
            file.seek(SeekFrom::Start(args.offset))
                .await
                .map_err(FsError::io_with(op, &args.path))?;
            file.take(window)
                .read_to_end(&mut buf)
                .await
                .map_err(FsError::io_with(op, &args.path))?;
        }
        let eof = args.offset.saturating_add(buf.len() as u64) >= size;
        let (encoding, content) = encode(args.encoding, &buf);

        Ok(PeekResult {
            path: args.path.clone(),
            offset: args.offset,
            size,
            eof,
            encoding,
            content,
            meta: file_meta(&meta),
        })
    }

    /// Write a payload with one of the write strategies.
    #[tracing::instrument(skip(self, args, cancel), fields(path = %args.path, strategy = %args.strategy), name = "fs.write")]
    pub async fn write(&self, args: &WriteArgs, cancel: &CancellationToken) -> FsResult<WriteResult> {
        let op = "write";
        let invalid = |kind: ErrorKind| FsError::new(op, &args.path, kind);

        let strategy = WriteStrategy::from_parts(args.strategy, args.start, args.end)
            .map_err(|e| invalid(ErrorKind::InvalidArgument(e.to_string())))?;
        let payload = decode(args.encoding, &args.content).map_err(invalid)?;
        let mode = args
            .mode
            .as_deref()
            .map(parse_mode)
            .transpose()
            .map_err(invalid)?;

        let target = self.resolve_for(op, &args.path, ResolveMode::ParentResolved)?;
        if target.as_path() == self.root.path() {
            return Err(invalid(ErrorKind::IsDirectory));
        }
        let create_dirs = args.create_dirs.unwrap_or(self.config.create_dirs_default);
        mutate::ensure_parent(&target, create_dirs).map_err(|e| e.in_op(op).for_path(&args.path))?;

        let lock = self
            .locker
            .acquire(&target, self.config.lock_timeout(), cancel)
            .await
            .map_err(|e| e.in_op(op).for_path(&args.path))?;

        let max_size = self.config.max_file_size;
        let (hash_cap, sniff_cap) = (self.config.hash_max_bytes, self.config.sniff_max_bytes);
        let path = target.into_path_buf();
        // The handle travels with the blocking job so the sentinel outlives an
        // abandoned caller until the commit has landed.
        let (created, described) = blocking(op, &args.path, move || {
            let _lock = lock;
            let created = mutate::apply(&path, strategy, &payload, mode, max_size)?;
            let described = describe(&path, hash_cap, sniff_cap)
                .map_err(|e| FsError::io("write", String::new(), e))?;
            Ok((created, described))
        })
        .await?;

        debug!(bytes = described.size, created, "write complete");
        Ok(WriteResult {
            path: args.path.clone(),
            action: strategy.as_str().to_string(),
            bytes: described.size,
            created,
            mime_type: described.mime_type,
            sha256: described.sha256,
            meta: described.meta,
        })
    }

    /// Replace occurrences of a substring or regular expression in a file.
    ///
    /// `count = 0` replaces every occurrence. A file with no occurrences is
    /// left untouched.
    #[tracing::instrument(skip(self, args, cancel), fields(path = %args.path, regex = args.regex), name = "fs.edit")]
    pub async fn edit(&self, args: &EditArgs, cancel: &CancellationToken) -> FsResult<EditResult> {
        let op = "edit";
        let invalid = |kind: ErrorKind| FsError::new(op, &args.path, kind);

        if args.pattern.is_empty() {
            return Err(invalid(ErrorKind::InvalidPattern("empty pattern".into())));
        }
        let source = if args.regex {
            args.pattern.clone()
        } else {
            regex::escape(&args.pattern)
        };
        let re = BytesRegex::new(&source)
            .map_err(|e| invalid(ErrorKind::InvalidPattern(e.to_string())))?;

        let target = self.resolve_for(op, &args.path, ResolveMode::ParentResolved)?;
        let meta = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(FsError::io_with(op, &args.path))?;
        check_editable(&meta).map_err(invalid)?;

        let lock = self
            .locker
            .acquire(&target, self.config.lock_timeout(), cancel)
            .await
            .map_err(|e| e.in_op(op).for_path(&args.path))?;

        let literal = !args.regex;
        let replace = args.replace.clone();
        let limit = args.count;
        let max_size = self.config.max_file_size;
        let (hash_cap, sniff_cap) = (self.config.hash_max_bytes, self.config.sniff_max_bytes);
        let path = target.into_path_buf();
        let (replacements, described) = blocking(op, &args.path, move || {
            let _lock = lock;
            let io_err = |e: io::Error| FsError::io("edit", String::new(), e);
            // Re-check under the lock; the target may have been swapped.
            let meta = std::fs::symlink_metadata(&path).map_err(io_err)?;
            check_editable(&meta).map_err(|kind| FsError::new("edit", String::new(), kind))?;

            let data = std::fs::read(&path).map_err(io_err)?;
            let found = re.find_iter(&data).count();
            let replacements = if limit == 0 { found } else { found.min(limit) };
            if replacements > 0 {
                let updated = if literal {
                    re.replacen(&data, limit, NoExpand(replace.as_bytes()))
                } else {
                    re.replacen(&data, limit, replace.as_bytes())
                };
                if updated.len() as u64 > max_size {
                    return Err(FsError::new(
                        "edit",
                        String::new(),
                        ErrorKind::FileTooLarge {
                            size: updated.len() as u64,
                            limit: max_size,
                        },
                    ));
                }
                mutate::atomic_write(&path, &updated, permission_bits(&meta)).map_err(io_err)?;
            }
            let described = describe(&path, hash_cap, sniff_cap).map_err(io_err)?;
            Ok((replacements, described))
        })
        .await?;

        debug!(replacements, bytes = described.size, "edit complete");
        Ok(EditResult {
            path: args.path.clone(),
            replacements,
            bytes: described.size,
            sha256: described.sha256,
            meta: described.meta,
        })
    }

    /// List a directory, or describe a single file.
    ///
    /// Entries are ordered by name within each directory; recursive listings
    /// are depth-first. Symlinks are reported, never followed.
    #[tracing::instrument(skip(self, args, cancel), fields(path = %args.path, recursive = args.recursive), name = "fs.list")]
    pub async fn list(&self, args: &ListArgs, cancel: &CancellationToken) -> FsResult<ListResult> {
        let op = "list";
        let request = if args.path.is_empty() { "." } else { args.path.as_str() };
        let base = self.resolve_for(op, request, ResolveMode::FullyResolved)?;
        let max = nonzero(args.max_entries).unwrap_or(self.config.list_max_entries);

        let meta = tokio::fs::metadata(&base)
            .await
            .map_err(FsError::io_with(op, request))?;
        if !meta.is_dir() {
            return Ok(ListResult {
                entries: vec![self.entry(&base, &meta)],
                truncated: false,
            });
        }

        let mut out = ListResult::default();
        let first = read_sorted(&base).await.map_err(FsError::io_with(op, request))?;
        let mut stack = vec![first.into_iter()];
        while let Some(level) = stack.last_mut() {
            let Some((path, meta)) = level.next() else {
                stack.pop();
                continue;
            };
            if cancel.is_cancelled() {
                return Err(FsError::new(op, request, ErrorKind::Cancelled));
            }
            if out.entries.len() >= max {
                out.truncated = true;
                break;
            }
            out.entries.push(self.entry(&path, &meta));
            if args.recursive && meta.is_dir() {
                match read_sorted(&path).await {
                    Ok(children) => stack.push(children.into_iter()),
                    Err(e) => warn!(dir = %path.display(), error = %e, "skipping unreadable directory"),
                }
            }
        }

        debug!(entries = out.entries.len(), truncated = out.truncated, "list");
        Ok(out)
    }

    fn entry(&self, path: &Path, meta: &Metadata) -> ListEntry {
        ListEntry {
            path: self.root.relative(path),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            kind: entry_kind(&meta.file_type()),
            size: meta.len(),
            mode: format_mode(permission_bits(meta)),
            modified_at: modified_at(meta),
        }
    }

    /// Search file contents line by line.
    #[tracing::instrument(skip(self, args, cancel), fields(pattern = %args.pattern, regex = args.regex), name = "fs.search")]
    pub async fn search(&self, args: &SearchArgs, cancel: &CancellationToken) -> FsResult<SearchResult> {
        let op = "search";
        let request = args.path.as_deref().filter(|p| !p.is_empty()).unwrap_or(".");
        let matcher = LineMatcher::new(&args.pattern, args.regex)
            .map_err(|kind| FsError::new(op, request, kind))?;
        let start = self.resolve_for(op, request, ResolveMode::FullyResolved)?;
        tokio::fs::metadata(&start)
            .await
            .map_err(FsError::io_with(op, request))?;
        let max = nonzero(args.max_results).unwrap_or(self.config.search_max_results);

        let outcome = self
            .scanner
            .search(&start, matcher, max, cancel)
            .await
            .map_err(|e| e.in_op(op).for_path(request))?;
        Ok(SearchResult {
            matches: outcome.matches,
            truncated: outcome.limit_reached,
            statistics: Some(outcome.stats),
        })
    }

    /// Match root-relative file paths against a glob pattern.
    #[tracing::instrument(skip(self, args, cancel), fields(pattern = %args.pattern), name = "fs.glob")]
    pub async fn glob(&self, args: &GlobArgs, cancel: &CancellationToken) -> FsResult<GlobResult> {
        let op = "glob";
        let pattern = self
            .relative_pattern(&args.pattern)
            .map_err(|kind| FsError::new(op, &args.pattern, kind))?;
        let matcher = compile_glob(&pattern).map_err(|kind| FsError::new(op, &args.pattern, kind))?;
        let max = nonzero(args.max_results).unwrap_or(self.config.glob_max_results);

        let prefix = static_prefix(&pattern);
        let start = self.root.path().join(&prefix);
        if !prefix.as_os_str().is_empty() {
            // The walk never follows symlinks, so a prefix that passes through
            // one (or does not exist) matches nothing.
            match dunce::canonicalize(&start) {
                Ok(real) if real == start && real.is_dir() => {}
                Ok(_) => return Ok(GlobResult::default()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(GlobResult::default()),
                Err(e) => return Err(FsError::io(op, &args.pattern, e)),
            }
        }

        let matches = self
            .scanner
            .glob(&start, matcher, max, cancel)
            .await
            .map_err(|e| e.in_op(op).for_path(&args.pattern))?;
        debug!(matches = matches.len(), "glob");
        Ok(GlobResult { matches })
    }

    /// Express a glob relative to the root, rejecting patterns that climb out.
    fn relative_pattern(&self, pattern: &str) -> Result<String, ErrorKind> {
        if pattern.trim().is_empty() {
            return Err(ErrorKind::InvalidPattern("empty pattern".into()));
        }
        let relative = if Path::new(pattern).is_absolute() {
            let root = self.root.path().to_string_lossy().replace('\\', "/");
            let root = root.trim_end_matches('/');
            if pattern == root {
                ""
            } else {
                pattern
                    .strip_prefix(root)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .ok_or(ErrorKind::PathEscape)?
            }
        } else {
            pattern
        };

        let mut segments: Vec<&str> = Vec::new();
        for seg in relative.split('/') {
            match seg {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(prev) if !prev.contains(['*', '?', '[', '{']) => {
                        segments.pop();
                    }
                    _ => return Err(ErrorKind::PathEscape),
                },
                other => segments.push(other),
            }
        }
        if segments.is_empty() {
            return Err(ErrorKind::InvalidPattern("pattern matches nothing".into()));
        }
        Ok(segments.join("/"))
    }

    /// Create one or more directories.
    ///
    /// Every brace expansion is resolved before anything is created, so one
    /// escaping alternative fails the whole request.
    #[tracing::instrument(skip(self, args), fields(path = %args.path), name = "fs.mkdir")]
    pub async fn mkdir(&self, args: &MkdirArgs) -> FsResult<MkdirResult> {
        let op = "mkdir";
        let invalid = |kind: ErrorKind| FsError::new(op, &args.path, kind);
        let mode = match args.mode.as_deref() {
            Some(raw) if !raw.is_empty() => parse_mode(raw).map_err(invalid)?,
            _ => DEFAULT_DIR_MODE,
        };

        let requests = if args.brace_expand {
            expand_braces(&args.path).map_err(invalid)?
        } else {
            vec![args.path.clone()]
        };
        let targets = requests
            .iter()
            .map(|r| self.resolve_for(op, r, ResolveMode::ParentResolved))
            .collect::<FsResult<Vec<_>>>()?;

        let mut created = false;
        let mut paths = Vec::with_capacity(targets.len());
        for target in &targets {
            match tokio::fs::symlink_metadata(target).await {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(invalid(ErrorKind::NotDirectory)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let mut builder = tokio::fs::DirBuilder::new();
                    builder.recursive(args.parents);
                    #[cfg(unix)]
                    builder.mode(mode);
                    builder
                        .create(target)
                        .await
                        .map_err(FsError::io_with(op, &args.path))?;
                    created = true;
                }
                Err(e) => return Err(FsError::io(op, &args.path, e)),
            }
            paths.push(self.root.relative(target));
        }

        let meta = match targets.first() {
            Some(first) => tokio::fs::symlink_metadata(first)
                .await
                .map(|m| file_meta(&m))
                .map_err(FsError::io_with(op, &args.path))?,
            None => FileMeta::default(),
        };
        debug!(created, count = paths.len(), "mkdir");
        Ok(MkdirResult {
            path: args.path.clone(),
            created,
            paths,
            meta,
        })
    }

    /// Remove a directory, optionally with its contents.
    #[tracing::instrument(skip(self, args), fields(path = %args.path, recursive = args.recursive), name = "fs.rmdir")]
    pub async fn rmdir(&self, args: &RmdirArgs) -> FsResult<RmdirResult> {
        let op = "rmdir";
        let target = self.resolve_for(op, &args.path, ResolveMode::ParentResolved)?;
        if target.as_path() == self.root.path() {
            return Err(FsError::new(
                op,
                &args.path,
                ErrorKind::InvalidArgument("refusing to remove the root".into()),
            ));
        }
        let meta = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(FsError::io_with(op, &args.path))?;
        if !meta.is_dir() {
            return Err(FsError::new(op, &args.path, ErrorKind::NotDirectory));
        }

        let removed = if args.recursive {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_dir(&target).await
        };
        removed.map_err(FsError::io_with(op, &args.path))?;
        debug!("rmdir");
        Ok(RmdirResult {
            path: args.path.clone(),
            removed: true,
        })
    }

    async fn hash_of(&self, path: &Path, size: u64) -> String {
        let cap = self.config.hash_max_bytes;
        if size > cap {
            debug!(size, cap, "skipping hash above cap");
            return String::new();
        }
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || hash_file(&path, cap)).await {
            Ok(Ok(Some(hash))) => hash,
            _ => String::new(),
        }
    }

    fn mime_of(&self, path: &Path, bytes: &[u8]) -> String {
        let sniff = bytes.len().min(self.config.sniff_max_bytes as usize);
        detect_mime(&path.to_string_lossy(), &bytes[..sniff]).to_string()
    }
}

/// `Some(v)` unless `v` is zero or unset.
fn nonzero<T: Copy + Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

async fn regular_file(op: &'static str, request: &str, target: &Path) -> FsResult<Metadata> {
    let meta = tokio::fs::metadata(target)
        .await
        .map_err(FsError::io_with(op, request))?;
    if meta.is_dir() {
        return Err(FsError::new(op, request, ErrorKind::IsDirectory));
    }
    if !meta.is_file() {
        return Err(FsError::new(op, request, ErrorKind::NotRegularFile));
    }
    Ok(meta)
}

fn check_editable(meta: &Metadata) -> Result<(), ErrorKind> {
    if meta.file_type().is_symlink() {
        return Err(ErrorKind::IsSymlink);
    }
    if meta.is_dir() {
        return Err(ErrorKind::IsDirectory);
    }
    if !meta.is_file() {
        return Err(ErrorKind::NotRegularFile);
    }
    Ok(())
}

/// Run blocking filesystem work off the async runtime.
async fn blocking<T, F>(op: &'static str, request: &str, f: F) -> FsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FsResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res.map_err(|e| e.in_op(op).for_path(request)),
        Err(e) => Err(FsError::io(op, request, io::Error::other(e))),
    }
}

/// Post-mutation snapshot of a file.
struct Described {
    size: u64,
    mime_type: String,
    sha256: String,
    meta: FileMeta,
}

fn describe(path: &Path, hash_cap: u64, sniff_cap: u64) -> io::Result<Described> {
    let meta = std::fs::symlink_metadata(path)?;
    let sha256 = hash_file(path, hash_cap)?.unwrap_or_default();
    let sample = sample_file(path, sniff_cap)?;
    Ok(Described {
        size: meta.len(),
        mime_type: detect_mime(&path.to_string_lossy(), &sample).to_string(),
        sha256,
        meta: file_meta(&meta),
    })
}

async fn read_sorted(dir: &Path) -> io::Result<Vec<(std::path::PathBuf, Metadata)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // Entries that vanish mid-listing are dropped.
        if let Ok(meta) = tokio::fs::symlink_metadata(entry.path()).await {
            out.push((entry.path(), meta));
        }
    }
    out.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(out)
}

fn encode(requested: Option<TextEncoding>, bytes: &[u8]) -> (TextEncoding, String) {
    let encoding = requested.unwrap_or(if is_text(bytes) {
        TextEncoding::Text
    } else {
        TextEncoding::Base64
    });
    let content = match encoding {
        TextEncoding::Text => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Base64 => BASE64.encode(bytes),
    };
    (encoding, content)
}

fn decode(encoding: TextEncoding, content: &str) -> Result<Vec<u8>, ErrorKind> {
    match encoding {
        TextEncoding::Text => Ok(content.as_bytes().to_vec()),
        TextEncoding::Base64 => BASE64
            .decode(content.trim())
            .map_err(|e| ErrorKind::InvalidArgument(format!("invalid base64 content: {e}"))),
    }
}

pub(crate) fn file_meta(meta: &Metadata) -> FileMeta {
    FileMeta {
        mode: format_mode(permission_bits(meta)),
        modified_at: modified_at(meta),
    }
}

fn modified_at(meta: &Metadata) -> String {
    meta.modified()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn entry_kind(file_type: &FileType) -> EntryKind {
    if file_type.is_symlink() {
        return EntryKind::Symlink;
    }
    if file_type.is_dir() {
        return EntryKind::Dir;
    }
    if file_type.is_file() {
        return EntryKind::File;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_fifo() {
            return EntryKind::Pipe;
        }
        if file_type.is_socket() {
            return EntryKind::Socket;
        }
        if file_type.is_block_device() || file_type.is_char_device() {
            return EntryKind::Device;
        }
    }
    EntryKind::Other
}
