//! Concurrent scan engine for `search` and `glob`.
//!
//! One traversal task walks the tree depth-first and feeds regular files into
//! a bounded queue. A fixed pool of workers drains it. Matches land in a
//! `Collector` whose push and length check share one critical section; the
//! push that fills it cancels the scan token, which the traversal and every
//! worker check between files and between lines.
//!
//! Unreadable directories and files are skipped, never surfaced. Result order
//! across files is unspecified.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use confine_types::{SearchMatch, SearchStats};
use globset::{GlobBuilder, GlobMatcher};
use parking_lot::Mutex;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::classify::is_binary_extension;
use crate::config::FsConfig;
use crate::error::{ErrorKind, FsError, FsResult};
use crate::resolve::Root;

/// Knobs for one scan, taken from [`FsConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub workers: usize,
    pub queue_capacity: usize,
    pub skip_file_size: u64,
    pub max_lines: usize,
    pub line_display_max: usize,
}

impl From<&FsConfig> for ScanLimits {
    fn from(config: &FsConfig) -> Self {
        Self {
            workers: config.effective_workers(),
            queue_capacity: config.queue_capacity,
            skip_file_size: config.search_skip_file_size,
            max_lines: config.search_max_lines,
            line_display_max: config.search_line_display_max,
        }
    }
}

/// A regular file found by the traversal.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub path: PathBuf,
    /// Root-relative, forward-slash path.
    pub relative: String,
}

/// Which files the traversal hands to workers.
#[derive(Debug, Clone, Copy, Default)]
struct TraversalFilter {
    skip_binary: bool,
    max_size: Option<u64>,
}

impl TraversalFilter {
    fn admits(&self, path: &Path, size: u64) -> bool {
        if self.skip_binary && is_binary_extension(path) {
            return false;
        }
        self.max_size.is_none_or(|max| size <= max)
    }
}

/// Bounded, shared result set.
pub(crate) struct Collector<T> {
    items: Mutex<Vec<T>>,
    max: usize,
    full: CancellationToken,
}

impl<T> Collector<T> {
    /// `full` is cancelled by the push that reaches `max`.
    pub fn new(max: usize, full: CancellationToken) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            max: max.max(1),
            full,
        }
    }

    /// Add an item; returns false once the collector is full.
    pub fn push(&self, item: T) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.max {
            return false;
        }
        items.push(item);
        if items.len() >= self.max {
            self.full.cancel();
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items.into_inner()
    }
}

/// Line predicate for search.
#[derive(Debug, Clone)]
pub enum LineMatcher {
    Literal(String),
    Regex(Regex),
}

impl LineMatcher {
    pub fn new(pattern: &str, regex: bool) -> Result<Self, ErrorKind> {
        if pattern.is_empty() {
            return Err(ErrorKind::InvalidPattern("empty pattern".into()));
        }
        if regex {
            Regex::new(pattern)
                .map(LineMatcher::Regex)
                .map_err(|e| ErrorKind::InvalidPattern(e.to_string()))
        } else {
            Ok(LineMatcher::Literal(pattern.to_string()))
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            LineMatcher::Literal(needle) => line.contains(needle.as_str()),
            LineMatcher::Regex(re) => re.is_match(line),
        }
    }
}

/// Compile a glob where `*` stays within one path segment and `**` spans
/// directories.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, ErrorKind> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ErrorKind::InvalidPattern(e.to_string()))
}

/// Leading directory components of a glob that contain no wildcards.
pub fn static_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let segments: Vec<&str> = pattern.split('/').collect();
    // The final segment names files, never the start directory.
    for seg in segments.iter().take(segments.len().saturating_sub(1)) {
        if seg.is_empty() || seg.contains(['*', '?', '[', '{', '\\']) {
            break;
        }
        if Path::new(seg)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            break;
        }
        prefix.push(seg);
    }
    prefix
}

/// Shorten a line for display, respecting UTF-8 boundaries.
pub fn truncate_display(line: &str, max: usize) -> String {
    if line.len() <= max {
        return line.to_string();
    }
    let mut cut = max.saturating_sub(3);
    while cut > 0 && !line.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &line[..cut])
}

#[derive(Default)]
struct Counters {
    files_scanned: AtomicU64,
    bytes_read: AtomicU64,
}

/// Output of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    pub stats: SearchStats,
    /// The result cap stopped the scan.
    pub limit_reached: bool,
}

/// The scan engine bound to a root.
#[derive(Debug, Clone)]
pub struct ScanEngine {
    root: Root,
    limits: ScanLimits,
}

impl ScanEngine {
    pub fn new(root: Root, limits: ScanLimits) -> Self {
        Self { root, limits }
    }

    /// Search file contents under `start` line by line.
    pub async fn search(
        &self,
        start: &Path,
        matcher: LineMatcher,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> FsResult<SearchOutcome> {
        let began = Instant::now();
        let scan_token = cancel.child_token();
        let collector = Arc::new(Collector::new(max_results, scan_token.clone()));
        let counters = Arc::new(Counters::default());
        let matcher = Arc::new(matcher);
        let limits = self.limits;

        let filter = TraversalFilter {
            skip_binary: true,
            max_size: Some(limits.skip_file_size),
        };
        let job = {
            let collector = collector.clone();
            let counters = counters.clone();
            move |file: Discovered, token: CancellationToken| {
                let collector = collector.clone();
                let counters = counters.clone();
                let matcher = matcher.clone();
                async move {
                    search_file(&file, &matcher, &collector, &counters, &limits, &token).await;
                }
            }
        };
        self.run(start, filter, scan_token, job).await;

        if cancel.is_cancelled() {
            return Err(FsError::new(
                "search",
                self.root.relative(start),
                ErrorKind::Cancelled,
            ));
        }

        let collector = Arc::try_unwrap(collector).map_err(|_| {
            FsError::new(
                "search",
                self.root.relative(start),
                ErrorKind::InvalidArgument("scan workers outlived the scan".into()),
            )
        })?;
        let limit_reached = collector.len() >= max_results.max(1);
        let stats = SearchStats {
            files_scanned: counters.files_scanned.load(Ordering::Relaxed),
            bytes_read: counters.bytes_read.load(Ordering::Relaxed),
            duration_ms: began.elapsed().as_millis() as u64,
        };
        debug!(
            matches = collector.len(),
            files = stats.files_scanned,
            bytes = stats.bytes_read,
            limit_reached,
            "search finished"
        );
        Ok(SearchOutcome {
            matches: collector.into_inner(),
            stats,
            limit_reached,
        })
    }

    /// Match root-relative file paths under `start` against `matcher`.
    pub async fn glob(
        &self,
        start: &Path,
        matcher: GlobMatcher,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> FsResult<Vec<String>> {
        let scan_token = cancel.child_token();
        let collector = Arc::new(Collector::new(max_results, scan_token.clone()));
        let matcher = Arc::new(matcher);

        let job = {
            let collector = collector.clone();
            move |file: Discovered, _token: CancellationToken| {
                let collector = collector.clone();
                let matcher = matcher.clone();
                async move {
                    if matcher.is_match(&file.relative) {
                        collector.push(file.relative);
                    }
                }
            }
        };
        self.run(start, TraversalFilter::default(), scan_token, job)
            .await;

        if cancel.is_cancelled() {
            return Err(FsError::new(
                "glob",
                self.root.relative(start),
                ErrorKind::Cancelled,
            ));
        }
        let collector = Arc::try_unwrap(collector).map_err(|_| {
            FsError::new(
                "glob",
                self.root.relative(start),
                ErrorKind::InvalidArgument("scan workers outlived the scan".into()),
            )
        })?;
        Ok(collector.into_inner())
    }

    /// Run the traversal and the worker pool until the tree is exhausted or
    /// `token` is cancelled. Every spawned task is joined before returning.
    async fn run<F, Fut>(&self, start: &Path, filter: TraversalFilter, token: CancellationToken, job: F)
    where
        F: Fn(Discovered, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Discovered>(self.limits.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut tasks = JoinSet::new();

        tasks.spawn(traverse(
            self.root.clone(),
            start.to_path_buf(),
            filter,
            tx,
            token.clone(),
        ));

        for _ in 0..self.limits.workers.max(1) {
            let rx = rx.clone();
            let token = token.clone();
            let job = job.clone();
            tasks.spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = token.cancelled() => None,
                        file = async { rx.lock().await.recv().await } => file,
                    };
                    let Some(file) = next else { break };
                    job(file, token.clone()).await;
                }
            });
        }

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "scan task failed");
            }
        }
    }
}

async fn traverse(
    root: Root,
    start: PathBuf,
    filter: TraversalFilter,
    tx: mpsc::Sender<Discovered>,
    token: CancellationToken,
) {
    let send = |file: Discovered| {
        let tx = tx.clone();
        let token = token.clone();
        async move {
            tokio::select! {
                _ = token.cancelled() => false,
                sent = tx.send(file) => sent.is_ok(),
            }
        }
    };

    // A single file as the start path is scanned on its own.
    match tokio::fs::symlink_metadata(&start).await {
        Ok(meta) if meta.is_file() => {
            if filter.admits(&start, meta.len()) {
                let file = Discovered {
                    relative: root.relative(&start),
                    path: start,
                };
                send(file).await;
            }
            return;
        }
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return,
        Err(e) => {
            warn!(path = %start.display(), error = %e, "scan start unreadable");
            return;
        }
    }

    let mut stack = vec![start];
    while let Some(dir) = stack.pop() {
        if token.is_cancelled() {
            return;
        }
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        loop {
            if token.is_cancelled() {
                return;
            }
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "directory read interrupted");
                    break;
                }
            };
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            let path = entry.path();
            if file_type.is_symlink() {
                trace!(path = %path.display(), "skipping symlink");
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !filter.admits(&path, meta.len()) {
                trace!(path = %path.display(), "skipping file");
                continue;
            }
            let file = Discovered {
                relative: root.relative(&path),
                path,
            };
            if !send(file).await {
                return;
            }
        }
    }
}

async fn search_file(
    file: &Discovered,
    matcher: &LineMatcher,
    collector: &Collector<SearchMatch>,
    counters: &Counters,
    limits: &ScanLimits,
    token: &CancellationToken,
) {
    let handle = match tokio::fs::File::open(&file.path).await {
        Ok(handle) => handle,
        Err(e) => {
            trace!(path = %file.relative, error = %e, "skipping unreadable file");
            return;
        }
    };
    counters.files_scanned.fetch_add(1, Ordering::Relaxed);

    let mut reader = BufReader::new(handle);
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        if token.is_cancelled() {
            return;
        }
        buf.clear();
        let n = match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                trace!(path = %file.relative, error = %e, "read failed mid-file");
                break;
            }
        };
        counters.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        line_no += 1;
        if line_no > limits.max_lines {
            debug!(path = %file.relative, "line limit reached, treating as binary");
            break;
        }

        let mut line = buf.as_slice();
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        let text = String::from_utf8_lossy(line);
        if matcher.is_match(&text) {
            let accepted = collector.push(SearchMatch {
                path: file.relative.clone(),
                line: line_no,
                text: truncate_display(&text, limits.line_display_max),
            });
            if !accepted {
                return;
            }
        }
    }
}
