//! End-to-end behaviour of a confined root.

use std::io::{self, Write as _};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use confine_kernel::lock::sentinel_path;
use confine_kernel::mutate::stage_and_commit;
use confine_kernel::types::{
    ErrorCode, GlobArgs, ListArgs, PeekArgs, ReadArgs, ResolveArgs, ResolveMode, SearchArgs,
    StrategyKind, WriteArgs,
};
use confine_kernel::{ConfinedFs, FsConfig, PathLocker, SentinelLocker};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Route kernel logs through the test harness; `RUST_LOG=confine_kernel=trace`
/// shows lock eviction and traversal skips for a failing test.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_test_writer())
        .try_init();
}

fn setup_with(config: FsConfig) -> (ConfinedFs, TempDir) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let fs = ConfinedFs::new(dir.path(), config).unwrap();
    (fs, dir)
}

fn setup() -> (ConfinedFs, TempDir) {
    setup_with(FsConfig::default())
}

fn resolve(fs: &ConfinedFs, path: &str) -> Result<String, ErrorCode> {
    fs.resolve(&ResolveArgs {
        path: path.into(),
        mode: ResolveMode::ParentResolved,
    })
    .map(|r| r.absolute)
    .map_err(|e| e.code())
}

fn read_back(fs: &ConfinedFs, rel: &str) -> String {
    std::fs::read_to_string(fs.root().path().join(rel)).unwrap()
}

#[test]
fn containment_rejects_every_escape() {
    let (fs, _dir) = setup();
    let outside = TempDir::new().unwrap();
    let outside_file = outside.path().join("secret.txt");
    let outside_uri = format!("file://{}", outside_file.display());

    for p in [
        "../etc/passwd",
        "a/../../b",
        outside_file.to_str().unwrap(),
        outside_uri.as_str(),
    ] {
        assert_eq!(resolve(&fs, p), Err(ErrorCode::PathEscape), "{p}");
    }
}

#[test]
fn resolution_is_idempotent() {
    let (fs, dir) = setup();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    for p in ["sub/new.txt", "./sub/../sub/x", "."] {
        let first = resolve(&fs, p).unwrap();
        let second = resolve(&fs, p).unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn write_strategies_compose() {
    let (fs, _dir) = setup();
    let cancel = CancellationToken::new();

    fs.write(&WriteArgs::text("f.txt", "A"), &cancel).await.unwrap();
    fs.write(
        &WriteArgs::text("f.txt", "C").with_strategy(StrategyKind::Append),
        &cancel,
    )
    .await
    .unwrap();
    fs.write(
        &WriteArgs::text("f.txt", "Z").with_strategy(StrategyKind::Prepend),
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(read_back(&fs, "f.txt"), "ZAC");

    let res = fs
        .write(&WriteArgs::text("f.txt", "XY").with_range(1, 2), &cancel)
        .await
        .unwrap();
    assert_eq!(res.action, "replace_range");
    assert_eq!(res.bytes, 4);
    assert_eq!(read_back(&fs, "f.txt"), "ZXYC");
}

#[tokio::test]
async fn no_clobber_keeps_original() {
    let (fs, dir) = setup();
    std::fs::write(dir.path().join("keep.txt"), "original").unwrap();

    let err = fs
        .write(
            &WriteArgs::text("keep.txt", "replacement").with_strategy(StrategyKind::NoClobber),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyExists);
    assert_eq!(read_back(&fs, "keep.txt"), "original");
}

#[test]
fn staging_failure_is_invisible() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("data.bin");
    std::fs::write(&target, b"\x00\x01\x02before").unwrap();

    let result = stage_and_commit(&target, 0o644, false, |file| {
        file.write_all(b"partial")?;
        Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"))
    });
    assert!(result.is_err());
    assert_eq!(std::fs::read(&target).unwrap(), b"\x00\x01\x02before");

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec!["data.bin"]);
}

#[tokio::test]
async fn lock_excludes_then_hands_over() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.txt");
    let locker = SentinelLocker::default();
    let cancel = CancellationToken::new();

    let held = locker
        .acquire(&path, Duration::from_secs(1), &cancel)
        .await
        .unwrap();

    let err = locker
        .acquire(&path, Duration::from_millis(300), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LockTimeout);

    held.release();
    let started = std::time::Instant::now();
    let again = locker
        .acquire(&path, Duration::from_millis(300), &cancel)
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));
    drop(again);
    assert!(!sentinel_path(&path).exists());
}

#[tokio::test]
async fn write_waits_on_foreign_sentinel() {
    let config = FsConfig {
        lock_timeout_ms: 200,
        ..FsConfig::default()
    };
    let (fs, _dir) = setup_with(config);
    let target = fs.root().path().join("busy.txt");
    let sentinel = sentinel_path(&target);
    std::fs::write(&sentinel, "4242\n0\n").unwrap();

    let err = fs
        .write(&WriteArgs::text("busy.txt", "x"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LockTimeout);
    assert!(!target.exists());

    std::fs::remove_file(&sentinel).unwrap();
    fs.write(&WriteArgs::text("busy.txt", "x"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(read_back(&fs, "busy.txt"), "x");
}

#[tokio::test]
async fn stale_sentinel_is_evicted() {
    let config = FsConfig {
        lock_timeout_ms: 10_000,
        stale_lock_age_ms: 1_000,
        ..FsConfig::default()
    };
    let (fs, _dir) = setup_with(config);
    let target = fs.root().path().join("old.txt");
    let sentinel = sentinel_path(&target);
    let file = std::fs::File::create(&sentinel).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    drop(file);

    let started = std::time::Instant::now();
    fs.write(&WriteArgs::text("old.txt", "fresh"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(read_back(&fs, "old.txt"), "fresh");
    assert!(!sentinel.exists());
}

#[tokio::test]
async fn concurrent_appends_are_serialized() {
    let (fs, _dir) = setup_with(FsConfig {
        lock_timeout_ms: 30_000,
        ..FsConfig::default()
    });
    let fs = Arc::new(fs);
    fs.write(&WriteArgs::text("log.txt", ""), &CancellationToken::new())
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let fs = fs.clone();
        tasks.spawn(async move {
            let line = format!("line {i:02}\n");
            fs.write(
                &WriteArgs::text("log.txt", line).with_strategy(StrategyKind::Append),
                &CancellationToken::new(),
            )
            .await
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    let content = read_back(&fs, "log.txt");
    let mut lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 16);
    lines.sort();
    lines.dedup();
    assert_eq!(lines.len(), 16);
}

#[tokio::test]
async fn search_stops_at_the_cap() {
    let (fs, dir) = setup();
    for i in 0..40 {
        let body = "needle\n".repeat(5);
        std::fs::write(dir.path().join(format!("f{i:02}.txt")), body).unwrap();
    }

    let res = fs
        .search(
            &SearchArgs {
                pattern: "needle".into(),
                max_results: Some(7),
                ..Default::default()
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(res.matches.len(), 7);
    assert!(res.truncated);
    let stats = res.statistics.unwrap();
    assert!(stats.files_scanned < 40, "scanned {}", stats.files_scanned);
}

#[tokio::test]
async fn glob_depth_follows_pattern() {
    let (fs, dir) = setup();
    let root = dir.path();
    std::fs::create_dir_all(root.join("a/b/c")).unwrap();
    for rel in ["top.txt", "a/one.txt", "a/b/two.txt", "a/b/c/three.txt", "a/b/skip.md"] {
        std::fs::write(root.join(rel), "x").unwrap();
    }
    let cancel = CancellationToken::new();
    let glob = |pattern: &str| GlobArgs {
        pattern: pattern.into(),
        max_results: None,
    };

    let mut deep = fs.glob(&glob("**/*.txt"), &cancel).await.unwrap().matches;
    deep.sort();
    assert_eq!(
        deep,
        vec!["a/b/c/three.txt", "a/b/two.txt", "a/one.txt", "top.txt"]
    );

    let shallow = fs.glob(&glob("*.txt"), &cancel).await.unwrap().matches;
    assert_eq!(shallow, vec!["top.txt"]);
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escape_is_refused() {
    use std::os::unix::fs::symlink;

    let (fs, dir) = setup();
    let outside = TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
    symlink(outside.path().join("secret.txt"), dir.path().join("leak.txt")).unwrap();
    symlink(outside.path(), dir.path().join("leakdir")).unwrap();

    let err = fs
        .read(&ReadArgs {
            path: "leak.txt".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PathEscape);

    let err = fs
        .peek(&PeekArgs {
            path: "leak.txt".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PathEscape);

    let err = fs
        .list(
            &ListArgs {
                path: "leakdir".into(),
                ..Default::default()
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PathEscape);

    let err = fs
        .write(&WriteArgs::text("leak.txt", "overwrite"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IsSymlink);
    assert_eq!(
        std::fs::read_to_string(outside.path().join("secret.txt")).unwrap(),
        "top secret"
    );

    // Listing the root reports the links without following them.
    let listed = fs
        .list(&ListArgs::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(listed.entries.iter().all(|e| !e.path.contains("secret")));
}
