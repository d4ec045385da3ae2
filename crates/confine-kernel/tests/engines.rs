//! The JSON tool surface, driven through a `ToolRegistry`.

use std::sync::Arc;

use confine_kernel::types::{
    EditResult, ErrorCode, GlobResult, ListResult, MkdirResult, PeekResult, ReadResult,
    ResolveResult, RmdirResult, SearchResult, TextEncoding, WriteResult,
};
use confine_kernel::{ConfinedFs, ExecResult, FsConfig, ToolRegistry, register_file_tools};
use serde::de::DeserializeOwned;
use serde_json::json;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    registry: ToolRegistry,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fs = Arc::new(ConfinedFs::new(dir.path(), FsConfig::default()).unwrap());
        let mut registry = ToolRegistry::new();
        register_file_tools(&mut registry, fs);
        Self {
            _dir: dir,
            registry,
        }
    }

    async fn call(&self, tool: &str, params: serde_json::Value) -> ExecResult {
        self.registry
            .execute(tool, &params.to_string())
            .await
            .unwrap()
    }

    async fn ok<T: DeserializeOwned>(&self, tool: &str, params: serde_json::Value) -> T {
        let res = self.call(tool, params).await;
        assert!(res.success, "{tool} failed: {}", res.stderr);
        serde_json::from_str(&res.stdout).unwrap()
    }

    async fn err(&self, tool: &str, params: serde_json::Value) -> ErrorCode {
        let res = self.call(tool, params).await;
        assert!(!res.success, "{tool} unexpectedly succeeded: {}", res.stdout);
        assert_eq!(res.exit_code, 1);
        res.parse_error().unwrap().code
    }
}

#[tokio::test]
async fn project_scaffold_round_trip() {
    let h = Harness::new();

    let made: MkdirResult = h
        .ok("fs_mkdir", json!({"path": "proj/{src,docs}"}))
        .await;
    assert!(made.created);
    assert_eq!(made.paths, vec!["proj/src", "proj/docs"]);

    let written: WriteResult = h
        .ok(
            "fs_write",
            json!({
                "path": "proj/src/main.rs",
                "encoding": "text",
                "content": "fn main() {\n    println!(\"hi\");\n}\n",
                "mode": "0600"
            }),
        )
        .await;
    assert!(written.created);
    assert_eq!(written.action, "overwrite");
    assert_eq!(written.meta.mode, "0600");
    assert_eq!(written.sha256.len(), 64);

    let edited: EditResult = h
        .ok(
            "fs_edit",
            json!({"path": "proj/src/main.rs", "pattern": "\"hi\"", "replace": "\"hello\""}),
        )
        .await;
    assert_eq!(edited.replacements, 1);

    let found: SearchResult = h
        .ok("fs_search", json!({"pattern": "println", "path": "proj"}))
        .await;
    assert_eq!(found.matches.len(), 1);
    assert!(!found.truncated);
    assert_eq!(found.matches[0].path, "proj/src/main.rs");
    assert_eq!(found.matches[0].line, 2);
    assert!(found.matches[0].text.contains("\"hello\""));

    let globbed: GlobResult = h.ok("fs_glob", json!({"pattern": "proj/**/*.rs"})).await;
    assert_eq!(globbed.matches, vec!["proj/src/main.rs"]);

    let listed: ListResult = h
        .ok("fs_list", json!({"path": "proj", "recursive": true}))
        .await;
    let paths: Vec<_> = listed.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["proj/docs", "proj/src", "proj/src/main.rs"]);

    let removed: RmdirResult = h
        .ok("fs_rmdir", json!({"path": "proj", "recursive": true}))
        .await;
    assert!(removed.removed);
    assert_eq!(
        h.err("fs_read", json!({"path": "proj/src/main.rs"})).await,
        ErrorCode::NotFound
    );
}

#[tokio::test]
async fn binary_content_travels_as_base64() {
    let h = Harness::new();

    let _: WriteResult = h
        .ok(
            "fs_write",
            json!({"path": "blob.bin", "encoding": "base64", "content": "AAECA/8="}),
        )
        .await;

    let read: ReadResult = h.ok("fs_read", json!({"path": "blob.bin"})).await;
    assert_eq!(read.encoding, TextEncoding::Base64);
    assert_eq!(read.content, "AAECA/8=");
    assert_eq!(read.size, 5);

    let peeked: PeekResult = h
        .ok("fs_peek", json!({"path": "blob.bin", "offset": 3, "max_bytes": 10}))
        .await;
    assert_eq!(peeked.content, "A/8=");
    assert!(peeked.eof);
}

#[tokio::test]
async fn argument_errors_map_to_codes() {
    let h = Harness::new();

    assert_eq!(
        h.err("fs_write", json!({"path": "x", "content": "y"})).await,
        ErrorCode::InvalidArgument
    );
    assert_eq!(
        h.err(
            "fs_write",
            json!({"path": "x", "encoding": "text", "content": "y", "strategy": "shred"})
        )
        .await,
        ErrorCode::InvalidArgument
    );
    assert_eq!(
        h.err("fs_read", json!({"path": ""})).await,
        ErrorCode::PathRequired
    );
    assert_eq!(
        h.err("fs_resolve", json!({"path": "file://remote-host/etc"})).await,
        ErrorCode::InvalidUri
    );
    assert_eq!(
        h.err("fs_glob", json!({"pattern": "../*"})).await,
        ErrorCode::PathEscape
    );
    assert_eq!(
        h.err("fs_search", json!({"pattern": "(", "regex": true})).await,
        ErrorCode::InvalidPattern
    );
    assert_eq!(
        h.err(
            "fs_write",
            json!({"path": "deep/a/b.txt", "encoding": "text", "content": "z"})
        )
        .await,
        ErrorCode::NotFound
    );
    assert_eq!(
        h.err("fs_rmdir", json!({"path": "."})).await,
        ErrorCode::InvalidArgument
    );
}

#[tokio::test]
async fn resolve_reports_root_relative_path() {
    let h = Harness::new();

    let res: ResolveResult = h
        .ok("fs_resolve", json!({"path": "./a/../b/c.txt"}))
        .await;
    assert_eq!(res.path, "b/c.txt");
    assert!(res.absolute.ends_with("c.txt"));
}
