//! Content classification: MIME sniffing, text detection and hashing.
//!
//! Everything here is a pure function of a name and some bytes, apart from
//! [`hash_file`] which streams a file from disk.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Fraction of control characters above which a sample counts as binary.
const CONTROL_RATIO_LIMIT: f64 = 0.3;

/// Extensions never worth scanning line by line.
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "zip", "tar", "gz", "bz2", "jpg", "jpeg", "png", "gif", "pdf",
    "doc", "docx", "mp3", "mp4", "avi", "mov", "bin", "dat", "db", "pyc", "pyo", "class", "o",
    "a", "lib",
];

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "txt" | "text" | "log" => TEXT_PLAIN,
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Classify `name` with a content `sample`.
///
/// The extension wins when it is known; otherwise the sample decides between
/// UTF-8 text and opaque binary.
pub fn detect_mime(name: &str, sample: &[u8]) -> &'static str {
    if let Some(mime) = extension_of(name).as_deref().and_then(mime_for_extension) {
        return mime;
    }
    if is_text(sample) { TEXT_PLAIN } else { OCTET_STREAM }
}

/// Heuristic text check: no NUL bytes, valid UTF-8 and at most 30% control
/// characters (tab, LF and CR excluded).
///
/// A multi-byte sequence cut off at the end of the sample is tolerated, since
/// samples are usually a prefix of a larger file.
pub fn is_text(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return true;
    }
    if sample.contains(&0) {
        return false;
    }
    if let Err(e) = std::str::from_utf8(sample) {
        if e.error_len().is_some() {
            return false;
        }
    }

    let control = sample
        .iter()
        .filter(|&&c| !matches!(c, b'\t' | b'\n' | b'\r') && (c < 0x20 || c == 0x7f))
        .count();
    (control as f64 / sample.len() as f64) <= CONTROL_RATIO_LIMIT
}

/// Whether the extension of `path` marks a file search should skip.
pub fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

/// Hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Stream a file through SHA-256.
///
/// Returns `Ok(None)` when the file is larger than `cap`; a skipped hash is
/// reported as absent rather than as a hash of a prefix.
pub fn hash_file(path: &Path, cap: u64) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() > cap {
        return Ok(None);
    }
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hex::encode(hasher.finalize())))
}

/// Read up to `limit` leading bytes of a file.
pub fn sample_file(path: &Path, limit: u64) -> io::Result<Vec<u8>> {
    let mut sample = Vec::new();
    File::open(path)?.take(limit).read_to_end(&mut sample)?;
    Ok(sample)
}
