//! Write strategies, resolution modes and wire encodings.

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

/// Name of a write strategy, as it appears in requests.
///
/// `ReplaceRange` needs a byte range on top of the name; see
/// [`WriteStrategy::from_parts`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StrategyKind {
    /// Replace the whole file.
    #[default]
    Overwrite,
    /// Create the file; fail if it already exists.
    #[strum(serialize = "no_clobber", serialize = "noclobber", serialize = "create")]
    NoClobber,
    /// Add the payload after the existing bytes.
    Append,
    /// Add the payload before the existing bytes.
    Prepend,
    /// Splice the payload over a byte range of an existing file.
    ReplaceRange,
}

impl StrategyKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Overwrite => "overwrite",
            StrategyKind::NoClobber => "no_clobber",
            StrategyKind::Append => "append",
            StrategyKind::Prepend => "prepend",
            StrategyKind::ReplaceRange => "replace_range",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully specified write strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStrategy {
    Overwrite,
    NoClobber,
    Append,
    Prepend,
    /// Replace bytes `[start, end)` of the existing content.
    ReplaceRange { start: i64, end: i64 },
}

/// Errors building a [`WriteStrategy`] from request fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("start and end are required for replace_range")]
    MissingRange,
}

impl WriteStrategy {
    /// Combine a strategy name with the optional range fields of a request.
    ///
    /// Range fields are ignored for every strategy except `replace_range`,
    /// which requires both.
    pub fn from_parts(
        kind: StrategyKind,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Self, StrategyError> {
        Ok(match kind {
            StrategyKind::Overwrite => WriteStrategy::Overwrite,
            StrategyKind::NoClobber => WriteStrategy::NoClobber,
            StrategyKind::Append => WriteStrategy::Append,
            StrategyKind::Prepend => WriteStrategy::Prepend,
            StrategyKind::ReplaceRange => match (start, end) {
                (Some(start), Some(end)) => WriteStrategy::ReplaceRange { start, end },
                _ => return Err(StrategyError::MissingRange),
            },
        })
    }

    /// The strategy name without range data.
    pub fn kind(&self) -> StrategyKind {
        match self {
            WriteStrategy::Overwrite => StrategyKind::Overwrite,
            WriteStrategy::NoClobber => StrategyKind::NoClobber,
            WriteStrategy::Append => StrategyKind::Append,
            WriteStrategy::Prepend => StrategyKind::Prepend,
            WriteStrategy::ReplaceRange { .. } => StrategyKind::ReplaceRange,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        self.kind().as_str()
    }
}

impl std::fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStrategy::ReplaceRange { start, end } => {
                write!(f, "replace_range[{start},{end})")
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// How strictly a requested path is resolved before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResolveMode {
    /// Symlinks in the parent chain are resolved; the final component is not
    /// followed. Used for targets that may not exist yet.
    #[default]
    #[strum(serialize = "parent", serialize = "parent_resolved")]
    ParentResolved,
    /// The final component is followed as well and re-validated. Used for
    /// reads so a planted symlink cannot leak data from outside the root.
    #[strum(serialize = "full", serialize = "fully_resolved")]
    FullyResolved,
}

/// Encoding of file content on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TextEncoding {
    /// UTF-8 text (invalid sequences are replaced on output).
    #[default]
    Text,
    /// Standard base64 with padding.
    Base64,
}
