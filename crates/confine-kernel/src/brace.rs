//! Shell-style brace expansion for `mkdir`.
//!
//! `a/{b,c}/d` expands to `a/b/d` and `a/c/d`. Groups expand left to right and
//! may repeat (`{x,y}/{1,2}` yields four paths). Nested groups are not
//! supported; a `{` without a closing `}` is kept literally.

use crate::error::ErrorKind;

/// Upper bound on the number of paths one request may expand to.
pub const MAX_EXPANSIONS: usize = 1024;

/// Longest pattern accepted for expansion.
pub const MAX_PATTERN_BYTES: usize = 4096;

/// Most `{` a pattern may contain. Each expansion step removes one.
pub const MAX_GROUPS: usize = 64;

/// Expand every `{a,b,...}` group in `pattern`.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, ErrorKind> {
    if pattern.len() > MAX_PATTERN_BYTES {
        return Err(ErrorKind::InvalidArgument(format!(
            "pattern exceeds {MAX_PATTERN_BYTES} bytes"
        )));
    }
    if pattern.matches('{').count() > MAX_GROUPS {
        return Err(ErrorKind::InvalidArgument(format!(
            "pattern has more than {MAX_GROUPS} brace groups"
        )));
    }

    let mut out = Vec::new();
    let mut pending = vec![pattern.to_string()];
    while let Some(current) = pending.pop() {
        let Some((open, close)) = first_group(&current) else {
            if out.len() >= MAX_EXPANSIONS {
                return Err(ErrorKind::InvalidArgument(format!(
                    "brace expansion exceeds {MAX_EXPANSIONS} paths"
                )));
            }
            out.push(current);
            continue;
        };

        let prefix = &current[..open];
        let suffix = &current[close + 1..];
        // Pushed in reverse so alternatives pop left to right.
        for part in current[open + 1..close].split(',').rev() {
            pending.push(format!("{prefix}{part}{suffix}"));
        }
        // Every pending entry yields at least one path.
        if out.len() + pending.len() > MAX_EXPANSIONS {
            return Err(ErrorKind::InvalidArgument(format!(
                "brace expansion exceeds {MAX_EXPANSIONS} paths"
            )));
        }
    }
    Ok(out)
}

fn first_group(pattern: &str) -> Option<(usize, usize)> {
    let open = pattern.find('{')?;
    let close = pattern[open + 1..].find('}')? + open + 1;
    Some((open, close))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_braces() {
        assert_eq!(expand_braces("a/b").unwrap(), vec!["a/b"]);
    }

    #[test]
    fn test_single_group() {
        assert_eq!(
            expand_braces("src/{lib,bin,tests}").unwrap(),
            vec!["src/lib", "src/bin", "src/tests"]
        );
    }

    #[test]
    fn test_multiple_groups() {
        assert_eq!(
            expand_braces("{a,b}/{1,2}").unwrap(),
            vec!["a/1", "a/2", "b/1", "b/2"]
        );
    }

    #[test]
    fn test_unbalanced_kept_literal() {
        assert_eq!(expand_braces("odd{name").unwrap(), vec!["odd{name"]);
        assert_eq!(expand_braces("x/{}").unwrap(), vec!["x/"]);
    }

    #[test]
    fn test_expansion_bounded() {
        let huge = "{a,b,c,d}".repeat(6);
        assert!(expand_braces(&huge).is_err());
    }

    #[test]
    fn test_many_groups_rejected_up_front() {
        let deep = "{}".repeat(20_000) + "x";
        assert!(matches!(
            expand_braces(&deep),
            Err(ErrorKind::InvalidArgument(_))
        ));

        let long = "a".repeat(MAX_PATTERN_BYTES + 1);
        assert!(matches!(
            expand_braces(&long),
            Err(ErrorKind::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_group_limit_is_inclusive() {
        let at_limit = "{a}".repeat(MAX_GROUPS);
        assert_eq!(expand_braces(&at_limit).unwrap(), vec!["a".repeat(MAX_GROUPS)]);
        let over = "{a}".repeat(MAX_GROUPS + 1);
        assert!(expand_braces(&over).is_err());
    }
}
