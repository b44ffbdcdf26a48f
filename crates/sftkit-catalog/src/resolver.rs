//! File pattern expansion
//!
//! A pattern is one of:
//!
//! ```text
//! a.sft;dir/*.sft;other.sft     ';'-separated sub-patterns, each resolved on its own
//! list:files.txt                one path per line, '#'/'%' comments allowed
//! dir/H-1_H1_*SFT-*.sft         glob over the entries of one directory
//! dir/file.sft                  literal path, not checked for existence
//! ```
//!
//! Globs support `*`, `?`, `[set]`, `[^set]`, ranges like `[a-z]` and `\`
//! escapes. Only the last path component may contain wildcards.

use crate::{CatalogError, Result};
use sftkit_formats::timestamps::read_data_file;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PATTERN_SEPARATOR: char = ';';
const LIST_PREFIX: &str = "list:";

/// URL prefixes added by data-discovery tools; the trailing `/` is kept.
const URL_PREFIXES: &[&str] = &["file://localhost/", "file:///"];

/// Expand `pattern` into a sorted list of paths.
///
/// A glob matching nothing, or an empty list file, is [`CatalogError::NotFound`].
/// An unreadable glob directory is an I/O error.
pub fn find_files(pattern: &str) -> Result<Vec<PathBuf>> {
    if pattern.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "empty file pattern".to_string(),
        ));
    }

    let mut files = expand(pattern)?;
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    debug!("Pattern '{}' matched {} files", pattern, files.len());
    Ok(files)
}

fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    if pattern.contains(PATTERN_SEPARATOR) {
        let mut files = Vec::new();
        for sub in pattern.split(PATTERN_SEPARATOR) {
            files.extend(expand(sub)?);
        }
        Ok(files)
    } else if let Some(list) = pattern.strip_prefix(LIST_PREFIX) {
        read_list_file(Path::new(list))
    } else if is_glob(pattern) {
        expand_glob(pattern)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

fn read_list_file(list: &Path) -> Result<Vec<PathBuf>> {
    let lines = read_data_file(list).map_err(|e| {
        CatalogError::NotFound(format!("could not read list file {}: {e}", list.display()))
    })?;
    if lines.is_empty() {
        warn!("List file {} contains no file names", list.display());
        return Err(CatalogError::NotFound(format!(
            "list file {} contains no file names",
            list.display()
        )));
    }

    Ok(lines
        .iter()
        .map(|line| {
            let path = URL_PREFIXES
                .iter()
                .find_map(|prefix| line.strip_prefix(prefix).map(|_| &line[prefix.len() - 1..]))
                .unwrap_or(line.as_str());
            PathBuf::from(path)
        })
        .collect())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let (dir, file_pattern) = pattern.rsplit_once('/').unwrap_or((".", pattern));

    let entries = std::fs::read_dir(dir).map_err(|e| {
        std::io::Error::new(e.kind(), format!("can't open data directory '{dir}': {e}"))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name != "." && name != ".." && glob_match(name.as_bytes(), file_pattern.as_bytes()) {
            files.push(PathBuf::from(format!("{dir}/{name}")));
        }
    }

    if files.is_empty() {
        return Err(CatalogError::NotFound(format!(
            "no files match '{pattern}'"
        )));
    }
    Ok(files)
}

/// Match `name` against a shell-style pattern.
pub fn glob_match(name: &[u8], pattern: &[u8]) -> bool {
    let mut s = name;
    let mut p = pattern;

    while let Some((&c, rest)) = p.split_first() {
        if s.is_empty() && c != b'*' {
            return false;
        }
        p = rest;

        match c {
            b'*' => {
                while p.first() == Some(&b'*') {
                    p = &p[1..];
                }
                if p.is_empty() {
                    return true;
                }
                return (0..s.len()).any(|i| glob_match(&s[i..], p));
            }
            b'?' => {}
            b'[' => match match_set(s[0], p) {
                Some(rest) => p = rest,
                None => return false,
            },
            b'\\' if !p.is_empty() => {
                if p[0] != s[0] {
                    return false;
                }
                p = &p[1..];
            }
            _ => {
                if c != s[0] {
                    return false;
                }
            }
        }
        s = &s[1..];
    }
    s.is_empty()
}

/// Match one character against the set following `[`; returns the pattern
/// after the closing `]` on success.
///
/// A `]` right after `[` or `[^` is a member, as is a leading `-`. A
/// trailing `c-` is an open range matching every character from `c` up.
fn match_set(ch: u8, set: &[u8]) -> Option<&[u8]> {
    let negate = set.first() == Some(&b'^');
    let mut p = if negate { &set[1..] } else { set };
    let mut matched = false;

    while !matched {
        let (&c, rest) = p.split_first()?;
        p = rest;
        let &next = p.first()?;

        if next == b'-' {
            let &hi = p.get(1)?;
            p = &p[1..];
            if hi == b']' {
                matched = ch >= c;
                break;
            }
            matched = ch == c || ch == hi || (ch > c && ch < hi);
        } else {
            matched = c == ch || (next != b']' && next == ch);
            if next == b']' {
                break;
            }
        }
    }

    if negate == matched {
        return None;
    }
    let end = p.iter().position(|&b| b == b']')?;
    Some(&p[end + 1..])
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_glob_characters() {
        assert!(glob_match(b"a.sft", b"*.sft"));
        assert!(!glob_match(b"c.txt", b"*.sft"));
        assert!(glob_match(b"abc", b"a?c"));
        assert!(!glob_match(b"ac", b"a?c"));
        assert!(glob_match(b"abbbc", b"a**c"));
        assert!(glob_match(b"abc", b"a[a-z]c"));
        assert!(!glob_match(b"aBc", b"a[a-z]c"));
        assert!(glob_match(b"a-c", b"a[-a-z]c"));
        assert!(glob_match(b"x", b"[c-]"));
        assert!(glob_match(b"c", b"[c-]"));
        assert!(!glob_match(b"-", b"[c-]"));
        assert!(!glob_match(b"a", b"[c-]"));
        assert!(glob_match(b"a]c", b"a[]x]c"));
        assert!(glob_match(b"aXc", b"a[^a-z]c"));
        assert!(!glob_match(b"abc", b"a[^a-z]c"));
        assert!(glob_match(b"a*c", b"a\\*c"));
        assert!(!glob_match(b"abc", b"a\\*c"));
        assert!(glob_match(b"H1", b"[HL]1"));
        assert!(!glob_match(b"V1", b"[HL]1"));
        assert!(!glob_match(b"a", b"a[bc"));
        assert!(glob_match(b"", b"*"));
        assert!(!glob_match(b"", b"?"));
    }

    #[test]
    fn test_glob_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["b.sft", "a.sft", "c.txt"]);

        let pattern = format!("{}/*.sft", dir.path().display());
        let files = find_files(&pattern).unwrap();
        assert_eq!(names(&files), ["a.sft", "b.sft"]);
        assert_eq!(files[0], dir.path().join("a.sft"));
    }

    #[test]
    fn test_glob_without_match_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["c.txt"]);
        let pattern = format!("{}/*.sft", dir.path().display());
        assert!(matches!(find_files(&pattern), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_glob_in_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/missing/*.sft", dir.path().display());
        assert!(matches!(find_files(&pattern), Err(CatalogError::Io(_))));
    }

    #[test]
    fn test_multi_pattern_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["x1.sft", "x2.sft", "y.sft"]);
        let d = dir.path().display();
        let pattern = format!("{d}/y.sft;{d}/x?.sft");
        assert_eq!(names(&find_files(&pattern).unwrap()), ["x1.sft", "x2.sft", "y.sft"]);
    }

    #[test]
    fn test_literal_path_not_checked() {
        assert_eq!(
            find_files("does/not/exist.sft").unwrap(),
            [PathBuf::from("does/not/exist.sft")]
        );
        assert!(find_files("").is_err());
    }

    #[test]
    fn test_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("files.txt");
        std::fs::write(
            &list,
            "# from data find\nfile://localhost/data/b.sft\nfile:///data/a.sft\nrel/c.sft % note\n\n",
        )
        .unwrap();

        let files = find_files(&format!("list:{}", list.display())).unwrap();
        assert_eq!(
            files,
            [
                PathBuf::from("/data/a.sft"),
                PathBuf::from("/data/b.sft"),
                PathBuf::from("rel/c.sft"),
            ]
        );
    }

    #[test]
    fn test_empty_or_missing_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("empty.txt");
        std::fs::write(&list, "% nothing here\n").unwrap();
        assert!(matches!(
            find_files(&format!("list:{}", list.display())),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            find_files(&format!("list:{}/nope.txt", dir.path().display())),
            Err(CatalogError::NotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_literal_pattern_matches_itself(name in "[a-zA-Z0-9_.-]{1,24}") {
            prop_assert!(glob_match(name.as_bytes(), name.as_bytes()));
            prop_assert!(glob_match(name.as_bytes(), b"*"));
        }
    }
}
