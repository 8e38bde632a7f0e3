//! Definition discovery
//!
//! Expands a relative, `/`-separated pattern such as
//! `*/operation_types/*/definition.json` against a root directory. Each
//! segment matches exactly one path component: `*` matches any run of
//! characters and `?` matches a single character.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// One component of a discovery pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Matches a single entry by name without listing the directory
    Literal(String),
    /// Matches entries whose name fits the wildcard pattern
    Wildcard(Vec<char>),
}

/// A parsed discovery pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPattern {
    source: String,
    segments: Vec<Segment>,
}

impl DiscoveryPattern {
    /// Parse a pattern string
    ///
    /// Absolute patterns, `..` and empty segments are rejected.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::Config("Discovery pattern is empty".to_string()));
        }
        if pattern.starts_with('/') || Path::new(pattern).is_absolute() {
            return Err(Error::Config(format!(
                "Discovery pattern '{}' must be relative to the root",
                pattern
            )));
        }

        let mut segments = Vec::new();
        for part in pattern.split('/') {
            match part {
                "" => {
                    return Err(Error::Config(format!(
                        "Discovery pattern '{}' contains an empty segment",
                        pattern
                    )))
                }
                ".." => {
                    return Err(Error::Config(format!(
                        "Discovery pattern '{}' must not leave the root",
                        pattern
                    )))
                }
                "." => continue,
                _ if part.contains(['*', '?']) => {
                    segments.push(Segment::Wildcard(part.chars().collect()))
                }
                _ => segments.push(Segment::Literal(part.to_string())),
            }
        }

        if segments.is_empty() {
            return Err(Error::Config(format!(
                "Discovery pattern '{}' has no segments",
                pattern
            )));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }
}

impl std::fmt::Display for DiscoveryPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expand `pattern` under `root` into the discovery set
///
/// Paths come back in directory-listing order unless `sort` is set.
/// Intermediate segments only match directories, the last one only files.
pub fn discover(root: &Path, pattern: &DiscoveryPattern, sort: bool) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root).map_err(|e| Error::FileRead {
        path: root.display().to_string(),
        error: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(Error::Config(format!(
            "Discovery root '{}' is not a directory",
            root.display()
        )));
    }

    let last = pattern.segments.len() - 1;
    let mut frontier = vec![root.to_path_buf()];

    for (depth, segment) in pattern.segments.iter().enumerate() {
        let want_file = depth == last;
        let mut next = Vec::new();

        for dir in &frontier {
            match segment {
                Segment::Literal(name) => {
                    let candidate = dir.join(name);
                    if kind_matches(&candidate, want_file) {
                        next.push(candidate);
                    }
                }
                Segment::Wildcard(glob) => {
                    let entries = match std::fs::read_dir(dir) {
                        Ok(entries) => entries,
                        Err(e) if depth == 0 => return Err(Error::Io(e)),
                        Err(e) => {
                            tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                            continue;
                        }
                    };
                    for entry in entries {
                        let entry = match entry {
                            Ok(entry) => entry,
                            Err(e) => {
                                tracing::warn!("Skipping entry in {}: {}", dir.display(), e);
                                continue;
                            }
                        };
                        let name = entry.file_name();
                        let Some(name) = name.to_str() else {
                            tracing::debug!("Skipping non-UTF-8 entry {:?}", entry.path());
                            continue;
                        };
                        if name.starts_with('.') && glob.first() != Some(&'.') {
                            continue;
                        }
                        if !wildcard_match(glob, name) {
                            continue;
                        }
                        let path = entry.path();
                        if kind_matches(&path, want_file) {
                            next.push(path);
                        }
                    }
                }
            }
        }

        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    if sort {
        frontier.sort();
    }

    tracing::debug!(
        "Discovered {} definition(s) under {} matching {}",
        frontier.len(),
        root.display(),
        pattern
    );
    Ok(frontier)
}

fn kind_matches(path: &Path, want_file: bool) -> bool {
    if want_file {
        path.is_file()
    } else {
        path.is_dir()
    }
}

/// Match a single path component against a wildcard segment
fn wildcard_match(pattern: &[char], name: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    // Position of the last `*` and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(c) if *c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, at)) => {
                    p = star + 1;
                    n = at + 1;
                    backtrack = Some((star, at + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
