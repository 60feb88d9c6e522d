//! Path grammar: either a slash-rooted JSON-Pointer (`/a/b/0`) or a
//! dotted-path with bracket indices (`a.b[0]`), both parsed down to the
//! same `Vec<PathSegment>` so the shaping operations in `shape.rs` never
//! need to know which syntax a caller used (spec §4.5).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path '{}': {}", self.path, self.reason)
    }
}

impl std::error::Error for PathError {}

/// Parse a single path expression. Empty input parses to a zero-segment
/// path (refers to the root value).
pub fn parse_path(raw: &str) -> Result<ParsedPath, PathError> {
    if raw.is_empty() {
        return Ok(ParsedPath { segments: vec![] });
    }
    if let Some(rest) = raw.strip_prefix('/') {
        return parse_json_pointer(rest);
    }
    parse_dotted(raw)
}

fn parse_json_pointer(rest: &str) -> Result<ParsedPath, PathError> {
    let mut segments = Vec::new();
    for token in rest.split('/') {
        let decoded = token.replace("~1", "/").replace("~0", "~");
        if let Ok(index) = decoded.parse::<usize>() {
            segments.push(PathSegment::Index(index));
        } else {
            segments.push(PathSegment::Key(decoded));
        }
    }
    Ok(ParsedPath { segments })
}

fn parse_dotted(raw: &str) -> Result<ParsedPath, PathError> {
    let original = raw;
    let mut segments = Vec::new();
    let mut chars = raw.char_indices().peekable();
    let mut current = String::new();

    let flush_key = |current: &mut String, segments: &mut Vec<PathSegment>| {
        if !current.is_empty() {
            segments.push(PathSegment::Key(std::mem::take(current)));
        }
    };

    while let Some((_, ch)) = chars.next() {
        match ch {
            '.' => {
                flush_key(&mut current, &mut segments);
            }
            '[' => {
                flush_key(&mut current, &mut segments);
                let mut digits = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(inner);
                }
                if !closed {
                    return Err(PathError {
                        path: original.to_string(),
                        reason: "unterminated '['".to_string(),
                    });
                }
                let index: usize = digits.parse().map_err(|_| PathError {
                    path: original.to_string(),
                    reason: format!("bracket index '{digits}' is not a non-negative integer"),
                })?;
                segments.push(PathSegment::Index(index));
            }
            ']' => {
                return Err(PathError {
                    path: original.to_string(),
                    reason: "unmatched ']'".to_string(),
                });
            }
            other => current.push(other),
        }
    }
    flush_key(&mut current, &mut segments);

    Ok(ParsedPath { segments })
}
