//! Route patterns and placeholder kinds.
//!
//! Router syntax renders placeholders as `<name>`, `<name:num>` and `<*name>`.
//! Contract templates use `{name}` and are compiled through
//! [`RoutePattern::from_template`].

use std::fmt;
use std::str::FromStr;

/// Constraint applied to a placeholder segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderKind {
    /// Any characters within one segment
    #[default]
    Standard,
    /// Digits only
    Numeric,
    /// Any characters, `/` included
    Wildcard,
}

impl PlaceholderKind {
    pub(crate) fn regex(self) -> &'static str {
        match self {
            PlaceholderKind::Standard => "[^/]+",
            PlaceholderKind::Numeric => "[0-9]+",
            PlaceholderKind::Wildcard => ".+",
        }
    }
}

impl FromStr for PlaceholderKind {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(PlaceholderKind::Standard),
            "numeric" | "num" => Ok(PlaceholderKind::Numeric),
            "wildcard" => Ok(PlaceholderKind::Wildcard),
            other => Err(PatternError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unclosed placeholder in {0:?}")]
    Unclosed(String),
    #[error("unexpected placeholder delimiter in {0:?}")]
    Unexpected(String),
    #[error("invalid placeholder name {name:?} in {pattern:?}")]
    InvalidName { pattern: String, name: String },
    #[error("placeholder {name:?} appears twice in {pattern:?}")]
    Duplicate { pattern: String, name: String },
    #[error("unknown placeholder kind {0:?}")]
    UnknownKind(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Literal(String),
    Placeholder { name: String, kind: PlaceholderKind },
}

/// Parsed route pattern: literals and typed placeholders, in order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePattern {
    parts: Vec<Part>,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !matches!(c, '/' | '{' | '}' | '<' | '>' | ':' | '*') && !c.is_whitespace())
}

/// Split `raw` into literals and placeholder bodies delimited by `open`/`close`.
fn tokenize(raw: &str, open: char, close: char) -> Result<Vec<(bool, String)>, PatternError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_placeholder = false;
    for c in raw.chars() {
        if c == open {
            if in_placeholder {
                return Err(PatternError::Unexpected(raw.to_string()));
            }
            if !current.is_empty() {
                tokens.push((false, std::mem::take(&mut current)));
            }
            in_placeholder = true;
        } else if c == close {
            if !in_placeholder {
                return Err(PatternError::Unexpected(raw.to_string()));
            }
            tokens.push((true, std::mem::take(&mut current)));
            in_placeholder = false;
        } else {
            current.push(c);
        }
    }
    if in_placeholder {
        return Err(PatternError::Unclosed(raw.to_string()));
    }
    if !current.is_empty() {
        tokens.push((false, current));
    }
    Ok(tokens)
}

/// `/` alone is the empty pattern; other patterns lose one trailing slash.
fn normalize(raw: &str) -> &str {
    if raw == "/" {
        ""
    } else if raw.len() > 1 {
        raw.strip_suffix('/').unwrap_or(raw)
    } else {
        raw
    }
}

impl RoutePattern {
    /// Parse router syntax (`/pets/<id:num>`).
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = normalize(raw);
        let mut parts = Vec::new();
        for (is_placeholder, body) in tokenize(raw, '<', '>')? {
            if !is_placeholder {
                parts.push(Part::Literal(body));
                continue;
            }
            let (name, kind) = if let Some(name) = body.strip_prefix('*') {
                (name.to_string(), PlaceholderKind::Wildcard)
            } else if let Some((name, kind)) = body.split_once(':') {
                (name.to_string(), kind.parse()?)
            } else {
                (body, PlaceholderKind::Standard)
            };
            parts.push(Part::Placeholder { name, kind });
        }
        Self::checked(raw, parts)
    }

    /// Compile a contract path template (`/pets/{id}`), asking `kind_of` for the
    /// kind of each placeholder.
    pub fn from_template<F>(template: &str, mut kind_of: F) -> Result<Self, PatternError>
    where
        F: FnMut(&str) -> Result<PlaceholderKind, PatternError>,
    {
        let raw = normalize(template);
        let mut parts = Vec::new();
        for (is_placeholder, body) in tokenize(raw, '{', '}')? {
            if is_placeholder {
                let kind = kind_of(&body)?;
                parts.push(Part::Placeholder { name: body, kind });
            } else {
                parts.push(Part::Literal(body));
            }
        }
        Self::checked(raw, parts)
    }

    fn checked(raw: &str, parts: Vec<Part>) -> Result<Self, PatternError> {
        let mut seen: Vec<&str> = Vec::new();
        for part in &parts {
            if let Part::Placeholder { name, .. } = part {
                if !valid_name(name) {
                    return Err(PatternError::InvalidName {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                if seen.contains(&name.as_str()) {
                    return Err(PatternError::Duplicate {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }
        Ok(Self { parts })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Placeholder names and kinds in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, PlaceholderKind)> {
        self.parts.iter().filter_map(|p| match p {
            Part::Placeholder { name, kind } => Some((name.as_str(), *kind)),
            Part::Literal(_) => None,
        })
    }

    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Literal(s) => f.write_str(s)?,
                Part::Placeholder { name, kind } => match kind {
                    PlaceholderKind::Standard => write!(f, "<{name}>")?,
                    PlaceholderKind::Numeric => write!(f, "<{name}:num>")?,
                    PlaceholderKind::Wildcard => write!(f, "<*{name}>")?,
                },
            }
        }
        Ok(())
    }
}
