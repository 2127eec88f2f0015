//! Route path parsing and structural comparison.
//!
//! A route path such as `/users/:id/files/*rest` is split into segments:
//! static text, named parameters (`:id`) and an optional trailing catch-all
//! (`*rest`). The normalized pattern replaces every parameter with `:*` and
//! the catch-all with `*`, so two routes that dispatch the same requests have
//! the same pattern regardless of how their parameters are named.

use std::fmt;

use thiserror::Error;

/// Marker used for parameter segments in normalized patterns.
pub const PARAM_MARKER: &str = ":*";
/// Marker used for the catch-all segment in normalized patterns.
pub const CATCH_ALL_MARKER: &str = "*";

/// One segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Segment::Static(_))
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Segment::CatchAll(_))
    }

    fn pattern_text(&self) -> &str {
        match self {
            Segment::Static(text) => text,
            Segment::Param(_) => PARAM_MARKER,
            Segment::CatchAll(_) => CATCH_ALL_MARKER,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(text) => f.write_str(text),
            Segment::Param(name) => write!(f, ":{}", name),
            Segment::CatchAll(name) => write!(f, "*{}", name),
        }
    }
}

/// Reasons a route path cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("empty parameter name in {0}")]
    EmptyParamName(String),

    #[error("invalid parameter name '{name}' in {path}")]
    InvalidParamName { path: String, name: String },

    #[error("parameter '{name}' appears more than once in {path}")]
    DuplicateParam { path: String, name: String },

    #[error("catch-all segment must be the last segment in {0}")]
    CatchAllNotLast(String),
}

/// A parsed, canonical route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Canonical path text (no trailing or repeated slashes).
    pub path: String,
    /// Normalized pattern used for structural comparison.
    pub pattern: String,
    /// Parameter names in order of appearance.
    pub params: Vec<String>,
    pub segments: Vec<Segment>,
}

impl ParsedPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if !raw.starts_with('/') {
            return Err(PathError::MissingLeadingSlash(raw.to_string()));
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut params: Vec<String> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Segment::Param(check_param_name(raw, name)?)
            } else if let Some(name) = part.strip_prefix('*') {
                if index + 1 != parts.len() {
                    return Err(PathError::CatchAllNotLast(raw.to_string()));
                }
                Segment::CatchAll(check_param_name(raw, name)?)
            } else {
                Segment::Static((*part).to_string())
            };

            if let Segment::Param(name) | Segment::CatchAll(name) = &segment {
                if params.contains(name) {
                    return Err(PathError::DuplicateParam {
                        path: raw.to_string(),
                        name: name.clone(),
                    });
                }
                params.push(name.clone());
            }
            segments.push(segment);
        }

        Ok(Self {
            path: join(segments.iter().map(|s| s.to_string())),
            pattern: join(segments.iter().map(|s| s.pattern_text().to_string())),
            params,
            segments,
        })
    }
}

fn check_param_name(path: &str, name: &str) -> Result<String, PathError> {
    if name.is_empty() {
        return Err(PathError::EmptyParamName(path.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PathError::InvalidParamName {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

fn join(parts: impl Iterator<Item = String>) -> String {
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(&part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Structural relation between two route paths of the same method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No request can match both.
    Disjoint,
    /// Identical patterns: every request matching one matches the other.
    Ambiguous,
    /// Some, but not all, requests match both.
    Overlap,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SegmentRelation {
    Equal,
    Compatible,
    Disjoint,
}

fn compare_segment(a: &Segment, b: &Segment) -> SegmentRelation {
    match (a, b) {
        (Segment::Static(x), Segment::Static(y)) if x == y => SegmentRelation::Equal,
        (Segment::Static(_), Segment::Static(_)) => SegmentRelation::Disjoint,
        (Segment::Static(_), _) | (_, Segment::Static(_)) => SegmentRelation::Compatible,
        _ => SegmentRelation::Equal,
    }
}

/// Returns (all segments equal, any segment disjoint) over the zipped prefix.
fn compare_prefix(a: &[Segment], b: &[Segment]) -> (bool, bool) {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| compare_segment(x, y))
        .fold((true, false), |(equal, disjoint), rel| {
            (
                equal && rel == SegmentRelation::Equal,
                disjoint || rel == SegmentRelation::Disjoint,
            )
        })
}

/// Classifies how two segment lists relate for dispatch purposes.
///
/// A catch-all matches one or more remaining segments. The comparison is
/// symmetric: `classify(a, b) == classify(b, a)`.
pub fn classify(a: &[Segment], b: &[Segment]) -> Relation {
    let tail_a = a.last().is_some_and(Segment::is_catch_all);
    let tail_b = b.last().is_some_and(Segment::is_catch_all);
    let fixed_a = if tail_a { &a[..a.len() - 1] } else { a };
    let fixed_b = if tail_b { &b[..b.len() - 1] } else { b };

    match (tail_a, tail_b) {
        (false, false) => {
            if a.len() != b.len() {
                return Relation::Disjoint;
            }
            match compare_prefix(a, b) {
                (_, true) => Relation::Disjoint,
                (true, false) => Relation::Ambiguous,
                (false, false) => Relation::Overlap,
            }
        }
        (true, true) => match compare_prefix(fixed_a, fixed_b) {
            (_, true) => Relation::Disjoint,
            (true, false) if fixed_a.len() == fixed_b.len() => Relation::Ambiguous,
            _ => Relation::Overlap,
        },
        (true, false) => classify_catch_all(fixed_a, b),
        (false, true) => classify_catch_all(fixed_b, a),
    }
}

fn classify_catch_all(fixed: &[Segment], other: &[Segment]) -> Relation {
    if other.len() <= fixed.len() {
        return Relation::Disjoint;
    }
    match compare_prefix(fixed, other) {
        (_, true) => Relation::Disjoint,
        _ => Relation::Overlap,
    }
}

/// Matches a concrete request path against route segments, returning the
/// captured parameters in declaration order.
pub fn match_path(segments: &[Segment], path: &str) -> Option<Vec<(String, String)>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut captured = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Static(text) => {
                if parts.get(index) != Some(&text.as_str()) {
                    return None;
                }
            }
            Segment::Param(name) => {
                let value = parts.get(index)?;
                captured.push((name.clone(), (*value).to_string()));
            }
            Segment::CatchAll(name) => {
                if parts.len() <= index {
                    return None;
                }
                captured.push((name.clone(), parts[index..].join("/")));
                return Some(captured);
            }
        }
    }

    (parts.len() == segments.len()).then_some(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<Segment> {
        ParsedPath::parse(path).unwrap().segments
    }

    #[test]
    fn test_parse_extracts_pattern_and_params() {
        let parsed = ParsedPath::parse("/users/:id/posts/:postId").unwrap();
        assert_eq!(parsed.pattern, "/users/:*/posts/:*");
        assert_eq!(parsed.params, vec!["id", "postId"]);
        assert_eq!(parsed.path, "/users/:id/posts/:postId");
    }

    #[test]
    fn test_parse_canonicalizes_slashes() {
        assert_eq!(ParsedPath::parse("/users//list/").unwrap().path, "/users/list");
        let root = ParsedPath::parse("/").unwrap();
        assert_eq!(root.path, "/");
        assert_eq!(root.pattern, "/");
        assert!(root.segments.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(matches!(
            ParsedPath::parse("users"),
            Err(PathError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            ParsedPath::parse("/users/:"),
            Err(PathError::EmptyParamName(_))
        ));
        assert!(matches!(
            ParsedPath::parse("/a/:id/b/:id"),
            Err(PathError::DuplicateParam { .. })
        ));
        assert!(matches!(
            ParsedPath::parse("/files/*rest/meta"),
            Err(PathError::CatchAllNotLast(_))
        ));
        assert!(matches!(
            ParsedPath::parse("/users/:user-id"),
            Err(PathError::InvalidParamName { .. })
        ));
    }

    #[test]
    fn test_catch_all_pattern() {
        let parsed = ParsedPath::parse("/files/*rest").unwrap();
        assert_eq!(parsed.pattern, "/files/*");
        assert_eq!(parsed.params, vec!["rest"]);
    }

    #[test]
    fn test_classify_fixed_arity() {
        assert_eq!(
            classify(&segments("/users/:id"), &segments("/users/:userId")),
            Relation::Ambiguous
        );
        assert_eq!(
            classify(&segments("/users/:id"), &segments("/users/me")),
            Relation::Overlap
        );
        assert_eq!(
            classify(&segments("/users/:id"), &segments("/posts/:id")),
            Relation::Disjoint
        );
        assert_eq!(
            classify(&segments("/users"), &segments("/users/:id")),
            Relation::Disjoint
        );
        assert_eq!(
            classify(&segments("/about"), &segments("/contact")),
            Relation::Disjoint
        );
    }

    #[test]
    fn test_classify_is_symmetric() {
        let pairs = [
            ("/users/:id", "/users/me"),
            ("/a/:x/c", "/a/b/:y"),
            ("/files/*rest", "/files/:id"),
            ("/files/*rest", "/docs/:id"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                classify(&segments(a), &segments(b)),
                classify(&segments(b), &segments(a)),
                "{} vs {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_classify_catch_all() {
        assert_eq!(
            classify(&segments("/files/*rest"), &segments("/files/:id/raw")),
            Relation::Overlap
        );
        assert_eq!(
            classify(&segments("/files/*rest"), &segments("/files")),
            Relation::Disjoint
        );
        assert_eq!(
            classify(&segments("/files/*rest"), &segments("/files/*path")),
            Relation::Ambiguous
        );
        assert_eq!(
            classify(&segments("/files/*rest"), &segments("/files/x/*path")),
            Relation::Overlap
        );
        assert_eq!(
            classify(&segments("/files/*rest"), &segments("/images/*rest")),
            Relation::Disjoint
        );
    }

    #[test]
    fn test_match_path() {
        let segs = segments("/users/:id/posts/:postId");
        assert_eq!(
            match_path(&segs, "/users/42/posts/7"),
            Some(vec![
                ("id".to_string(), "42".to_string()),
                ("postId".to_string(), "7".to_string())
            ])
        );
        assert_eq!(match_path(&segs, "/users/42/posts"), None);
        assert_eq!(match_path(&segs, "/users/42/posts/7/extra"), None);
        assert_eq!(match_path(&segments("/"), "/"), Some(vec![]));
    }

    #[test]
    fn test_match_catch_all() {
        let segs = segments("/files/*rest");
        assert_eq!(
            match_path(&segs, "/files/a/b/c.txt"),
            Some(vec![("rest".to_string(), "a/b/c.txt".to_string())])
        );
        assert_eq!(match_path(&segs, "/files"), None);
    }
}
