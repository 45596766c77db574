//! Dotted property paths
//!
//! A path is a sequence of segments naming attributes and relationships,
//! either in the object layer (the default, optionally written `obj:a.b`)
//! or in the storage layer (`db:A.B`).
//!
//! Segment markers:
//! - `a+.b`: trailing `+` requests an outer join for the relationship `a`
//! - `a|b`: a `|` in front of a segment joins it through its own alias,
//!   even if an equal path elsewhere in the qualifier already joined it
//!
//! Paths are immutable. Slicing (`parent`, `tail`) shares the segment
//! storage and only moves the window bounds.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};

pub const DB_PREFIX: &str = "db:";
pub const OBJ_PREFIX: &str = "obj:";
pub const OUTER_JOIN_MARKER: char = '+';
pub const SPLIT_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathNamespace {
    Object,
    Db,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: String,
    pub outer: bool,
    pub split: bool,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: false,
            split: false,
        }
    }

    pub fn outer(mut self) -> Self {
        self.outer = true;
        self
    }

    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }
}

#[derive(Clone)]
pub struct Path {
    namespace: PathNamespace,
    segments: Arc<[Segment]>,
    start: usize,
    end: usize,
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '#'
}

impl Path {
    /// Parse a path from its text form.
    pub fn parse(text: &str) -> Result<Path> {
        let (namespace, body) = if let Some(rest) = text.strip_prefix(DB_PREFIX) {
            (PathNamespace::Db, rest)
        } else if let Some(rest) = text.strip_prefix(OBJ_PREFIX) {
            (PathNamespace::Object, rest)
        } else {
            (PathNamespace::Object, text)
        };

        if body.is_empty() {
            return Err(Error::malformed_path(text, "path is empty"));
        }

        let mut segments = Vec::new();
        let mut current = Segment::new(String::new());

        for c in body.chars() {
            match c {
                '.' | SPLIT_SEPARATOR => {
                    if current.name.is_empty() {
                        // A leading '|' marks the first segment as split.
                        if c == SPLIT_SEPARATOR && segments.is_empty() && !current.split {
                            current.split = true;
                            continue;
                        }
                        return Err(Error::malformed_path(text, "empty path segment"));
                    }
                    segments.push(current);
                    current = Segment::new(String::new());
                    current.split = c == SPLIT_SEPARATOR;
                }
                OUTER_JOIN_MARKER => {
                    if current.name.is_empty() || current.outer {
                        return Err(Error::malformed_path(
                            text,
                            "'+' must directly follow a segment name",
                        ));
                    }
                    current.outer = true;
                }
                c if is_identifier_char(c) => {
                    if current.outer {
                        return Err(Error::malformed_path(
                            text,
                            "'+' must terminate a segment",
                        ));
                    }
                    if current.name.is_empty() && !is_identifier_start(c) {
                        return Err(Error::malformed_path(
                            text,
                            format!("segment can't start with '{}'", c),
                        ));
                    }
                    current.name.push(c);
                }
                other => {
                    return Err(Error::malformed_path(
                        text,
                        format!("invalid character '{}'", other),
                    ));
                }
            }
        }

        if current.name.is_empty() {
            return Err(Error::malformed_path(text, "empty path segment"));
        }
        segments.push(current);

        Ok(Path::from_segments(namespace, segments))
    }

    pub fn from_segments(namespace: PathNamespace, segments: Vec<Segment>) -> Path {
        let end = segments.len();
        Path {
            namespace,
            segments: segments.into(),
            start: 0,
            end,
        }
    }

    /// Object-layer path from plain segment names.
    pub fn object<I, S>(names: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path::from_segments(
            PathNamespace::Object,
            names.into_iter().map(Segment::new).collect(),
        )
    }

    /// Db-layer path from plain segment names.
    pub fn db<I, S>(names: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path::from_segments(
            PathNamespace::Db,
            names.into_iter().map(Segment::new).collect(),
        )
    }

    pub fn empty(namespace: PathNamespace) -> Path {
        Path::from_segments(namespace, Vec::new())
    }

    pub fn namespace(&self) -> PathNamespace {
        self.namespace
    }

    pub fn is_db(&self) -> bool {
        self.namespace == PathNamespace::Db
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments().first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments().last()
    }

    /// All segments but the last. The parent of a single-segment path is
    /// the empty path.
    pub fn parent(&self) -> Path {
        Path {
            namespace: self.namespace,
            segments: Arc::clone(&self.segments),
            start: self.start,
            end: self.end.saturating_sub(1).max(self.start),
        }
    }

    /// All segments but the first.
    pub fn tail(&self) -> Path {
        Path {
            namespace: self.namespace,
            segments: Arc::clone(&self.segments),
            start: (self.start + 1).min(self.end),
            end: self.end,
        }
    }

    pub fn append(&self, segment: Segment) -> Path {
        let mut segments = self.segments().to_vec();
        segments.push(segment);
        Path::from_segments(self.namespace, segments)
    }

    /// This path followed by all segments of `other`. The namespace of
    /// `self` wins.
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments().to_vec();
        segments.extend_from_slice(other.segments());
        Path::from_segments(self.namespace, segments)
    }

    pub fn with_namespace(&self, namespace: PathNamespace) -> Path {
        Path {
            namespace,
            segments: Arc::clone(&self.segments),
            start: self.start,
            end: self.end,
        }
    }

    /// Segment names joined with '.', without markers or namespace.
    pub fn plain(&self) -> String {
        self.segments()
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn has_markers(&self) -> bool {
        self.segments().iter().any(|s| s.outer || s.split)
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.segments() == other.segments()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.segments().hash(state);
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leading_split = self.first().map(|s| s.split).unwrap_or(false);
        match self.namespace {
            PathNamespace::Db => f.write_str(DB_PREFIX)?,
            // obj: is implied, unless needed to anchor a leading split marker
            PathNamespace::Object if leading_split => f.write_str(OBJ_PREFIX)?,
            PathNamespace::Object => {}
        }

        for (i, segment) in self.segments().iter().enumerate() {
            if segment.split {
                write!(f, "{}", SPLIT_SEPARATOR)?;
            } else if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if segment.outer {
                write!(f, "{}", OUTER_JOIN_MARKER)?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let path = Path::parse("toArtist.paintingArray").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.namespace(), PathNamespace::Object);
        assert_eq!(path.last().unwrap().name, "paintingArray");
        assert_eq!(path.to_string(), "toArtist.paintingArray");
    }

    #[test]
    fn test_namespaces() {
        let db = Path::parse("db:ARTIST_NAME").unwrap();
        assert!(db.is_db());
        assert_eq!(db.to_string(), "db:ARTIST_NAME");

        let obj = Path::parse("obj:artistName").unwrap();
        assert!(!obj.is_db());
        assert_eq!(obj.to_string(), "artistName");
        assert_eq!(obj, Path::parse("artistName").unwrap());
    }

    #[test]
    fn test_outer_join_markers() {
        let path = Path::parse("paintingArray+.toGallery+").unwrap();
        assert!(path.segments().iter().all(|s| s.outer));
        assert_eq!(path.to_string(), "paintingArray+.toGallery+");
        assert_ne!(path, Path::parse("paintingArray.toGallery").unwrap());
    }

    #[test]
    fn test_split_markers() {
        let inner = Path::parse("exhibits|paintings").unwrap();
        assert!(!inner.segments()[0].split);
        assert!(inner.segments()[1].split);
        assert_eq!(inner.to_string(), "exhibits|paintings");

        let leading = Path::parse("|exhibits.paintings").unwrap();
        assert!(leading.segments()[0].split);
        assert_eq!(leading.to_string(), "obj:|exhibits.paintings");
        assert_eq!(Path::parse(&leading.to_string()).unwrap(), leading);
    }

    #[test]
    fn test_malformed() {
        for text in ["", "db:", "a..b", ".a", "a.", "+a", "a++", "a+b", "a b", "a.1b", "||a"] {
            assert!(
                matches!(Path::parse(text), Err(Error::MalformedPathError { .. })),
                "expected '{}' to be rejected",
                text
            );
        }
    }

    #[test]
    fn test_parent_and_tail_share_storage() {
        let path = Path::parse("a.b.c").unwrap();
        let parent = path.parent();
        assert_eq!(parent, Path::parse("a.b").unwrap());
        assert!(Arc::ptr_eq(&parent.segments, &path.segments));
        assert_eq!(path.tail(), Path::parse("b.c").unwrap());

        let single = Path::parse("a").unwrap();
        assert!(single.parent().is_empty());
        assert!(single.parent().parent().is_empty());
    }

    #[test]
    fn test_join_and_append() {
        let prefix = Path::db(["toArtist"]);
        let joined = prefix.join(&Path::parse("paintingArray").unwrap());
        assert_eq!(joined.to_string(), "db:toArtist.paintingArray");
        assert_eq!(
            joined.append(Segment::new("X").outer()).to_string(),
            "db:toArtist.paintingArray.X+"
        );
    }

    #[test]
    fn test_hash_is_structural() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Path::parse("a.b.c").unwrap().parent());
        assert!(set.contains(&Path::parse("a.b").unwrap()));
    }
}
