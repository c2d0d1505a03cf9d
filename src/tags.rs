//! Case-insensitive tag sets attached to recorded timings.

use std::collections::hash_set;
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Separator used by the canonical text form (`tag1,tag2,tag3`).
const SEPARATOR: char = ',';

/// A single normalized label.
///
/// Equality and hashing ignore case, so `"Reports"` and `"reports"` are the
/// same tag. The casing a tag was first created with is the casing it keeps.
#[derive(Debug, Clone)]
pub struct Tag(String);

impl Tag {
    /// Normalize `raw` into a tag.
    ///
    /// Commas and line breaks are removed (not escaped) and the result is
    /// trimmed. Returns `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let stripped: String = raw
            .chars()
            .filter(|&c| !matches!(c, SEPARATOR | '\r' | '\n'))
            .collect();
        let trimmed = stripped.trim();

        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The normalized text, in the casing it was created with.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An unordered, case-insensitive, de-duplicated set of tags.
///
/// Blank input is silently discarded: tags are a best-effort annotation and
/// never cause an error.
///
/// # Example
///
/// ```rust
/// use profiled_db::TagCollection;
///
/// let tags = TagCollection::new(["reports", "Reports", " nightly "]);
/// assert_eq!(tags.len(), 2);
/// assert!(tags.contains("NIGHTLY"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCollection {
    tags: HashSet<Tag>,
}

impl TagCollection {
    /// Build a collection from raw strings, normalizing each one.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collection = Self::default();
        collection.extend(tags);
        collection
    }

    /// Parse the canonical comma-joined form produced by `to_string()`.
    ///
    /// Returns `None` for blank input.
    pub fn parse(serialized: &str) -> Option<Self> {
        if serialized.trim().is_empty() {
            return None;
        }

        Some(Self::new(serialized.split(SEPARATOR)))
    }

    /// Normalize and add a tag. Returns `false` when nothing was added,
    /// either because the input was blank or because an equal tag exists.
    pub fn insert(&mut self, raw: &str) -> bool {
        match Tag::new(raw) {
            Some(tag) => self.tags.insert(tag),
            None => false,
        }
    }

    /// Remove the tag equal to `raw` after normalization.
    pub fn remove(&mut self, raw: &str) -> bool {
        Tag::new(raw).is_some_and(|tag| self.tags.remove(&tag))
    }

    /// Whether a tag equal to `raw` (ignoring case) is present.
    pub fn contains(&self, raw: &str) -> bool {
        Tag::new(raw).is_some_and(|tag| self.tags.contains(&tag))
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the collection holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Remove every tag.
    pub fn clear(&mut self) {
        self.tags.clear();
    }

    /// Iterate over the stored tags in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(Tag::as_str)
    }
}

impl fmt::Display for TagCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for TagCollection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s).unwrap_or_default())
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagCollection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<S: AsRef<str>> Extend<S> for TagCollection {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for raw in iter {
            self.insert(raw.as_ref());
        }
    }
}

impl<'a> IntoIterator for &'a TagCollection {
    type Item = &'a Tag;
    type IntoIter = hash_set::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}
