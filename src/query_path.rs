use std::fmt::{self, Display, Formatter, Write};

use serde::{Deserialize, Serialize};

/// A segment of a response path: a response key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryPathSegment {
    Index(usize),
    Field(String),
}

impl From<&str> for QueryPathSegment {
    fn from(value: &str) -> Self {
        QueryPathSegment::Field(value.to_string())
    }
}

impl From<usize> for QueryPathSegment {
    fn from(value: usize) -> Self {
        QueryPathSegment::Index(value)
    }
}

/// The path from the response root down to the value currently being resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryPath(Vec<QueryPathSegment>);

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<QueryPathSegment>) {
        self.0.push(segment.into());
    }

    /// A copy of this path extended with one more segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<QueryPathSegment>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn last(&self) -> Option<&QueryPathSegment> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryPathSegment> {
        self.0.iter()
    }
}

impl IntoIterator for QueryPath {
    type Item = QueryPathSegment;
    type IntoIter = std::vec::IntoIter<QueryPathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for QueryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_char('.')?;
            }
            match segment {
                QueryPathSegment::Index(idx) => write!(f, "{idx}")?,
                QueryPathSegment::Field(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}
