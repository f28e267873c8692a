use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The identity of a module: `author-name`, case-sensitive.
///
/// Registry payloads sometimes spell the separator as a slash
/// (`author/name`); both forms are accepted on input, while output always
/// uses `author-name`. Since authors never contain a dash, the first dash
/// is the separator and the name keeps any further dashes or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug {
    author: String,
    name: String,
}

#[derive(Debug, Clone, Error)]
#[error("not a valid module slug: `{0}`")]
pub struct InvalidSlugError(String);

impl Slug {
    /// Create a validated slug from its parts.
    pub fn new(
        author: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, InvalidSlugError> {
        let (author, name) = (author.into(), name.into());
        if author.is_empty()
            || name.is_empty()
            || !author.chars().all(|c| c.is_ascii_alphanumeric())
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(InvalidSlugError(format!("{author}-{name}")));
        }
        Ok(Self { author, name })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for Slug {
    type Err = InvalidSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (author, name) = s
            .split_once('/')
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| InvalidSlugError(s.to_string()))?;
        Self::new(author, name).map_err(|_| InvalidSlugError(s.to_string()))
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.author, self.name)
    }
}

impl Serialize for Slug {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
