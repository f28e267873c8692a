use std::str::FromStr;

use semver::{Comparator, Op, Version, VersionReq};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// A version constraint over a module.
///
/// Comma-separated alternatives, each a whitespace-separated intersection
/// of semver comparators (`>= 1.0.0 < 2.0.0, = 3.1.0`). An empty range
/// matches any version. A bare version pins exactly; `~>` is accepted as a
/// spelling of `~`.
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

#[derive(Debug, Error)]
#[error("invalid version range `{input}`")]
pub struct InvalidRangeError {
    input: String,
    #[source]
    source: semver::Error,
}

impl VersionRange {
    /// The range matching every version.
    pub fn any() -> Self {
        Self {
            raw: String::new(),
            alternatives: Vec::new(),
        }
    }

    /// The range matching exactly `version`.
    pub fn exact(version: &Version) -> Self {
        let comparator = Comparator {
            op: Op::Exact,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre: version.pre.clone(),
        };
        Self {
            raw: format!("={version}"),
            alternatives: vec![VersionReq {
                comparators: vec![comparator],
            }],
        }
    }

    pub fn is_any(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Whether `version` satisfies this range.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.is_empty() || self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl FromStr for VersionRange {
    type Err = InvalidRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Ok(Self::any());
        }
        let mut alternatives = Vec::new();
        for alternative in raw.split(',') {
            let normalized = normalize_intersection(alternative);
            alternatives.push(VersionReq::parse(&normalized).map_err(|source| {
                InvalidRangeError {
                    input: raw.to_string(),
                    source,
                }
            })?);
        }
        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }
}

/// Rewrite one space-separated intersection into the comma-separated form
/// `VersionReq` parses: glue detached operators onto the version that
/// follows, pin bare versions with `=`, and translate the pessimistic
/// operator. A dangling operator is passed through so `VersionReq::parse`
/// reports it.
fn normalize_intersection(part: &str) -> String {
    let mut comparators = Vec::new();
    let mut tokens = part.split_whitespace();
    while let Some(token) = tokens.next() {
        let token = if is_operator(token) {
            match tokens.next() {
                Some(version) => format!("{token}{version}"),
                None => token.to_string(),
            }
        } else {
            token.to_string()
        };
        let token = match token.strip_prefix("~>") {
            Some(rest) => pessimistic(rest),
            None => token,
        };
        if token.starts_with(|c: char| c.is_ascii_digit()) && !is_wildcard(&token) {
            comparators.push(format!("={token}"));
        } else {
            comparators.push(token);
        }
    }
    comparators.join(", ")
}

/// `~> 1.2.3` holds the first two segments (`~1.2.3`), while `~> 1.2` and
/// `~> 1` only hold the major (`^1.2`).
fn pessimistic(rest: &str) -> String {
    if rest.split('.').count() >= 3 {
        format!("~{rest}")
    } else {
        format!("^{rest}")
    }
}

fn is_operator(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '>' | '<' | '=' | '~' | '^'))
}

fn is_wildcard(token: &str) -> bool {
    token.split('.').any(|part| matches!(part, "*" | "x" | "X"))
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.raw.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&self.raw)
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use semver::Version;

    use super::VersionRange;

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::from_str(s).unwrap()
    }

    #[test]
    fn empty_matches_everything() {
        let any = range("");
        assert!(any.is_any());
        assert!(any.matches(&version("0.0.1")));
        assert!(any.matches(&version("99.0.0")));
    }

    #[test]
    fn bare_version_pins_exactly() {
        let pinned = range("1.2.3");
        assert!(pinned.matches(&version("1.2.3")));
        assert!(!pinned.matches(&version("1.2.4")));
    }

    #[test]
    fn exact_constructor() {
        let pinned = VersionRange::exact(&version("1.2.3"));
        assert_eq!(pinned.to_string(), "=1.2.3");
        assert!(pinned.matches(&version("1.2.3")));
        assert!(!pinned.matches(&version("1.2.2")));
    }

    #[test]
    fn detached_operators() {
        let bounded = range(">= 1.0.0 < 2.0.0");
        assert!(bounded.matches(&version("1.5.0")));
        assert!(!bounded.matches(&version("2.0.0")));
        assert!(!bounded.matches(&version("0.9.9")));
    }

    #[test]
    fn attached_operators() {
        let bounded = range(">=1.2.4");
        assert!(bounded.matches(&version("1.2.4")));
        assert!(!bounded.matches(&version("1.2.3")));
    }

    #[test]
    fn comma_is_union() {
        let either = range("<1.0.0, >=2.0.0");
        assert!(either.matches(&version("0.9.0")));
        assert!(either.matches(&version("2.1.0")));
        assert!(!either.matches(&version("1.5.0")));
    }

    #[test]
    fn pessimistic_operator() {
        let minor = range("~> 1.2");
        assert!(minor.matches(&version("1.2.9")));
        assert!(minor.matches(&version("1.9.0")));
        assert!(!minor.matches(&version("2.0.0")));

        let patch = range("~> 1.2.3");
        assert!(patch.matches(&version("1.2.9")));
        assert!(!patch.matches(&version("1.3.0")));
    }

    #[test]
    fn wildcards_pass_through() {
        let minor = range("1.2.x");
        assert!(minor.matches(&version("1.2.7")));
        assert!(!minor.matches(&version("1.3.0")));
    }

    #[test]
    fn preserves_raw_text() {
        assert_eq!(range("< 1.2.3").to_string(), "< 1.2.3");
        assert_eq!(range("").to_string(), "*");
    }

    #[test]
    fn rejects_garbage() {
        assert!(VersionRange::from_str("one.two").is_err());
        assert!(VersionRange::from_str(">=").is_err());
    }
}
