//! The subset of the forge v3 payloads the resolver consumes.

use serde::{Deserialize, Serialize};

use pinion_types::MetadataDependency;

/// `GET /v3/modules/{author}-{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Newest first, in registry order.
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<SupersededBy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupersededBy {
    pub slug: String,
}

/// `GET /v3/releases/{author}-{name}-{version}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub metadata: ReleaseMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    #[serde(default)]
    pub dependencies: Vec<MetadataDependency>,
}

/// Derived from module data; a module is deprecated iff the registry
/// reports a `deprecated_at` timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct DeprecationStatus {
    pub deprecated_at: String,
    pub reason: Option<String>,
    pub superseded_by: Option<String>,
}

impl ModuleData {
    pub fn deprecation_status(&self) -> Option<DeprecationStatus> {
        let deprecated_at = self.deprecated_at.clone()?;
        Some(DeprecationStatus {
            deprecated_at,
            reason: self.deprecated_for.clone(),
            superseded_by: self
                .superseded_by
                .as_ref()
                .map(|superseded| superseded.slug.clone()),
        })
    }
}

impl std::fmt::Display for DeprecationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deprecated at {}", self.deprecated_at)?;
        if let Some(superseded_by) = &self.superseded_by {
            write!(f, ", superseded by `{superseded_by}`")?;
        }
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleData;

    #[test]
    fn deprecation_requires_a_timestamp() {
        let data: ModuleData = serde_json::from_str(
            r#"{"slug": "acme-base", "deprecated_for": "abandoned"}"#,
        )
        .unwrap();
        assert!(data.deprecation_status().is_none());
    }

    #[test]
    fn deprecation_status_carries_everything() {
        let data: ModuleData = serde_json::from_str(
            r#"{
                "slug": "acme-base",
                "deprecated_at": "2023-04-01 10:30:00 -0700",
                "deprecated_for": "some reason",
                "superseded_by": {"slug": "other-module"}
            }"#,
        )
        .unwrap();
        let status = data.deprecation_status().unwrap();
        let rendered = status.to_string();
        assert!(rendered.contains("2023-04-01 10:30:00 -0700"));
        assert!(rendered.contains("other-module"));
        assert!(rendered.contains("some reason"));
    }
}
