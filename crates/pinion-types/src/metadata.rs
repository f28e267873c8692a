use semver::Version;
use serde::{Deserialize, Serialize};

/// One entry of a `dependencies` array, as found both in a repository's
/// `metadata.json` and in forge release metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDependency {
    /// `author-name` or `author/name`.
    pub name: String,
    /// Absent means any version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_requirement: Option<String>,
}

/// The subset of a module repository's top-level `metadata.json` the
/// resolver consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMetadata {
    pub version: Version,
    #[serde(default)]
    pub dependencies: Vec<MetadataDependency>,
}

#[cfg(test)]
mod tests {
    use super::ModuleMetadata;

    #[test]
    fn parses_minimal_metadata() {
        let metadata: ModuleMetadata = serde_json::from_str(r#"{"version": "1.2.3"}"#).unwrap();
        assert_eq!(metadata.version.to_string(), "1.2.3");
        assert!(metadata.dependencies.is_empty());
    }

    #[test]
    fn parses_dependencies() {
        let metadata: ModuleMetadata = serde_json::from_str(
            r#"{
                "name": "acme-base",
                "version": "2.0.0",
                "dependencies": [
                    {"name": "puppetlabs/stdlib", "version_requirement": ">= 4.0.0"},
                    {"name": "puppetlabs/concat"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(metadata.dependencies.len(), 2);
        assert_eq!(metadata.dependencies[0].name, "puppetlabs/stdlib");
        assert_eq!(
            metadata.dependencies[0].version_requirement.as_deref(),
            Some(">= 4.0.0")
        );
        assert_eq!(metadata.dependencies[1].version_requirement, None);
    }

    #[test]
    fn rejects_unparsable_version() {
        assert!(serde_json::from_str::<ModuleMetadata>(r#"{"version": "not-semver"}"#).is_err());
        assert!(serde_json::from_str::<ModuleMetadata>(r#"{}"#).is_err());
    }
}
