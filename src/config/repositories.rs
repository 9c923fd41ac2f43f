//! # Repository Configuration
//!
//! The set of files to update when an image is pushed.
//!
//! ```yaml
//! repositories:
//!   - name: mynamespace/repository        # image repository from the hook
//!     sourceRepo: testorg/testrepo        # Git repository holding the manifest
//!     sourceBranch: master
//!     filePath: environments/test/service.yaml
//!     updateKey: spec.template.spec.containers.0.image
//!     branchGenerateName: image-updater-  # omit to commit to sourceBranch
//!     tagMatch: "^v[0-9]+"                # optional tag filter
//! ```
//!
//! The configuration is loaded once at startup and shared read-only.

use crate::constants::DEFAULT_SOURCE_BRANCH;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read YAML: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to unmarshal YAML: {0}")]
    Unmarshal(#[from] serde_yaml::Error),

    #[error("failed to compile TagMatch regular expression {pattern:?}: {source}")]
    TagMatch {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("repository {name:?} is missing required field {field}")]
    MissingField { name: String, field: &'static str },
}

/// Everything needed to update one file in one Git repository
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryUpdateConfig {
    /// Image repository name, matched against the push event
    pub name: String,
    /// Git repository in `owner/name` form
    pub source_repo: String,
    #[serde(default = "default_source_branch")]
    pub source_branch: String,
    pub file_path: String,
    /// Dotted path of the key to replace, e.g. `spec.template.spec.containers.0.image`
    pub update_key: String,
    /// Prefix for a freshly generated branch; empty means commit to `source_branch`
    #[serde(
        default,
        alias = "branchGenerateNamePrefix",
        skip_serializing_if = "Option::is_none"
    )]
    pub branch_generate_name: Option<String>,
    /// Regular expression the pushed tag must match
    #[serde(default, alias = "tagMatchPattern", skip_serializing_if = "Option::is_none")]
    pub tag_match: Option<String>,
}

fn default_source_branch() -> String {
    DEFAULT_SOURCE_BRANCH.to_string()
}

impl RepositoryUpdateConfig {
    /// The configured branch prefix, treating an empty string as unset.
    #[must_use]
    pub fn branch_prefix(&self) -> Option<&str> {
        self.branch_generate_name
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
    }

    /// Apply the optional `tagMatch` filter to a pushed tag.
    ///
    /// Without a pattern every event matches. With a pattern, an event without
    /// a tag never matches.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TagMatch`] if the pattern does not compile. A
    /// tag that simply does not match is `Ok(false)`.
    pub fn matches_tag(&self, tag: Option<&str>) -> Result<bool, ConfigError> {
        let Some(pattern) = self.tag_match.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(true);
        };
        let re = compile_tag_match(pattern)?;
        Ok(tag.is_some_and(|tag| re.is_match(tag)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("sourceRepo", &self.source_repo),
            ("sourceBranch", &self.source_branch),
            ("filePath", &self.file_path),
            ("updateKey", &self.update_key),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingField {
                    name: self.name.clone(),
                    field,
                });
            }
        }
        if let Some(pattern) = self.tag_match.as_deref().filter(|p| !p.is_empty()) {
            compile_tag_match(pattern)?;
        }
        Ok(())
    }
}

fn compile_tag_match(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::TagMatch {
        pattern: pattern.to_string(),
        source,
    })
}

/// Ordered list of repository configurations
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct RepoConfiguration {
    #[serde(default)]
    pub repositories: Vec<RepositoryUpdateConfig>,
}

impl RepoConfiguration {
    #[must_use]
    pub fn new(repositories: Vec<RepositoryUpdateConfig>) -> Self {
        Self { repositories }
    }

    /// Parse a YAML configuration from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the reader fails or the YAML is malformed.
    pub fn parse(mut reader: impl Read) -> Result<Self, ConfigError> {
        let mut body = String::new();
        reader.read_to_string(&mut body)?;
        Self::from_yaml_str(&body)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Unmarshal`] if the YAML is malformed.
    pub fn from_yaml_str(body: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(body)?)
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Self::parse(file)
    }

    /// First configuration whose `name` is exactly `name`
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RepositoryUpdateConfig> {
        self.repositories.iter().find(|cfg| cfg.name == name)
    }

    /// Check required fields and compile every tag pattern.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.repositories
            .iter()
            .try_for_each(RepositoryUpdateConfig::validate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> RepositoryUpdateConfig {
        RepositoryUpdateConfig {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find() {
        let cfgs = RepoConfiguration::new(vec![named("testing"), named("another")]);

        assert_eq!(cfgs.find("testing"), Some(&named("testing")));
        assert_eq!(cfgs.find("unknown"), None);
    }

    #[test]
    fn test_find_first_match_wins() {
        let mut first = named("dup");
        first.file_path = "first.yaml".to_string();
        let mut second = named("dup");
        second.file_path = "second.yaml".to_string();
        let cfgs = RepoConfiguration::new(vec![first, second]);

        assert_eq!(
            cfgs.find("dup").map(|c| c.file_path.as_str()),
            Some("first.yaml")
        );
    }

    #[test]
    fn test_parse_fixture() {
        let cfgs = RepoConfiguration::parse(
            include_bytes!("../../tests/fixtures/config.yaml").as_slice(),
        )
        .expect("fixture should parse");

        assert_eq!(cfgs.len(), 2);
        assert_eq!(
            cfgs.repositories[0],
            RepositoryUpdateConfig {
                name: "testing/repo-image".to_string(),
                source_repo: "example/example-source".to_string(),
                source_branch: "master".to_string(),
                file_path: "test/file.yaml".to_string(),
                update_key: "person.name".to_string(),
                branch_generate_name: Some("repo-imager-".to_string()),
                tag_match: None,
            }
        );
        assert_eq!(cfgs.repositories[1].source_branch, "master");
        assert_eq!(cfgs.repositories[1].tag_match.as_deref(), Some("^v[0-9]+"));
        cfgs.validate().expect("fixture should be valid");
    }

    #[test]
    fn test_parse_accepts_long_field_names() {
        let cfgs = RepoConfiguration::from_yaml_str(
            r"
repositories:
  - name: org/image
    sourceRepo: org/repo
    sourceBranch: main
    filePath: deploy.yaml
    updateKey: image
    branchGenerateNamePrefix: bump-
    tagMatchPattern: ^prod$
",
        )
        .expect("config should parse");

        let cfg = &cfgs.repositories[0];
        assert_eq!(cfg.branch_prefix(), Some("bump-"));
        assert_eq!(cfg.tag_match.as_deref(), Some("^prod$"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = RepoConfiguration::from_yaml_str("repositories: [").unwrap_err();
        assert!(err.to_string().starts_with("failed to unmarshal YAML"), "{err}");
    }

    #[test]
    fn test_load_missing_file() {
        let err = RepoConfiguration::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)), "{err}");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "repositories:\n  - name: a\n    sourceRepo: o/r\n    filePath: f.yaml\n    updateKey: k\n",
        )
        .expect("write config");

        let cfgs = RepoConfiguration::load(&path).expect("config should load");
        assert_eq!(cfgs.find("a").map(|c| c.source_branch.as_str()), Some("master"));
    }

    #[test]
    fn test_branch_prefix_treats_empty_as_unset() {
        let mut cfg = named("a");
        assert_eq!(cfg.branch_prefix(), None);
        cfg.branch_generate_name = Some(String::new());
        assert_eq!(cfg.branch_prefix(), None);
        cfg.branch_generate_name = Some("x-".to_string());
        assert_eq!(cfg.branch_prefix(), Some("x-"));
    }

    #[test]
    fn test_matches_tag() {
        let mut cfg = named("a");
        assert!(cfg.matches_tag(Some("anything")).unwrap());
        assert!(cfg.matches_tag(None).unwrap());

        cfg.tag_match = Some("^v.*".to_string());
        assert!(cfg.matches_tag(Some("v1.0")).unwrap());
        assert!(!cfg.matches_tag(Some("production")).unwrap());
        assert!(!cfg.matches_tag(None).unwrap());
    }

    #[test]
    fn test_matches_tag_with_invalid_pattern() {
        let mut cfg = named("a");
        cfg.tag_match = Some("^v[".to_string());

        let err = cfg.matches_tag(Some("v1")).unwrap_err();
        assert!(matches!(err, ConfigError::TagMatch { .. }), "{err}");
    }

    #[test]
    fn test_validate_missing_field() {
        let cfgs = RepoConfiguration::new(vec![named("a")]);
        let err = cfgs.validate().unwrap_err();
        assert!(
            err.to_string().contains("missing required field sourceRepo"),
            "{err}"
        );
    }

    #[test]
    fn test_validate_bad_pattern() {
        let cfgs = RepoConfiguration::new(vec![RepositoryUpdateConfig {
            name: "a".to_string(),
            source_repo: "o/r".to_string(),
            source_branch: "main".to_string(),
            file_path: "f.yaml".to_string(),
            update_key: "k".to_string(),
            branch_generate_name: None,
            tag_match: Some("(".to_string()),
        }]);

        assert!(matches!(
            cfgs.validate().unwrap_err(),
            ConfigError::TagMatch { .. }
        ));
    }
}
