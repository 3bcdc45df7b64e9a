//! Policy document parsing from YAML/JSON.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    // Slugs double as validator-group tags on evaluator accounts, so the
    // format is locked down.
    static ref SLUG_PATTERN: Regex = Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
}

/// Errors that can occur when loading policy documents.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Policy validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Who a validator is: the institution's display name (used verbatim in
/// composite-result clauses) and its slug (the validator-group tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorIdentity {
    pub name: String,
    pub slug: String,
}

impl ValidatorIdentity {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
        }
    }

    /// Auth uid of the validator's synthetic evaluator account.
    pub fn auth_uid(&self) -> String {
        format!("{}@validator", self.slug)
    }
}

/// How a validator's judgment participates in consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPolicy {
    /// When true, this validator's accepted judgment becomes the final
    /// outcome directly, discarding any accumulated composite string.
    #[serde(default)]
    pub is_absolute: bool,

    /// When true, consolidation may only finalize after at least one
    /// non-validator (human) evaluation has been submitted.
    #[serde(default = "default_true")]
    pub homologation_required: bool,

    /// Slugs of other validators whose submitted evaluations must be
    /// present before this validator's consolidation may finalize.
    #[serde(default)]
    pub required_validations: BTreeSet<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            is_absolute: false,
            homologation_required: true,
            required_validations: BTreeSet::new(),
        }
    }
}

/// A validator policy document: identity plus consolidation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Institution display name.
    pub name: String,

    /// Institution slug; also the validator-group tag.
    pub slug: String,

    #[serde(default)]
    pub is_absolute: bool,

    #[serde(default = "default_true")]
    pub homologation_required: bool,

    #[serde(default)]
    pub required_validations: BTreeSet<String>,
}

impl ValidatorConfig {
    /// Parse a policy from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        let config: ValidatorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a policy from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let config: ValidatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a policy from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a policy from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Supplement `required_validations` from the environment.
    ///
    /// Reads `{SLUG}_REQUIRED_VALIDATIONS` (slug upper-cased, `-` mapped to
    /// `_`) as a JSON array of slugs, the format deployments have always
    /// used. Absent variable leaves the document's list untouched.
    pub fn with_env_required_validations(mut self) -> Result<Self, PolicyError> {
        let var = format!(
            "{}_REQUIRED_VALIDATIONS",
            self.slug.to_uppercase().replace('-', "_")
        );
        if let Ok(raw) = std::env::var(&var) {
            let slugs: Vec<String> = serde_json::from_str(&raw)?;
            self.required_validations.extend(slugs);
        }
        Ok(self)
    }

    /// Validate the document structure.
    fn validate(&self) -> Result<(), PolicyError> {
        if self.name.is_empty() {
            return Err(PolicyError::MissingField("name".to_string()));
        }

        if self.slug.is_empty() {
            return Err(PolicyError::MissingField("slug".to_string()));
        }

        if !SLUG_PATTERN.is_match(&self.slug) {
            return Err(PolicyError::ValidationError(format!(
                "Invalid slug '{}': expected lowercase letters, digits, '-' or '_'",
                self.slug
            )));
        }

        for required in &self.required_validations {
            if !SLUG_PATTERN.is_match(required) {
                return Err(PolicyError::ValidationError(format!(
                    "Invalid required validation slug '{}'",
                    required
                )));
            }
        }

        // A required entry naming this validator itself is tolerated: the
        // engine treats it as always satisfied.
        Ok(())
    }

    /// Split into the identity and policy values the engine consumes.
    pub fn into_parts(self) -> (ValidatorIdentity, ValidatorPolicy) {
        (
            ValidatorIdentity {
                name: self.name,
                slug: self.slug,
            },
            ValidatorPolicy {
                is_absolute: self.is_absolute,
                homologation_required: self.homologation_required,
                required_validations: self.required_validations,
            },
        )
    }
}
