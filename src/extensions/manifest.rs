//! The contents of an extension file.

use serde::Deserialize;

use crate::error::ExtensionError;

/// Per-extension settings. An empty file enables every command of the module.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Commands of the module that should not be registered.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Replaces the help category of the module's commands.
    pub category: Option<String>,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self, ExtensionError> {
        let to_toml = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(to_toml).map_err(|error| ExtensionError::Manifest {
            reason: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_has_defaults() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.disabled.is_empty());
        assert!(manifest.category.is_none());
    }

    #[test]
    fn fields_are_read() {
        let manifest = Manifest::parse("disabled = [\"ping\"]\ncategory = \"Fun\"").unwrap();
        assert_eq!(manifest.disabled, ["ping"]);
        assert_eq!(manifest.category.as_deref(), Some("Fun"));
    }

    #[test]
    fn unknown_keys_are_errors() {
        let error = Manifest::parse("enabled = true").unwrap_err();
        assert!(matches!(error, ExtensionError::Manifest { .. }));
    }

    #[test]
    fn wrong_types_name_the_field() {
        let error = Manifest::parse("disabled = \"ping\"").unwrap_err();
        assert!(error.to_string().contains("disabled"), "{error}");
    }
}
