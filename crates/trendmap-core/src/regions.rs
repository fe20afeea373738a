use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One region that ingestion pulls trends for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Two-letter (or trends-specific) region code, e.g. `US`.
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegionsFile {
    pub regions: Vec<RegionConfig>,
}

impl RegionsFile {
    /// Region codes in configured order.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.code.clone()).collect()
    }
}

/// Load and validate the region list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_regions(path: &Path) -> Result<RegionsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RegionsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_regions(&content)
}

/// Parse and validate a YAML region list. Codes are upper-cased.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_regions(content: &str) -> Result<RegionsFile, ConfigError> {
    let mut regions_file: RegionsFile = serde_yaml::from_str(content)?;
    for region in &mut regions_file.regions {
        region.code = region.code.trim().to_ascii_uppercase();
    }
    validate_regions(&regions_file)?;
    Ok(regions_file)
}

fn validate_regions(regions_file: &RegionsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for region in &regions_file.regions {
        if region.code.is_empty() {
            return Err(ConfigError::Validation(
                "region code must be non-empty".to_string(),
            ));
        }
        if region.code.eq_ignore_ascii_case("global") {
            return Err(ConfigError::Validation(
                "'global' is reserved and cannot be used as a region code".to_string(),
            ));
        }
        if !region
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "region code '{}' must be ASCII alphanumeric",
                region.code
            )));
        }
        if !seen.insert(region.code.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region code: '{}'",
                region.code
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases_codes() {
        let yaml = "regions:\n  - code: us\n    name: United States\n  - code: UA\n";
        let file = parse_regions(yaml).expect("valid yaml");
        assert_eq!(file.codes(), vec!["US".to_string(), "UA".to_string()]);
        assert_eq!(file.regions[0].name.as_deref(), Some("United States"));
        assert!(file.regions[1].name.is_none());
    }

    #[test]
    fn rejects_duplicate_codes_case_insensitively() {
        let yaml = "regions:\n  - code: US\n  - code: us\n";
        let err = parse_regions(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_reserved_global_code() {
        let yaml = "regions:\n  - code: Global\n";
        assert!(matches!(
            parse_regions(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_code() {
        let yaml = "regions:\n  - code: \"  \"\n";
        assert!(matches!(
            parse_regions(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            parse_regions("regions: [code: ["),
            Err(ConfigError::RegionsFileParse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_regions(Path::new("/nonexistent/regions.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::RegionsFileIo { .. }));
    }
}
