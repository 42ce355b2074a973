use crate::error::{IdentityError, IdentityResult};
use serde::{Deserialize, Serialize};

/// Names of the silver-layer columns the loader reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceColumns {
    pub year: String,
    pub month: String,
    pub originator_name: String,
    pub originator_number: String,
    pub sponsor_name: String,
    pub sponsor_number: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            year: "Year".into(),
            month: "Month".into(),
            originator_name: "Originating Mortgagee".into(),
            originator_number: "Originating Mortgagee Number".into(),
            sponsor_name: "Sponsor Name".into(),
            sponsor_number: "Sponsor Number".into(),
        }
    }
}

impl SourceColumns {
    /// Every column the loader requires, in a stable order.
    pub fn required(&self) -> [&str; 6] {
        [
            self.year.as_str(),
            self.month.as_str(),
            self.originator_name.as_str(),
            self.originator_number.as_str(),
            self.sponsor_name.as_str(),
            self.sponsor_number.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub table: String,
    #[serde(default)]
    pub columns: SourceColumns,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            table: "single_family".into(),
            columns: SourceColumns::default(),
        }
    }
}

/// How many oscillation records one institution can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OscillationMode {
    /// Stop at the first oscillating name found for an institution.
    FirstPerInstitution,
    /// Report every oscillating name.
    Exhaustive,
}

impl Default for OscillationMode {
    fn default() -> Self {
        Self::FirstPerInstitution
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub crosswalk_file: String,
    pub errors_file: String,
    pub events_file: String,
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            crosswalk_file: "institution_crosswalk.csv".into(),
            errors_file: "institution_mapping_errors.csv".into(),
            events_file: "institution_name_events.csv".into(),
            report_file: "institution_analysis_report.txt".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub oscillation_mode: OscillationMode,
    #[serde(default = "default_notable_institutions")]
    pub notable_institutions: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
}

// Quicken/Rocket and Freedom.
fn default_notable_institutions() -> Vec<String> {
    vec!["71970".into(), "75159".into()]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            oscillation_mode: OscillationMode::default(),
            notable_institutions: default_notable_institutions(),
            output: OutputConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> IdentityResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| IdentityError::Config(format!("Cannot read {path}: {e}")))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| IdentityError::Config(format!("Cannot parse {path}: {e}")))?;
        if config.source.table.trim().is_empty() {
            return Err(IdentityError::Config(format!("{path}: source.table is empty")));
        }
        Ok(config)
    }

    pub fn with_oscillation_mode(mut self, mode: OscillationMode) -> Self {
        self.oscillation_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"oscillation_mode": "exhaustive"}"#).unwrap();
        assert_eq!(cfg.oscillation_mode, OscillationMode::Exhaustive);
        assert_eq!(cfg.source.table, "single_family");
        assert_eq!(cfg.source.columns.sponsor_number, "Sponsor Number");
        assert_eq!(cfg.notable_institutions, vec!["71970", "75159"]);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = AnalysisConfig::load("/nonexistent/analysis.json").unwrap_err();
        assert!(matches!(err, IdentityError::Config(_)));
    }
}
