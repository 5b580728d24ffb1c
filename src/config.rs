use crate::simulation::SimulationConfig;
use crate::task::TaskOrchestratorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub orchestrator: TaskOrchestratorConfig,
    pub simulation: SimulationConfig,
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.simulation.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Convert configuration to a TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_toml_serialization() {
        let config = OrchestratorConfig::default();

        let toml_str = config.to_toml_string().expect("Failed to serialize to TOML");
        assert!(toml_str.contains("[orchestrator]"));
        assert!(toml_str.contains("reject_dependency_cycles = true"));

        let deserialized =
            OrchestratorConfig::from_toml_str(&toml_str).expect("Failed to deserialize from TOML");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
[simulation]
workers = 8
"#,
        )
        .unwrap();

        assert_eq!(config.simulation.workers, 8);
        assert_eq!(
            config.simulation.failure_rate,
            SimulationConfig::default().failure_rate
        );
        assert!(config.orchestrator.reject_dependency_cycles);
    }

    #[test]
    fn test_config_toml_file_operations() {
        use tempfile::NamedTempFile;

        let mut config = OrchestratorConfig::default();
        config.orchestrator.warn_on_missing_dependencies = false;

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        config
            .to_toml_file(temp_file.path())
            .expect("Failed to save config to file");

        let loaded = OrchestratorConfig::from_toml_file(temp_file.path())
            .expect("Failed to load config from file");
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = OrchestratorConfig::from_toml_str("orchestrator = 3").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML configuration"));
    }
}
