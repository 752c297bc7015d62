//! Pipeline configuration loader
//!
//! Load a pipeline configuration from a YAML file.

use std::path::Path;

use super::config::PipelineConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_file(path: &Path) -> Result<PipelineConfig, LoadError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        fs::write(
            &path,
            r#"
name: ci
matrix:
  - name: python-version
    values: ["3.10", "3.11"]
runner:
  command: pytest
  args: ["--cov"]
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(config.name, "ci");
        assert_eq!(config.matrix.len(), 1);
        assert_eq!(config.runner.args, vec!["--cov"]);
    }

    #[test]
    fn test_load_file_reports_filename_on_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");

        fs::write(&path, "name: [unclosed").unwrap();

        let err = ConfigLoader::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
