//! Standard paths used by trustgate tools

use std::path::PathBuf;

/// Standard trustgate paths
pub struct Paths {
    /// Data directory (~/.local/share/trustgate)
    pub data: PathBuf,
    /// Config directory (~/.config/trustgate)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("trustgate");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("trustgate");

        Self { data, config }
    }

    /// Default run configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("trustgate.yaml")
    }

    /// Default directory for audit output of experiment runs
    pub fn runs(&self) -> PathBuf {
        self.data.join("runs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        let paths = Paths::new();
        assert!(paths.config_file().ends_with("trustgate/trustgate.yaml"));
        assert!(paths.runs().ends_with("trustgate/runs"));
    }
}
