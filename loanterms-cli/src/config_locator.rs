use std::path::{Path, PathBuf};

const APP_DIR: &str = "loanterms";
const CONFIG_FILE: &str = "config.yaml";

/// Finds the YAML config the CLI should load.
///
/// Lookup order: explicit `--config`, then the per-user config file, then none
/// (built-in defaults plus environment).
pub struct ConfigLocator;

impl ConfigLocator {
    /// Per-user config file location, whether or not it exists.
    pub fn user_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn resolve(explicit: Option<&str>) -> Option<PathBuf> {
        Self::resolve_with(explicit, Self::user_config_path())
    }

    fn resolve_with(explicit: Option<&str>, user_path: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            // A missing explicit file must surface as a load error, not be skipped
            return Some(PathBuf::from(path));
        }
        user_path.filter(|p| Path::new(p).is_file())
    }

    fn config_dir() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|base| base.join(APP_DIR))
        }

        // ~/.config/loanterms on macOS too, rather than ~/Library/Application Support
        #[cfg(not(windows))]
        {
            dirs::home_dir().map(|home| home.join(".config").join(APP_DIR))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins_even_if_missing() {
        let resolved = ConfigLocator::resolve_with(Some("/nope/custom.yaml"), Some(PathBuf::from("/etc/hosts")));
        assert_eq!(resolved, Some(PathBuf::from("/nope/custom.yaml")));
    }

    #[test]
    fn test_missing_user_file_falls_back_to_defaults() {
        let resolved = ConfigLocator::resolve_with(None, Some(PathBuf::from("/definitely/not/here.yaml")));
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_user_path_ends_with_app_config() {
        if let Some(path) = ConfigLocator::user_config_path() {
            assert!(path.ends_with("loanterms/config.yaml"));
        }
    }
}
