//! Path utilities

use std::path::PathBuf;

/// Name of the per-user data directory under `$HOME`
pub const DATA_DIR_NAME: &str = ".reviewer";

/// Per-user data directory (~/.reviewer)
///
/// Falls back to a directory relative to the working directory when no home
/// directory can be determined.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

/// Configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_inside_data_dir() {
        let path = config_path();
        assert!(path.starts_with(data_dir()));
        assert_eq!(path.file_name().unwrap(), "config.json");
    }

    #[test]
    fn test_data_dir_name() {
        assert!(data_dir().ends_with(DATA_DIR_NAME));
    }
}
