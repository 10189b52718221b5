// Platform directory resolution.
// Locates the per-user cache and config directories for the default instance.

use std::path::PathBuf;

use directories::ProjectDirs;

/// Subdirectory of the cache root that holds image entries.
pub const DEFAULT_DIR: &str = "img";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "imgcache")
}

/// Get the base cache directory (~/.cache/imgcache on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Directory backing the default cache instance.
pub fn default_image_dir() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(DEFAULT_DIR))
}

/// Path to the optional JSON configuration file.
pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        // Path construction only, nothing is created
        if let Some(dir) = default_image_dir() {
            assert!(dir.ends_with(DEFAULT_DIR));
            assert!(dir.starts_with(cache_dir().unwrap()));
        }
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.json"));
        }
    }
}
