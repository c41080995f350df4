//! Scene configuration file. Loaded from `config.ron` at startup.

use engine_core::SceneConfig;
use std::path::{Path, PathBuf};

/// Load the scene config from `path`. A missing file gives the defaults silently; an
/// unreadable or invalid one gives the defaults with a warning.
pub fn load_scene_config(path: &Path) -> SceneConfig {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No config at {:?}, using defaults", path);
            return SceneConfig::default();
        }
        Err(e) => {
            log::warn!("Could not read config at {:?}: {}, using defaults", path, e);
            return SceneConfig::default();
        }
    };
    match ron::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Invalid config at {:?}: {}, using defaults", path, e);
            SceneConfig::default()
        }
    }
}

/// `config.ron` in the current directory.
pub fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("isleview-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("isleview-definitely-missing.ron");
        assert_eq!(load_scene_config(&path), SceneConfig::default());
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let path = temp_file("invalid.ron", "(terrain: (size: \"big\"))");
        assert_eq!(load_scene_config(&path), SceneConfig::default());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let path = temp_file(
            "partial.ron",
            "(sky: (time_rate: 10.0), population: (seed: Some(7)), water: (enabled: false))",
        );
        let config = load_scene_config(&path);
        assert_eq!(config.sky.time_rate, 10.0);
        assert_eq!(config.sky.start_time, 480.0);
        assert_eq!(config.population.seed, Some(7));
        assert!(!config.water.enabled);
        assert_eq!(config.camera, SceneConfig::default().camera);
        std::fs::remove_file(path).ok();
    }
}
