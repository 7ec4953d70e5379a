use crate::config::ScalingConfig;
use std::path::{Path, PathBuf};
use tilepart_core::error::TilepartError;

/// Debug mask and configuration shared by all dispatches
#[derive(Debug, Default, Clone)]
pub struct Runtime {
    pub(crate) config: ScalingConfig,
    // Directory the config was loaded from
    config_dir: Option<PathBuf>,
    // Bit 0 config, bit 1 selection, bit 2 sizes, bit 3 emitted commands
    debug: u32,
}

impl Runtime {
    /// Runtime with explicit configuration, nothing is read from disk
    #[must_use]
    pub fn new(config: ScalingConfig, debug: u32) -> Runtime {
        Runtime {
            config,
            config_dir: None,
            debug,
        }
    }

    /// Read `TILEPART_DEBUG`, search config directories for
    /// `tilepart/scaling_config.json` and apply environment overrides.
    /// Missing or broken config falls back to defaults.
    #[must_use]
    pub fn from_env() -> Runtime {
        let mut runtime = Runtime::default();
        if let Ok(x) = std::env::var("TILEPART_DEBUG") {
            if let Ok(x) = x.parse::<u32>() {
                runtime.debug = x;
            }
        }
        let debug_config = runtime.debug_config();

        let mut config_dir = None;
        runtime.config = xdg::BaseDirectories::new()
            .map_err(|e| {
                if debug_config {
                    println!("Failed to find config directories for scaling_config.json, {e}");
                }
            })
            .ok()
            .map(|bd| {
                let mut dirs = bd.get_config_dirs();
                dirs.push(bd.get_config_home());
                dirs
            })
            .and_then(|paths| {
                paths.into_iter().find_map(|mut path| {
                    path.push("tilepart/scaling_config.json");
                    if !path.is_file() {
                        return None;
                    }
                    let config = read_config(&path)
                        .map_err(|e| {
                            if debug_config {
                                println!("{e}");
                            }
                        })
                        .ok()?;
                    path.pop();
                    config_dir = Some(path);
                    Some(config)
                })
            })
            .inspect(|_| {
                if debug_config {
                    println!("Scaling config successfully read and parsed.");
                }
            })
            .unwrap_or_else(|| {
                if debug_config {
                    println!("Failed to get scaling config, using defaults.");
                }
                ScalingConfig::default()
            });
        runtime.config_dir = config_dir;

        if let Ok(x) = std::env::var("TILEPART_MINIMAL_PARTITION_SIZE") {
            if let Ok(x) = x.parse::<u32>() {
                runtime.config.minimal_partition_size = Some(x);
            }
        }
        if debug_config {
            println!("{:?}", runtime.config);
        }
        runtime
    }

    /// Directory the configuration was read from
    #[must_use]
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    #[must_use]
    pub const fn config(&self) -> &ScalingConfig {
        &self.config
    }

    pub(crate) const fn debug_config(&self) -> bool {
        self.debug % 2 == 1
    }

    pub(crate) const fn debug_select(&self) -> bool {
        (self.debug >> 1) % 2 == 1
    }

    pub(crate) const fn debug_sizes(&self) -> bool {
        (self.debug >> 2) % 2 == 1
    }

    pub(crate) const fn debug_emit(&self) -> bool {
        (self.debug >> 3) % 2 == 1
    }
}

/// Read and parse one configuration file
pub fn read_config(path: &Path) -> Result<ScalingConfig, TilepartError> {
    let file = std::fs::read_to_string(path)?;
    ScalingConfig::from_json(&file)
}

#[test]
fn debug_bits() {
    let runtime = Runtime::new(ScalingConfig::default(), 0b1010);
    assert!(!runtime.debug_config());
    assert!(runtime.debug_select());
    assert!(!runtime.debug_sizes());
    assert!(runtime.debug_emit());
}
