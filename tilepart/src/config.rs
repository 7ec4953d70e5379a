use nanoserde::DeJson;
use tilepart_compiler::SelectorPolicy;
use tilepart_core::error::TilepartError;

/// Implicit scaling configuration, read from `tilepart/scaling_config.json`.
///
/// Every knob is optional, missing knobs use the built in default.
#[derive(DeJson, Debug, Default, Clone, PartialEq, Eq)]
pub struct ScalingConfig {
    /// Partition walkers at all
    pub enable_walker_partition: Option<bool>,
    /// Use static instead of dynamic partitioning
    pub enable_static_partitioning: Option<bool>,
    pub synchronize_before_execution: Option<bool>,
    pub cross_tile_atomic_synchronization: Option<bool>,
    pub semaphore_programming_required: Option<bool>,
    pub pipe_control_after_walker: Option<bool>,
    /// Replaces self-cleanup requested by the dispatch
    pub self_cleanup: Option<bool>,
    pub use_atomics_for_self_cleanup: Option<bool>,
    pub initialize_wparid_register: Option<bool>,
    /// Minimal thread groups per dynamic partition, 0 disables the floor
    pub minimal_partition_size: Option<u32>,
    pub prefer_highest_dimension: Option<bool>,
    /// Walker partition type code, 1 is X, 2 is Y, 3 is Z
    pub partition_type: Option<u32>,
    pub do_not_flush_caches: Option<bool>,
}

impl ScalingConfig {
    /// Parse configuration from json
    #[track_caller]
    pub fn from_json(json: &str) -> Result<ScalingConfig, TilepartError> {
        ScalingConfig::deserialize_json(json)
            .map_err(|e| TilepartError::config_error(format!("failed to parse scaling config, {e}")))
    }

    pub fn enable_walker_partition(&self) -> bool {
        self.enable_walker_partition.unwrap_or(true)
    }

    /// Static partitioning for a dispatch that asked for `prefer_static`
    pub fn static_partitioning(&self, prefer_static: bool) -> bool {
        self.enable_static_partitioning.unwrap_or(prefer_static)
    }

    pub fn synchronize_before_execution(&self) -> bool {
        self.synchronize_before_execution.unwrap_or(false)
    }

    pub fn cross_tile_atomic_synchronization(&self) -> bool {
        self.cross_tile_atomic_synchronization.unwrap_or(true)
    }

    pub fn semaphore_programming_required(&self) -> bool {
        self.semaphore_programming_required.unwrap_or(false)
    }

    pub fn pipe_control_after_walker(&self) -> bool {
        self.pipe_control_after_walker.unwrap_or(true)
    }

    /// Self-cleanup for a dispatch that asked for `requested`
    pub fn self_cleanup(&self, requested: bool) -> bool {
        self.self_cleanup.unwrap_or(requested)
    }

    pub fn use_atomics_for_self_cleanup(&self) -> bool {
        self.use_atomics_for_self_cleanup.unwrap_or(false)
    }

    pub fn initialize_wparid_register(&self) -> bool {
        self.initialize_wparid_register.unwrap_or(true)
    }

    pub fn do_not_flush_caches(&self) -> bool {
        self.do_not_flush_caches.unwrap_or(false)
    }

    /// Selection policy with configured overrides
    pub fn selector_policy(&self) -> SelectorPolicy {
        let default = SelectorPolicy::default();
        SelectorPolicy {
            minimal_partition_size: self.minimal_partition_size.unwrap_or(default.minimal_partition_size),
            prefer_highest_dimension: self.prefer_highest_dimension,
            partition_type: self.partition_type,
        }
    }
}

#[test]
fn missing_knobs_use_defaults() {
    let config = ScalingConfig::from_json(r#"{"minimal_partition_size": 0, "self_cleanup": false}"#).unwrap();
    assert!(config.enable_walker_partition());
    assert!(config.cross_tile_atomic_synchronization());
    assert!(!config.self_cleanup(true));
    assert!(config.static_partitioning(true));
    assert!(!config.static_partitioning(false));
    let forced = ScalingConfig::from_json(r#"{"enable_static_partitioning": false}"#).unwrap();
    assert!(!forced.static_partitioning(true));
    assert_eq!(config.selector_policy().minimal_partition_size, 0);
    assert_eq!(ScalingConfig::default().selector_policy(), SelectorPolicy::default());
    assert!(matches!(ScalingConfig::from_json("{"), Err(TilepartError::Config(_))));
}
