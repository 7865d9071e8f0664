mod fixtures;
pub use fixtures::*;

pub use kernelcount::config::{Config, CounterConfig};
pub use kernelcount::{CountMethod, KernelPipeline};

/// Config with a small mean-shift window so debug-build tests stay fast.
pub fn fast_config() -> Config {
    Config {
        counter: CounterConfig {
            spatial_radius: 4,
            ..CounterConfig::default()
        },
        ..Config::default()
    }
}

pub fn fast_pipeline(method: CountMethod) -> KernelPipeline {
    KernelPipeline::from_config(&fast_config(), method)
}
