use core::time::Duration;

use crate::SpinStrategy;

/// Construction-time settings for a [`Generator`](crate::Generator).
///
/// The custom epoch is deliberately absent: it is a build-time constant.
///
/// With the `serde` feature this deserializes from any serde format; every
/// key is optional.
///
/// ```
/// use flakegen::{GeneratorConfig, SpinStrategy};
///
/// let config = GeneratorConfig::default().with_node_id(12);
/// assert_eq!(config.node_id, Some(12));
/// assert_eq!(config.spin, SpinStrategy::Yield);
/// assert_eq!(config.overflow_timeout(), None);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Explicit node id. When `None` the id is derived from the host's
    /// network interfaces.
    pub node_id: Option<i64>,

    /// Polling behaviour while waiting out an exhausted sequence.
    pub spin: SpinStrategy,

    /// Upper bound on the overflow wait, in milliseconds.
    pub overflow_timeout_ms: Option<u64>,
}

impl GeneratorConfig {
    pub fn with_node_id(mut self, node_id: i64) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn with_spin(mut self, spin: SpinStrategy) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_overflow_timeout_ms(mut self, millis: u64) -> Self {
        self.overflow_timeout_ms = Some(millis);
        self
    }

    /// The overflow timeout as a [`Duration`].
    pub fn overflow_timeout(&self) -> Option<Duration> {
        self.overflow_timeout_ms.map(Duration::from_millis)
    }
}
