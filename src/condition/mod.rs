/// Water condition resolution.
///
/// Submodules:
/// - `classifier` - reading + thresholds → condition code (pure)
/// - `gauge`      - governing gauge selection by river-mile
/// - `cached`     - segment-aware lookup over the reading cache
/// - `resolver`   - the cached → live → primary fallback ladder

pub mod cached;
pub mod classifier;
pub mod gauge;
pub mod resolver;

pub use classifier::classify;
pub use gauge::{select_gauge, GaugeResolver, GaugeSelection, SelectionBasis};
pub use resolver::{ConditionResolver, ConditionSource, ResolvedCondition};
