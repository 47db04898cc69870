//! # GeoSync Spatial
//!
//! Spatial lookups that connect map features and table rows:
//!
//! - [`nearest`]: closest Point feature to a clicked coordinate, under a
//!   distance tolerance
//! - [`coords`]: ordered coordinate parsers over row fields
//! - [`correlate`]: table row → marker, coordinate, or source feature
//! - [`strategy`]: per-category label fields, compound keys, and centering
//!
//! Lookups never fail: a miss is `None` and callers treat it as "nothing to
//! highlight".

pub mod coords;
pub mod correlate;
pub mod nearest;
pub mod strategy;

pub use correlate::{CorrelationContext, Correlator, MarkerInfo, Resolution};
pub use nearest::{find_nearest, NearestHit, DEFAULT_TOLERANCE_M};
pub use strategy::{CategoryStrategy, StrategyTable};
