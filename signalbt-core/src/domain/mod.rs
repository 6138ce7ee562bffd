//! Domain types for signalbt

pub mod bar;
pub mod ids;
pub mod portfolio;
pub mod trade;

pub use bar::{SeriesError, SignalBar, SignalSeries};
pub use ids::{DatasetHash, RunId};
pub use portfolio::{PortfolioRecord, PortfolioState, StateError};
pub use trade::{OpenLeg, TradeRecord};
