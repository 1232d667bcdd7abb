//! Data acquisition, cleaning, and alignment.

pub mod align;
pub mod files;
pub mod french;
pub mod provider;
pub mod returns;
pub mod snapshot;
pub mod yahoo;

pub use align::{build_sample, excess_return, join_series, JoinedRow};
pub use files::{CsvPriceFile, FactorFile};
pub use french::{extract_csv, parse_factor_table, FrenchLibrary, ANNUAL_MARKER, FF5_URL};
pub use provider::{DataError, FactorSource, PriceSource};
pub use returns::{compute_returns, period_returns};
pub use snapshot::{SnapshotMeta, SnapshotStore};
pub use yahoo::YahooProvider;
