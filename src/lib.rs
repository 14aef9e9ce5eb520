//! Hotel search results engine: merges a slow catalog service and a slow
//! pricing service into one stable, filterable, paginated result set.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod providers;

pub use config::{EngineConfig, ProviderConfig};
pub use engine::{FilterState, PriceRange, RunOutcome, SearchSession, SearchView, SortOrder};
pub use error::{ProviderError, SearchError};
