pub mod cache;
pub mod filters;
pub mod hydrate;
pub mod paginate;
pub mod prefetch;
pub mod reconcile;
pub mod run;
pub mod session;

pub use cache::HotelInfoCache;
pub use filters::{FilterState, PriceRange, SortOrder};
pub use paginate::Paginator;
pub use run::{RunId, RunPhase, SearchRunController};
pub use session::{RunOutcome, SearchSession, SearchView};
