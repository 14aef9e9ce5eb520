pub mod catalog;
pub mod pricing;
pub mod traits;
pub mod types;

pub use catalog::CatalogClient;
pub use pricing::PricingClient;
pub use traits::{CatalogService, PricingService};
