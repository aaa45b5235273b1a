pub mod client;
pub mod traits;
pub mod types;

pub use client::{IdealistaConnector, DEFAULT_BASE_URL};
pub use traits::{ApiConnector, ListingApi};
pub use types::SearchConfig;
