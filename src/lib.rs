pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BoxError, CacheError, StoreError};
pub use models::{CacheEntry, Dashboard, Snapshot};
pub use services::{AggregateCache, CacheStats, DashboardService};
pub use store::{FileStore, MemoryStore, Store};
