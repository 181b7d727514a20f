pub mod cache;
pub mod dashboard;
pub mod snapshot;

pub use cache::CacheEntry;
pub use dashboard::Dashboard;
pub use snapshot::Snapshot;
