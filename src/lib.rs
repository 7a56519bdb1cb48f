pub mod executor;
pub mod fetch;
pub mod harvest;
pub mod model;
pub mod notice;
pub mod report;
pub mod search;
pub mod settings;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use notice::Notifier;
pub use traits::*;
