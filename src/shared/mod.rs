pub mod calendar;
pub mod config;
pub mod conversations;
pub mod format;
pub mod leads;
pub mod loader;
pub mod models;
pub mod onboarding;
pub mod stats;
pub mod transcript;

pub use calendar::*;
pub use conversations::*;
pub use leads::*;
pub use models::*;
pub use transcript::*;
