//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod card;
pub mod logging;
pub mod migration;
mod user;

pub use card::{CardService, CARD_NOT_FOUND};
pub use logging::{now_ms, Entity, EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService, MigrationSet};
pub use user::{UserService, EMAIL_EXISTS, EMAIL_IN_USE, USER_NOT_FOUND};
