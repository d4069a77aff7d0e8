pub mod bonuses;
pub mod bus;
pub mod cache;
pub mod conflicts;
pub mod debounce;
pub mod history;
pub mod simulator;
pub mod stats;
pub mod status;
pub mod store;
pub mod types;
pub mod validate;

pub use conflicts::detect_conflicts;
pub use stats::StatsSnapshot;
pub use store::PlannerState;
pub use types::{Faction, Favorite, Planning, Priority, Settings, StructureStatus};
