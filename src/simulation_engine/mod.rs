pub mod announcement;
pub mod engine;
pub mod policy;
pub mod ribs;

pub use announcement::{Announcement, Prefix};
pub use engine::SimulationEngine;
pub use policy::{Decision, PolicyAssignment, PolicyKind, Settings, ValidationContext};
pub use ribs::{AnnInfo, RIBStore, RIBStoreArena};
