use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, ValidationContext};

/// Route Origin Validation: drops anything a ROA marks invalid
#[derive(Debug, Clone)]
pub struct ROVPolicy;

impl PolicyExtension for ROVPolicy {
    fn name(&self) -> &'static str {
        "ROV"
    }

    fn validate_announcement(&self, ann: &Announcement, _ctx: &ValidationContext) -> bool {
        !ann.invalid_by_roa()
    }
}
