use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, ValidationContext};

/// Plain BGP: loop prevention and sanity checks every variant starts with
#[derive(Debug, Clone)]
pub struct BGPPolicy;

impl PolicyExtension for BGPPolicy {
    fn name(&self) -> &'static str {
        "BGP"
    }

    fn validate_announcement(&self, ann: &Announcement, ctx: &ValidationContext) -> bool {
        // Empty paths never reach here from the wire; seeds are not validated
        if ann.as_path.is_empty() {
            return false;
        }

        if ann.as_path.contains(&ctx.as_obj.asn) {
            return false;
        }

        ann.as_path.first() == Some(&ann.next_hop_asn)
    }
}
