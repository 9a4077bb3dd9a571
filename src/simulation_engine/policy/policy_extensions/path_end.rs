use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, Settings, ValidationContext};

/// Path-End: an origin that publishes its neighbors can only be reached
/// through one of them.
#[derive(Debug, Clone)]
pub struct PathEndPolicy;

impl PolicyExtension for PathEndPolicy {
    fn name(&self) -> &'static str {
        "PathEnd"
    }

    fn validate_announcement(&self, ann: &Announcement, ctx: &ValidationContext) -> bool {
        let path = &ann.as_path;
        let origin = match path.last() {
            Some(&origin) => origin,
            None => return true,
        };
        if !ctx.policies.policy_for(origin).adopts(Settings::PathEnd) {
            return true;
        }
        let origin_as = match ctx.as_graph.get(&origin) {
            Some(origin_as) => origin_as,
            // Unknown origins have no record to check against
            None => return true,
        };
        path.len() < 2 || origin_as.is_neighbor(path[path.len() - 2])
    }
}
