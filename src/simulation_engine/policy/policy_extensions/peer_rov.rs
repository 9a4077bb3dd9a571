use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, ValidationContext};

/// ROV applied only to routes learned from peers
#[derive(Debug, Clone)]
pub struct PeerROVPolicy;

impl PolicyExtension for PeerROVPolicy {
    fn name(&self) -> &'static str {
        "PeerROV"
    }

    fn validate_announcement(&self, ann: &Announcement, _ctx: &ValidationContext) -> bool {
        !(ann.recv_relationship == Relationships::Peers && ann.invalid_by_roa())
    }
}
