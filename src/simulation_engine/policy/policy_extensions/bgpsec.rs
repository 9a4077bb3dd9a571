use std::cmp::Ordering;

use crate::as_graphs::as_graph::ASN;
use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, ValidationContext};

/// BGPsec as a preference: fully signed paths win, nothing is rejected.
///
/// A signature chain survives only while every AS on the path runs BGPsec.
/// Any other AS leaves the signed path behind, and it stops matching.
#[derive(Debug, Clone)]
pub struct BGPSecPolicy;

impl PolicyExtension for BGPSecPolicy {
    fn name(&self) -> &'static str {
        "BGPSec"
    }

    fn compare_security(
        &self,
        ann1: &Announcement,
        ann2: &Announcement,
        ctx: &ValidationContext,
    ) -> Ordering {
        let asn = ctx.as_obj.asn;
        // true sorts after false, so compare the other way around
        ann2.bgpsec_valid(asn).cmp(&ann1.bgpsec_valid(asn))
    }

    fn process_announcement(
        &self,
        unprocessed: &Announcement,
        processed: &mut Announcement,
        ctx: &ValidationContext,
    ) {
        let signed = unprocessed.recv_relationship == Relationships::Origin
            || unprocessed.bgpsec_valid(ctx.as_obj.asn);
        processed.bgpsec_as_path = if signed {
            Some(processed.as_path.clone())
        } else {
            None
        };
    }

    fn prepare_to_send(&self, ann: &mut Announcement, _sender: ASN, neighbor: ASN) {
        ann.bgpsec_next_asn = Some(neighbor);
    }
}
