use ipnetwork::IpNetwork;

use bgpattacksim::route_validator::{RouteValidator, ROA};
use bgpattacksim::shared::{ROARouted, ROAValidity, Timestamps, PREFIX, SUBPREFIX, SUPERPREFIX};
use bgpattacksim::simulation_engine::Announcement;

fn net(s: &str) -> IpNetwork {
    s.parse().unwrap()
}

#[test]
fn test_roa_creation() {
    let roa = ROA::new(net("10.0.0.0/8"), 65001, None);
    assert_eq!(roa.max_length, 8);
    assert!(roa.is_routed());

    let non_routed = ROA::new(net("10.0.0.0/8"), 0, Some(24));
    assert_eq!(non_routed.max_length, 24);
    assert!(non_routed.is_non_routed());
}

#[test]
fn test_roa_validity_invalid_both() {
    let roa = ROA::new(net("10.0.0.0/8"), 65001, Some(16));
    assert_eq!(
        roa.get_validity(&net("10.1.1.0/24"), 65002),
        ROAValidity::InvalidLengthAndOrigin
    );
    assert_eq!(
        roa.get_validity(&net("11.0.0.0/8"), 65001),
        ROAValidity::Unknown
    );
}

#[test]
fn test_validator_unknown_without_roas() {
    let validator = RouteValidator::new();
    assert_eq!(
        validator.get_roa_outcome(&net("10.0.0.0/24"), 1),
        (ROAValidity::Unknown, ROARouted::Unknown)
    );
}

#[test]
fn test_validator_prefers_most_favorable_roa() {
    let validator = RouteValidator::from_roas(vec![
        ROA::new(net("10.0.0.0/8"), 1, None),
        ROA::new(net("10.1.0.0/16"), 2, Some(24)),
    ]);

    // Origin 2 is valid through the /16 ROA even though the /8 ROA rejects it
    let outcome = validator.lookup(&net("10.1.2.0/24"), 2);
    assert_eq!(outcome.validity, ROAValidity::Valid);
    assert_eq!(outcome.routed, ROARouted::Routed);
    assert_eq!(outcome.roa_origin, Some(2));
    assert_eq!(outcome.roa_valid_length, Some(true));

    // Outside the /16 only the /8 ROA applies
    let outcome = validator.lookup(&net("10.2.0.0/16"), 2);
    assert_eq!(outcome.validity, ROAValidity::InvalidLengthAndOrigin);
    assert_eq!(outcome.roa_origin, Some(1));
}

#[test]
fn test_validator_non_routed_roa() {
    let validator = RouteValidator::from_roas(vec![ROA::new(*PREFIX, 0, None)]);
    assert_eq!(
        validator.get_roa_outcome(&PREFIX, 666),
        (ROAValidity::InvalidOrigin, ROARouted::NonRouted)
    );
}

#[test]
fn test_validator_cache_cleared_on_add() {
    let mut validator = RouteValidator::new();
    assert_eq!(validator.lookup(&PREFIX, 777).validity, ROAValidity::Unknown);

    validator.add_roa(ROA::new(*PREFIX, 777, None));
    assert_eq!(validator.lookup(&PREFIX, 777).validity, ROAValidity::Valid);
}

#[test]
fn test_well_known_prefixes_nest() {
    assert!(SUPERPREFIX.contains(PREFIX.network()));
    assert!(PREFIX.contains(SUBPREFIX.network()));
    assert!(SUPERPREFIX.prefix() < PREFIX.prefix() && PREFIX.prefix() < SUBPREFIX.prefix());
}

#[test]
fn test_annotate_subprefix_hijack() {
    let validator = RouteValidator::from_roas(vec![ROA::new(*PREFIX, 777, None)]);

    let mut victim = Announcement::new(*PREFIX, vec![777], Timestamps::Victim);
    validator.annotate(&mut victim);
    assert!(victim.valid_by_roa());
    assert!(!victim.invalid_by_roa());
    assert!(victim.roa_routed());

    let mut attacker = Announcement::new(*SUBPREFIX, vec![666], Timestamps::Attacker);
    validator.annotate(&mut attacker);
    assert_eq!(attacker.roa_origin, Some(777));
    assert_eq!(attacker.roa_valid_length, Some(false));
    assert!(attacker.invalid_by_roa());

    let mut uncovered = Announcement::new(net("8.8.8.0/24"), vec![15169], Timestamps::Victim);
    validator.annotate(&mut uncovered);
    assert!(uncovered.unknown_by_roa());
    assert!(!uncovered.invalid_by_roa());
}
