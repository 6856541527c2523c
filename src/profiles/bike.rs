//! Bicycle

use super::{ProfileMetric, VehicleProfile};
use crate::attributes::Tags;

const ACCESSIBLE_HIGHWAYS: &[&str] = &[
    "steps", // only with a ramp, see `bicycle_access`
    "service",
    "cycleway",
    "path",
    "road",
    "track",
    "living_street",
    "residential",
    "unclassified",
    "secondary",
    "secondary_link",
    "primary",
    "primary_link",
    "tertiary",
    "tertiary_link",
];

const PROFILES: &[(&str, ProfileMetric)] = &[
    ("bicycle", ProfileMetric::TimeInSeconds),
    ("bicycle.shortest", ProfileMetric::DistanceInMeters),
    ("bicycle.balanced", ProfileMetric::Custom),
    ("bicycle.networks", ProfileMetric::Custom),
];

fn bicycle_access(tags: &Tags, highway: &str) -> Option<bool> {
    match tags.get("bicycle") {
        Some("designated") | Some("yes") => return Some(true),
        Some("no") => return Some(false),
        _ => {}
    }
    if highway == "steps" {
        return Some(tags.contains("ramp", "yes"));
    }
    None
}

fn bicycle_profile_key(key: &str) -> bool {
    key.starts_with("cyclenetwork") || key == "ramp" || key == "oneway:bicycle"
}

fn cycle_network_key(key: &str) -> bool {
    key.starts_with("cyclenetwork")
}

pub fn bicycle() -> VehicleProfile {
    VehicleProfile {
        name: "bicycle",
        vehicle_types: &["vehicle", "bicycle"],
        accessible_highways: ACCESSIBLE_HIGHWAYS,
        explicit_access: bicycle_access,
        extra_profile_key: bicycle_profile_key,
        extra_relevant_key: cycle_network_key,
        profiles: PROFILES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::Vehicle;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_bicycle_access() {
        let bike = bicycle();
        assert!(bike.can_traverse(&tags(&[("highway", "cycleway")])));
        assert!(!bike.can_traverse(&tags(&[("highway", "motorway")])));
        assert!(bike.can_traverse(&tags(&[("highway", "footway"), ("bicycle", "designated")])));
        assert!(!bike.can_traverse(&tags(&[("highway", "residential"), ("bicycle", "no")])));
        assert!(!bike.can_traverse(&tags(&[("highway", "primary"), ("vehicle", "no")])));
    }

    #[test]
    fn test_steps_need_a_ramp() {
        let bike = bicycle();
        assert!(!bike.can_traverse(&tags(&[("highway", "steps")])));
        assert!(bike.can_traverse(&tags(&[("highway", "steps"), ("ramp", "yes")])));
    }

    #[test]
    fn test_cycle_network_keys() {
        let bike = bicycle();
        assert!(bike.is_relevant_for_profile("cyclenetwork"));
        assert!(bike.is_relevant_for_profile("ramp"));
        assert!(bike.is_relevant("cyclenetwork:name"));
        assert!(!bike.is_relevant_for_profile("surface"));
    }
}
