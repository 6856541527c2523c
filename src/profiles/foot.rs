//! Pedestrian

use super::{no_extra_key, ProfileMetric, VehicleProfile};
use crate::attributes::Tags;

const ACCESSIBLE_HIGHWAYS: &[&str] = &[
    "service",
    "services",
    "steps",
    "footway",
    "cycleway",
    "path",
    "road",
    "track",
    "pedestrian",
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
    ("pedestrian", ProfileMetric::TimeInSeconds),
    ("pedestrian.shortest", ProfileMetric::DistanceInMeters),
];

fn foot_access(tags: &Tags, _highway: &str) -> Option<bool> {
    match tags.get("foot") {
        Some("designated") | Some("yes") => Some(true),
        Some("no") => Some(false),
        _ => None,
    }
}

pub fn pedestrian() -> VehicleProfile {
    VehicleProfile {
        name: "pedestrian",
        vehicle_types: &["foot"],
        accessible_highways: ACCESSIBLE_HIGHWAYS,
        explicit_access: foot_access,
        extra_profile_key: no_extra_key,
        extra_relevant_key: no_extra_key,
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
    fn test_pedestrian_access() {
        let foot = pedestrian();
        assert!(foot.can_traverse(&tags(&[("highway", "footway")])));
        assert!(foot.can_traverse(&tags(&[("highway", "steps")])));
        assert!(!foot.can_traverse(&tags(&[("highway", "motorway")])));
        assert!(foot.can_traverse(&tags(&[("highway", "trunk"), ("foot", "yes")])));
        assert!(!foot.can_traverse(&tags(&[("highway", "residential"), ("foot", "no")])));
        assert!(!foot.can_traverse(&tags(&[("highway", "path"), ("access", "private")])));
    }
}
