//! Vehicle definitions used to classify ways during ingest
//!
//! A vehicle decides which ways it can use and which tag keys matter for
//! routing. Cost functions live outside this crate; the builder only needs
//! traversal and tag relevance.

pub mod bike;
pub mod car;
pub mod foot;

use crate::attributes::Tags;

pub use bike::bicycle;
pub use car::car;
pub use foot::pedestrian;

/// What a profile's weight measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMetric {
    TimeInSeconds,
    DistanceInMeters,
    Custom,
}

/// A named cost profile offered by a vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub metric: ProfileMetric,
}

/// Classification interface the network builder works against
pub trait Vehicle: Send + Sync {
    /// Unique lowercase name, e.g. `car`
    fn name(&self) -> &str;

    /// Access keys from generic to specific, e.g. `vehicle`, `motor_vehicle`, `motorcar`
    fn vehicle_types(&self) -> &[&'static str];

    /// Whether the vehicle may use a way with these tags
    fn can_traverse(&self, tags: &Tags) -> bool;

    /// Whether `key` can change cost or access and belongs in profile tags
    fn is_relevant_for_profile(&self, key: &str) -> bool;

    /// Whether `key` is worth keeping at all
    fn is_relevant(&self, key: &str) -> bool;

    /// Cost profiles this vehicle offers
    fn profiles(&self) -> Vec<Profile>;
}

/// Keys every vehicle treats as routing-relevant
const PROFILE_KEYS: &[&str] = &[
    "oneway",
    "highway",
    "motor_vehicle",
    "foot",
    "bicycle",
    "vehicle",
    "access",
    "maxspeed",
    "junction",
];

/// Interpret one access value; `None` when it says nothing
pub fn interpret_access_value(value: &str) -> Option<bool> {
    match value {
        "yes" | "designated" | "permissive" | "public" | "destination" | "delivery"
        | "customers" | "official" => Some(true),
        "no" | "private" | "use_sidepath" => Some(false),
        _ => None,
    }
}

/// Access after applying `access` then each vehicle type; the last
/// decisive key wins
pub fn interpret_access(tags: &Tags, vehicle_types: &[&str]) -> Option<bool> {
    std::iter::once("access")
        .chain(vehicle_types.iter().copied())
        .filter_map(|key| tags.get(key).and_then(interpret_access_value))
        .last()
}

/// Built-in vehicle assembled from plain data and a few strategy functions
pub struct VehicleProfile {
    pub(crate) name: &'static str,
    pub(crate) vehicle_types: &'static [&'static str],
    pub(crate) accessible_highways: &'static [&'static str],
    /// Vehicle-specific verdict for a highway class, checked before the
    /// accessible-highway list
    pub(crate) explicit_access: fn(&Tags, &str) -> Option<bool>,
    /// Extra keys relevant for the profile beyond [`PROFILE_KEYS`]
    pub(crate) extra_profile_key: fn(&str) -> bool,
    /// Extra keys worth keeping as meta data
    pub(crate) extra_relevant_key: fn(&str) -> bool,
    pub(crate) profiles: &'static [(&'static str, ProfileMetric)],
}

impl Vehicle for VehicleProfile {
    fn name(&self) -> &str {
        self.name
    }

    fn vehicle_types(&self) -> &[&'static str] {
        self.vehicle_types
    }

    fn can_traverse(&self, tags: &Tags) -> bool {
        let highway = match tags.get("highway") {
            Some(highway) => highway,
            None => return false,
        };
        if interpret_access(tags, self.vehicle_types) == Some(false) {
            return false;
        }
        if let Some(verdict) = (self.explicit_access)(tags, highway) {
            return verdict;
        }
        self.accessible_highways.iter().any(|h| *h == highway)
    }

    fn is_relevant_for_profile(&self, key: &str) -> bool {
        PROFILE_KEYS.iter().any(|k| *k == key)
            || self.vehicle_types.iter().any(|k| *k == key)
            || (self.extra_profile_key)(key)
    }

    fn is_relevant(&self, key: &str) -> bool {
        self.is_relevant_for_profile(key) || key == "name" || (self.extra_relevant_key)(key)
    }

    fn profiles(&self) -> Vec<Profile> {
        self.profiles
            .iter()
            .map(|(name, metric)| Profile {
                name: name.to_string(),
                metric: *metric,
            })
            .collect()
    }
}

pub(crate) fn no_override(_tags: &Tags, _highway: &str) -> Option<bool> {
    None
}

pub(crate) fn no_extra_key(_key: &str) -> bool {
    false
}

/// Built-in vehicle by name
pub fn by_name(name: &str) -> Option<VehicleProfile> {
    match name {
        "car" => Some(car()),
        "bicycle" | "bike" => Some(bicycle()),
        "pedestrian" | "foot" => Some(pedestrian()),
        _ => None,
    }
}

/// Whether any of the vehicles can use the way
pub fn any_can_traverse(vehicles: &[Box<dyn Vehicle>], tags: &Tags) -> bool {
    vehicles.iter().any(|v| v.can_traverse(tags))
}

/// Whether any of the vehicles considers `key` profile-relevant
pub fn any_relevant_for_profile(vehicles: &[Box<dyn Vehicle>], key: &str) -> bool {
    vehicles.iter().any(|v| v.is_relevant_for_profile(key))
}

/// Whether any of the vehicles considers `key` worth keeping
pub fn any_relevant(vehicles: &[Box<dyn Vehicle>], key: &str) -> bool {
    vehicles.iter().any(|v| v.is_relevant(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_access_hierarchy_last_key_wins() {
        let t = tags(&[("access", "no"), ("vehicle", "yes")]);
        assert_eq!(interpret_access(&t, &["vehicle", "bicycle"]), Some(true));

        let t = tags(&[("access", "yes"), ("bicycle", "no")]);
        assert_eq!(interpret_access(&t, &["vehicle", "bicycle"]), Some(false));

        let t = tags(&[("access", "unknown")]);
        assert_eq!(interpret_access(&t, &["foot"]), None);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("car").map(|v| v.name), Some("car"));
        assert_eq!(by_name("bike").map(|v| v.name), Some("bicycle"));
        assert_eq!(by_name("foot").map(|v| v.name), Some("pedestrian"));
        assert!(by_name("tram").is_none());
    }

    #[test]
    fn test_any_helpers() {
        let vehicles: Vec<Box<dyn Vehicle>> = vec![Box::new(car()), Box::new(pedestrian())];
        assert!(any_can_traverse(&vehicles, &tags(&[("highway", "footway")])));
        assert!(any_can_traverse(&vehicles, &tags(&[("highway", "motorway")])));
        assert!(!any_can_traverse(&vehicles, &tags(&[("building", "yes")])));

        assert!(any_relevant_for_profile(&vehicles, "motorcar"));
        assert!(!any_relevant_for_profile(&vehicles, "name"));
        assert!(any_relevant(&vehicles, "name"));
        assert!(!any_relevant(&vehicles, "source"));
    }
}
