//! Car: motor vehicle on the public road network

use super::{no_extra_key, no_override, ProfileMetric, VehicleProfile};

const ACCESSIBLE_HIGHWAYS: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "road",
    "service",
    "services",
    "living_street",
];

const PROFILES: &[(&str, ProfileMetric)] = &[
    ("car", ProfileMetric::TimeInSeconds),
    ("car.shortest", ProfileMetric::DistanceInMeters),
    ("car.classifications", ProfileMetric::Custom),
];

pub fn car() -> VehicleProfile {
    VehicleProfile {
        name: "car",
        vehicle_types: &["vehicle", "motor_vehicle", "motorcar"],
        accessible_highways: ACCESSIBLE_HIGHWAYS,
        explicit_access: no_override,
        extra_profile_key: no_extra_key,
        extra_relevant_key: no_extra_key,
        profiles: PROFILES,
    }
}
