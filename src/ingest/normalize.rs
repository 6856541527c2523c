//! Canonical form for routing tags
//!
//! Many spellings of the same restriction would otherwise each get their
//! own profile id. Only values that change routing survive; the rest is
//! dropped from the profile tags.

use crate::attributes::Tags;
use crate::profiles::{interpret_access, Vehicle};

/// Highway classes kept as-is
const KNOWN_HIGHWAYS: &[&str] = &[
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
    "track",
    "cycleway",
    "path",
];

/// Highway classes that also keep `ramp=yes`
const PEDESTRIAN_HIGHWAYS: &[&str] = &["pedestrian", "footway", "steps"];

/// Write the normalized form of `tags` into `profile_tags`
///
/// Returns false when the tags do not describe a highway at all.
pub fn normalize(tags: &Tags, profile_tags: &mut Tags, vehicles: &[Box<dyn Vehicle>]) -> bool {
    let highway = match tags.get("highway") {
        Some(highway) => highway,
        None => return false,
    };

    normalize_maxspeed(tags, profile_tags);
    normalize_oneway(tags, profile_tags);
    if tags.contains("oneway:bicycle", "no") {
        profile_tags.add("oneway:bicycle", "no");
    }
    if tags.contains("junction", "roundabout") {
        profile_tags.add("junction", "roundabout");
    }

    if KNOWN_HIGHWAYS.iter().any(|h| *h == highway) {
        profile_tags.add("highway", highway);
    } else if PEDESTRIAN_HIGHWAYS.iter().any(|h| *h == highway) {
        if tags.contains("ramp", "yes") {
            profile_tags.add("ramp", "yes");
        }
        profile_tags.add("highway", highway);
    }

    for vehicle in vehicles {
        normalize_access(tags, highway, vehicle.as_ref(), profile_tags);
    }
    true
}

fn normalize_maxspeed(tags: &Tags, profile_tags: &mut Tags) {
    let maxspeed = match tags.get("maxspeed") {
        Some(maxspeed) => maxspeed,
        None => return,
    };
    if let Ok(speed) = maxspeed.parse::<i32>() {
        if (1..=200).contains(&speed) {
            profile_tags.add("maxspeed", maxspeed);
        }
        return;
    }
    if maxspeed.ends_with("mph") {
        // "30 mph": drop the unit and the separator
        let number = maxspeed
            .len()
            .checked_sub(4)
            .and_then(|end| maxspeed.get(..end));
        if let Some(Ok(speed)) = number.map(str::parse::<i32>) {
            if (1..=150).contains(&speed) {
                profile_tags.add("maxspeed", maxspeed);
            }
        }
    }
}

fn normalize_oneway(tags: &Tags, profile_tags: &mut Tags) {
    match tags.get("oneway") {
        Some("yes") | Some("true") | Some("1") => profile_tags.add("oneway", "yes"),
        Some("-1") | Some("reverse") => profile_tags.add("oneway", "-1"),
        // "no" says nothing
        _ => {}
    }
}

/// Emit an access tag only when it overrides what the highway class implies
fn normalize_access(tags: &Tags, highway: &str, vehicle: &dyn Vehicle, profile_tags: &mut Tags) {
    let types = vehicle.vehicle_types();
    let key = match types.last() {
        Some(key) => *key,
        None => return,
    };
    let mut class_only = Tags::with_capacity(1);
    class_only.add("highway", highway);
    let default_access = vehicle.can_traverse(&class_only);

    if let Some(access) = interpret_access(tags, types) {
        if access != default_access {
            profile_tags.add_or_replace(key, if access { "yes" } else { "no" });
        }
    }
}
