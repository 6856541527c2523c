//! Hooks that run alongside the network builder's two passes
//!
//! Processors see every entity in both passes. The typical pattern is to
//! collect relation membership in the first pass and enrich member ways in
//! the second, before the builder classifies their tags.

use rustc_hash::FxHashSet;

use super::source::{MemberType, Node, Relation, Way};
use crate::attributes::Tags;

pub trait TwoPassProcessor {
    /// Identifies the processor so the builder does not register it twice
    fn name(&self) -> &str;

    fn first_pass_node(&mut self, _node: &Node) {}

    fn first_pass_way(&mut self, _way: &Way) {}

    fn first_pass_relation(&mut self, _relation: &Relation) {}

    fn second_pass_node(&mut self, _node: &Node) {}

    /// May attach tags; the builder sees the modified way
    fn second_pass_way(&mut self, _way: &mut Way) {}

    fn second_pass_relation(&mut self, _relation: &Relation) {}

    /// Runs after profile tags are normalized, so tags the normalizer does
    /// not know about can be carried over from `original`
    fn after_way_tags_normalize(&self, _normalized: &mut Tags, _original: &Tags) {}
}

/// Marks ways that belong to a bicycle route relation with `cyclenetwork=yes`
#[derive(Debug, Default)]
pub struct CycleNetworkProcessor {
    member_ways: FxHashSet<i64>,
}

impl CycleNetworkProcessor {
    pub const NAME: &'static str = "cyclenetwork";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct ways found in cycle routes
    pub fn member_count(&self) -> usize {
        self.member_ways.len()
    }

    fn is_cycle_route(relation: &Relation) -> bool {
        relation.tags.contains("type", "route") && relation.tags.contains("route", "bicycle")
    }
}

impl TwoPassProcessor for CycleNetworkProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn first_pass_relation(&mut self, relation: &Relation) {
        if !Self::is_cycle_route(relation) {
            return;
        }
        self.member_ways.extend(
            relation
                .members
                .iter()
                .filter(|m| m.member_type == MemberType::Way)
                .map(|m| m.id),
        );
    }

    fn second_pass_way(&mut self, way: &mut Way) {
        if self.member_ways.contains(&way.id) {
            way.tags.add_or_replace("cyclenetwork", "yes");
        }
    }

    fn after_way_tags_normalize(&self, normalized: &mut Tags, original: &Tags) {
        if original.contains("cyclenetwork", "yes") {
            normalized.add_or_replace("cyclenetwork", "yes");
        }
    }
}
