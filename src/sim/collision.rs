//! Collision detection: quadtree broad-phase, AABB narrow-phase
//!
//! Every collision group gets its own quadtree, rebuilt each tick. A
//! cross-group query only walks the opposing group's tree, so pairs nobody
//! cares about (shot vs shot) are never even generated.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use glam::Vec2;

use super::aabb::BoundingBox;
use super::quadtree::Quadtree;
use crate::config::QuadtreeConfig;
use crate::error::{CollisionError, ConfigError};

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the boxes overlap
    pub hit: bool,
    /// Penetration on each axis (if hit), for push-back
    pub overlap: Option<Vec2>,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            overlap: None,
        }
    }
}

/// Exact AABB overlap test.
///
/// Touching edges and zero-sized boxes never count as overlapping.
pub fn check_collision(a: &BoundingBox, b: &BoundingBox) -> CollisionResult {
    if !a.intersects(b) {
        return CollisionResult::miss();
    }
    let overlap = Vec2::new(
        (a.right() - b.x).min(b.right() - a.x),
        (a.bottom() - b.y).min(b.bottom() - a.y),
    );
    CollisionResult {
        hit: true,
        overlap: Some(overlap),
    }
}

/// A narrow-phase confirmed pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact<T> {
    pub a: T,
    pub b: T,
    pub overlap: Vec2,
}

/// Group-aware broad-phase over ids of type `T`, grouped by keys of type `G`
#[derive(Debug, Clone)]
pub struct CollisionSystem<G, T> {
    template: Quadtree<T>,
    trees: HashMap<G, Quadtree<T>>,
    /// Group membership, kept across ticks until `forget`
    groups: HashMap<T, G>,
    /// This tick's insertions per group, in insertion order
    members: HashMap<G, Vec<(T, BoundingBox)>>,
    boxes: HashMap<T, BoundingBox>,
}

impl<G, T> CollisionSystem<G, T>
where
    G: Copy + Eq + Hash + Debug,
    T: Copy + Eq + Hash + Debug,
{
    pub fn new(bounds: BoundingBox, config: QuadtreeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            template: Quadtree::new(bounds, config)?,
            trees: HashMap::new(),
            groups: HashMap::new(),
            members: HashMap::new(),
            boxes: HashMap::new(),
        })
    }

    pub fn bounds(&self) -> &BoundingBox {
        self.template.bounds()
    }

    /// Tag `id` as a member of `group`
    pub fn assign(&mut self, id: T, group: G) {
        self.groups.insert(id, group);
        self.trees
            .entry(group)
            .or_insert_with(|| self.template.clone());
    }

    pub fn group_of(&self, id: T) -> Option<G> {
        self.groups.get(&id).copied()
    }

    /// Drop a destroyed entity's membership. Returns false if it had none.
    pub fn forget(&mut self, id: T) -> bool {
        self.boxes.remove(&id);
        self.groups.remove(&id).is_some()
    }

    /// Empty every group's tree ahead of this tick's re-insertion
    pub fn clear(&mut self) {
        for tree in self.trees.values_mut() {
            tree.clear();
        }
        for members in self.members.values_mut() {
            members.clear();
        }
        self.boxes.clear();
    }

    /// Index `id` in its group's tree for this tick
    pub fn insert(&mut self, id: T, bounds: BoundingBox) -> Result<(), CollisionError> {
        let group = self
            .groups
            .get(&id)
            .copied()
            .ok_or_else(|| CollisionError::Unassigned(format!("{id:?}")))?;
        let tree = self
            .trees
            .entry(group)
            .or_insert_with(|| self.template.clone());
        tree.insert(bounds, id)?;
        self.members.entry(group).or_default().push((id, bounds));
        self.boxes.insert(id, bounds);
        Ok(())
    }

    /// Broad-phase candidates from one group (may contain duplicates)
    pub fn query_group(&self, bounds: &BoundingBox, group: G) -> Result<Vec<T>, CollisionError> {
        match self.trees.get(&group) {
            Some(tree) => Ok(tree.retrieve(bounds)?),
            None => {
                bounds.validate()?;
                Ok(Vec::new())
            }
        }
    }

    /// Confirmed contacts between members of `a` and members of `b`.
    ///
    /// Each pair appears once, ordered by `a`'s insertion order. Passing the
    /// same group twice is the same as `collide_within`.
    pub fn collide_groups(&self, a: G, b: G) -> Result<Vec<Contact<T>>, CollisionError> {
        if a == b {
            return self.collide_within(a);
        }
        self.collect_contacts(a, b, |_, _| true)
    }

    /// Confirmed contacts inside one group, each unordered pair once
    pub fn collide_within(&self, group: G) -> Result<Vec<Contact<T>>, CollisionError> {
        let order: HashMap<T, usize> = self
            .members(group)
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();
        self.collect_contacts(group, group, |a, b| order[&a] < order[&b])
    }

    fn collect_contacts(
        &self,
        a: G,
        b: G,
        keep: impl Fn(T, T) -> bool,
    ) -> Result<Vec<Contact<T>>, CollisionError> {
        let mut contacts = Vec::new();
        let mut seen = HashSet::new();

        for (id_a, box_a) in self.members(a) {
            seen.clear();
            for id_b in self.query_group(box_a, b)? {
                if id_b == *id_a || !seen.insert(id_b) || !keep(*id_a, id_b) {
                    continue;
                }
                let Some(box_b) = self.boxes.get(&id_b) else {
                    continue;
                };
                if let Some(overlap) = check_collision(box_a, box_b).overlap {
                    contacts.push(Contact {
                        a: *id_a,
                        b: id_b,
                        overlap,
                    });
                }
            }
        }

        Ok(contacts)
    }

    /// Entries inserted into `group` this tick
    pub fn members(&self, group: G) -> &[(T, BoundingBox)] {
        self.members.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The group's tree, for debug overlays
    pub fn tree(&self, group: G) -> Option<&Quadtree<T>> {
        self.trees.get(&group)
    }
}
