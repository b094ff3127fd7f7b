//! Quadtree spatial index for the collision broad-phase
//!
//! The tree is rebuilt from scratch every tick: `clear()` then one `insert`
//! per active entity. Nothing is ever removed or moved incrementally.
//!
//! Once a node has split, new items are routed to *every* child they overlap,
//! so an item straddling a quadrant line is stored more than once and can come
//! back more than once from `retrieve`. Items that straddle a line at split
//! time stay on the splitting node instead.

use crate::config::QuadtreeConfig;
use crate::error::{ConfigError, ValidationError};

use super::aabb::BoundingBox;

/// A node of the tree: a leaf holding items, or a node with four children
#[derive(Debug, Clone)]
pub struct QuadNode<T> {
    boundary: BoundingBox,
    depth: u32,
    items: Vec<(BoundingBox, T)>,
    /// Children ordered top-right, top-left, bottom-left, bottom-right
    children: Option<Box<[QuadNode<T>; 4]>>,
}

impl<T: Copy> QuadNode<T> {
    fn new(boundary: BoundingBox, depth: u32) -> Self {
        Self {
            boundary,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    pub fn boundary(&self) -> &BoundingBox {
        &self.boundary
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Items stored directly on this node
    pub fn items(&self) -> &[(BoundingBox, T)] {
        &self.items
    }

    pub fn children(&self) -> Option<&[QuadNode<T>; 4]> {
        self.children.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn can_split(&self, config: &QuadtreeConfig) -> bool {
        self.depth < config.max_levels
            && self.boundary.width / 2.0 >= config.min_node_size
            && self.boundary.height / 2.0 >= config.min_node_size
    }

    fn insert(&mut self, bounds: BoundingBox, item: T, config: &QuadtreeConfig) {
        if let Some(children) = &mut self.children {
            let mut routed = false;
            for child in children.iter_mut() {
                if child.boundary.intersects(&bounds) {
                    child.insert(bounds, item, config);
                    routed = true;
                }
            }
            // Overlaps this node but no child: keep it here rather than drop it
            if !routed {
                self.items.push((bounds, item));
            }
            return;
        }

        self.items.push((bounds, item));

        if self.items.len() > config.max_objects && self.can_split(config) {
            self.split(config);
        }
    }

    fn split(&mut self, config: &QuadtreeConfig) {
        let depth = self.depth + 1;
        let mut children = Box::new(
            self.boundary
                .quadrants()
                .map(|quadrant| QuadNode::new(quadrant, depth)),
        );

        for (bounds, item) in std::mem::take(&mut self.items) {
            match children
                .iter_mut()
                .find(|child| child.boundary.contains(&bounds))
            {
                Some(child) => child.insert(bounds, item, config),
                None => self.items.push((bounds, item)),
            }
        }

        self.children = Some(children);
    }

    fn retrieve_into(&self, query: &BoundingBox, out: &mut Vec<T>) {
        out.extend(self.items.iter().map(|(_, item)| *item));
        if let Some(children) = &self.children {
            for child in children.iter() {
                // Inclusive, so a query on a child's edge still reaches it
                if child.boundary.touches(query) {
                    child.retrieve_into(query, out);
                }
            }
        }
    }

    fn collect_stats(&self, stats: &mut QuadtreeStats) {
        stats.nodes += 1;
        stats.entries += self.items.len();
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.children {
            Some(children) => children.iter().for_each(|c| c.collect_stats(stats)),
            None => stats.leaves += 1,
        }
    }
}

/// Shape of the tree, mostly useful for tests and debug overlays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadtreeStats {
    pub nodes: usize,
    pub leaves: usize,
    /// Stored entries, counting duplicated straddlers once per node
    pub entries: usize,
    pub max_depth: u32,
}

/// Region quadtree over bounding boxes tagged with an id of type `T`
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    root: QuadNode<T>,
    config: QuadtreeConfig,
}

impl<T: Copy> Quadtree<T> {
    /// Create an empty tree covering `boundary`
    pub fn new(boundary: BoundingBox, config: QuadtreeConfig) -> Result<Self, ConfigError> {
        boundary.validate()?;
        config.validate()?;
        Ok(Self {
            root: QuadNode::new(boundary, 0),
            config,
        })
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.root.boundary
    }

    pub fn config(&self) -> &QuadtreeConfig {
        &self.config
    }

    pub fn root(&self) -> &QuadNode<T> {
        &self.root
    }

    /// Insert `item` with its bounding box
    pub fn insert(&mut self, bounds: BoundingBox, item: T) -> Result<(), ValidationError> {
        bounds.validate()?;
        if !self.root.boundary.intersects(&bounds) {
            return Err(ValidationError::OutOfBounds {
                x: bounds.x,
                y: bounds.y,
            });
        }
        self.root.insert(bounds, item, &self.config);
        Ok(())
    }

    /// Every item stored in a node whose region overlaps or touches `query`.
    ///
    /// This is a candidate list: it can contain items that do not overlap
    /// `query`, and the same item more than once.
    pub fn retrieve(&self, query: &BoundingBox) -> Result<Vec<T>, ValidationError> {
        query.validate()?;
        let mut out = Vec::new();
        if self.root.boundary.intersects(query) {
            self.root.retrieve_into(query, &mut out);
        }
        Ok(out)
    }

    /// Reset to a single empty leaf
    pub fn clear(&mut self) {
        self.root.items.clear();
        self.root.children = None;
    }

    /// Number of stored entries (straddlers count once per node holding them)
    pub fn len(&self) -> usize {
        self.stats().entries
    }

    pub fn is_empty(&self) -> bool {
        self.root.items.is_empty() && self.root.children.is_none()
    }

    pub fn stats(&self) -> QuadtreeStats {
        let mut stats = QuadtreeStats::default();
        self.root.collect_stats(&mut stats);
        stats
    }
}
