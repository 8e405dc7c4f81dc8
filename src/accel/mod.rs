use std::ops::Range;

use crate::geometry::{Aabb, Vec3};
use crate::ray::Ray;

/// Below this element count a subtree becomes a single leaf.
const LEAF_THRESHOLD: usize = 10;

/// Node bounds are widened by this amount so zero-thickness geometry
/// (axis-aligned quads and the like) cannot slip through the slab test.
const BOUNDS_EPSILON: f32 = 1e-6;

#[derive(Debug)]
enum BvhNode {
    Leaf {
        bounds: Aabb,
        /// Range into `Bvh::elements`.
        elems: Range<u32>,
    },
    Internal {
        bounds: Aabb,
        left: u32,
        right: u32,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } => bounds,
            BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Binary bounding-volume hierarchy over an indexed element set, stored as
/// an index arena. Built once, immutable afterwards. The hierarchy knows
/// nothing about the elements beyond their bounds; exact intersection is
/// delegated to a per-element callback during traversal.
#[derive(Debug)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    elements: Vec<u32>,
    root: u32,
}

impl Bvh {
    /// Top-down build: round-robin split axis by depth, element indices
    /// sorted by centroid along that axis, split at the median.
    pub fn build(bounds: &[Aabb], centroids: &[Vec3]) -> Bvh {
        assert_eq!(bounds.len(), centroids.len());

        let mut indices: Vec<u32> = (0..bounds.len() as u32).collect();
        let mut bvh = Bvh {
            nodes: Vec::new(),
            elements: Vec::with_capacity(bounds.len()),
            root: 0,
        };
        bvh.root = bvh.build_node(&mut indices, bounds, centroids, 0);
        bvh
    }

    fn build_node(
        &mut self,
        indices: &mut [u32],
        bounds: &[Aabb],
        centroids: &[Vec3],
        depth: usize,
    ) -> u32 {
        if indices.len() < LEAF_THRESHOLD {
            let start = self.elements.len() as u32;
            self.elements.extend_from_slice(indices);
            let end = self.elements.len() as u32;

            let mut leaf_bounds = Aabb::empty();
            for &idx in indices.iter() {
                leaf_bounds = Aabb::surrounding_box(leaf_bounds, bounds[idx as usize]);
            }
            leaf_bounds.widen(BOUNDS_EPSILON);

            let node_index = self.nodes.len() as u32;
            self.nodes.push(BvhNode::Leaf {
                bounds: leaf_bounds,
                elems: start..end,
            });
            return node_index;
        }

        let axis = depth % 3;
        indices.sort_unstable_by(|&i, &j| {
            centroids[i as usize]
                .axis(axis)
                .total_cmp(&centroids[j as usize].axis(axis))
        });

        let mid = indices.len() / 2;
        let (left_half, right_half) = indices.split_at_mut(mid);
        let left = self.build_node(left_half, bounds, centroids, depth + 1);
        let right = self.build_node(right_half, bounds, centroids, depth + 1);

        let mut node_bounds = Aabb::surrounding_box(
            *self.nodes[left as usize].bounds(),
            *self.nodes[right as usize].bounds(),
        );
        node_bounds.widen(BOUNDS_EPSILON);

        let node_index = self.nodes.len() as u32;
        self.nodes.push(BvhNode::Internal {
            bounds: node_bounds,
            left,
            right,
        });
        node_index
    }

    pub fn bounds(&self) -> &Aabb {
        self.nodes[self.root as usize].bounds()
    }

    /// Nearest-hit traversal. `test` performs the exact element
    /// intersection; it must only accept hits with `t < ray.tmax` and must
    /// shrink `ray.tmax` on acceptance, which lets every later box and
    /// element test anywhere in the tree reject farther candidates.
    /// Both children of an internal node are visited unconditionally.
    pub fn intersect_nearest<F>(&self, ray: &mut Ray, mut test: F) -> bool
    where
        F: FnMut(u32, &mut Ray) -> bool,
    {
        self.nearest_node(self.root, ray, &mut test)
    }

    fn nearest_node<F>(&self, node_index: u32, ray: &mut Ray, test: &mut F) -> bool
    where
        F: FnMut(u32, &mut Ray) -> bool,
    {
        let node = &self.nodes[node_index as usize];
        if !node.bounds().ray_intersect(ray) {
            return false;
        }

        match node {
            BvhNode::Leaf { elems, .. } => {
                let mut hit = false;
                for &elem in &self.elements[elems.start as usize..elems.end as usize] {
                    hit |= test(elem, ray);
                }
                hit
            }
            BvhNode::Internal { left, right, .. } => {
                let (left, right) = (*left, *right);
                let hit_left = self.nearest_node(left, ray, test);
                let hit_right = self.nearest_node(right, ray, test);
                hit_left || hit_right
            }
        }
    }

    /// Boolean traversal: returns on the first element hit found in either
    /// subtree. Used for shadow rays.
    pub fn intersect_any<F>(&self, ray: &Ray, mut test: F) -> bool
    where
        F: FnMut(u32, &Ray) -> bool,
    {
        self.any_node(self.root, ray, &mut test)
    }

    fn any_node<F>(&self, node_index: u32, ray: &Ray, test: &mut F) -> bool
    where
        F: FnMut(u32, &Ray) -> bool,
    {
        let node = &self.nodes[node_index as usize];
        if !node.bounds().ray_intersect(ray) {
            return false;
        }

        match node {
            BvhNode::Leaf { elems, .. } => self.elements
                [elems.start as usize..elems.end as usize]
                .iter()
                .any(|&elem| test(elem, ray)),
            BvhNode::Internal { left, right, .. } => {
                self.any_node(*left, ray, test) || self.any_node(*right, ray, test)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soup(n: usize) -> (Vec<Aabb>, Vec<Vec3>) {
        // deterministic pseudo-random boxes spread through space
        let mut bounds = Vec::with_capacity(n);
        let mut centroids = Vec::with_capacity(n);
        let mut state = 0x9e3779b9_u32;
        let mut next = move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 8) as f32 / (1 << 24) as f32
        };

        for _ in 0..n {
            let center = Vec3(
                next() * 20.0 - 10.0,
                next() * 20.0 - 10.0,
                next() * 20.0 - 10.0,
            );
            let half = Vec3(next() * 0.5, next() * 0.5, next() * 0.5);
            bounds.push(Aabb::new(center - half, center + half));
            centroids.push(center);
        }

        (bounds, centroids)
    }

    #[test]
    fn every_element_lands_in_exactly_one_leaf() {
        let (bounds, centroids) = soup(237);
        let bvh = Bvh::build(&bounds, &centroids);

        let mut seen = vec![0_u32; bounds.len()];
        for node in &bvh.nodes {
            if let BvhNode::Leaf { elems, .. } = node {
                for &e in &bvh.elements[elems.start as usize..elems.end as usize] {
                    seen[e as usize] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn node_bounds_contain_children() {
        let (bounds, centroids) = soup(237);
        let bvh = Bvh::build(&bounds, &centroids);

        for node in &bvh.nodes {
            match node {
                BvhNode::Leaf {
                    bounds: leaf_bounds,
                    elems,
                } => {
                    for &e in &bvh.elements[elems.start as usize..elems.end as usize] {
                        assert!(leaf_bounds.contains(&bounds[e as usize]));
                    }
                }
                BvhNode::Internal {
                    bounds: node_bounds,
                    left,
                    right,
                } => {
                    assert!(node_bounds.contains(bvh.nodes[*left as usize].bounds()));
                    assert!(node_bounds.contains(bvh.nodes[*right as usize].bounds()));
                }
            }
        }
    }

    #[test]
    fn leaves_respect_threshold() {
        let (bounds, centroids) = soup(512);
        let bvh = Bvh::build(&bounds, &centroids);

        for node in &bvh.nodes {
            if let BvhNode::Leaf { elems, .. } = node {
                assert!(((elems.end - elems.start) as usize) < LEAF_THRESHOLD);
            }
        }
    }

    #[test]
    fn small_input_builds_single_leaf() {
        let (bounds, centroids) = soup(4);
        let bvh = Bvh::build(&bounds, &centroids);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(matches!(bvh.nodes[0], BvhNode::Leaf { .. }));
    }

    #[test]
    fn traversal_visits_element_whose_box_is_on_the_ray() {
        let (bounds, centroids) = soup(237);
        let bvh = Bvh::build(&bounds, &centroids);

        // aim at a known element's centroid from well outside the soup
        let target = centroids[100];
        let origin = Vec3(0.0, 0.0, -50.0);
        let mut ray = Ray::new(origin, (target - origin).unit());

        let mut visited = Vec::new();
        bvh.intersect_nearest(&mut ray, |elem, _ray| {
            visited.push(elem);
            false
        });
        assert!(visited.contains(&100));
    }
}
