//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree knows nothing about what it indexes: leaves carry an opaque
//! data id and traversal hands that id to a caller-supplied closure. The
//! same type backs the per-mesh triangle BVH and the scene's object BVH.

use luma_math::{Aabb, Ray};

/// A leaf candidate: bounds plus the id of whatever it stands for.
#[derive(Debug, Clone, Copy)]
pub struct Leaf {
    pub bounds: Aabb,
    pub data_id: usize,
}

/// BVH node - either a single leaf or an interior node over its children.
#[derive(Debug, Clone)]
pub enum BvhNode {
    Leaf(Leaf),
    Interior { bounds: Aabb, children: Vec<BvhNode> },
}

impl BvhNode {
    pub fn bounds(&self) -> Aabb {
        match self {
            BvhNode::Leaf(leaf) => leaf.bounds,
            BvhNode::Interior { bounds, .. } => *bounds,
        }
    }
}

/// Nearest hit reported by [`Bvh::intersect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhHit {
    pub distance: f64,

    /// Data id of the leaf that was hit
    pub data_id: usize,

    /// Whatever the leaf callback returned alongside the distance
    pub payload: usize,
}

/// Median-split BVH over appended leaves.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    leaves: Vec<Leaf>,
    root: Option<BvhNode>,
}

impl Bvh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all leaves and the built tree.
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.root = None;
    }

    /// Register one leaf candidate.
    pub fn append_leaf(&mut self, bounds: Aabb, data_id: usize) {
        self.leaves.push(Leaf { bounds, data_id });
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_built(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Build the tree from the appended leaves and return its depth.
    ///
    /// A lone leaf has depth 1. Panics when no leaves were appended.
    pub fn build_tree(&mut self) -> usize {
        assert!(!self.leaves.is_empty(), "BVH build requires at least one leaf");

        let leaves = self.leaves.clone();
        let (root, depth) = Self::build(leaves, 0);
        self.root = Some(root);
        depth
    }

    /// Recursive median split.
    ///
    /// Sorts the partition by centroid on the longest axis of its bounds,
    /// splits at `count / 2` and recurses. The sort is stable so equal
    /// centroids keep their input order.
    fn build(mut leaves: Vec<Leaf>, depth: usize) -> (BvhNode, usize) {
        if leaves.len() < 2 {
            return (BvhNode::Leaf(leaves[0]), depth + 1);
        }

        let bounds = leaves.iter().fold(Aabb::EMPTY, |mut acc, leaf| {
            acc.expand_box(&leaf.bounds);
            acc
        });

        let axis = bounds.longest_axis();
        leaves.sort_by(|a, b| {
            let a_val = a.bounds.centroid()[axis];
            let b_val = b.bounds.centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        let mid = leaves.len() / 2;
        let right_leaves = leaves.split_off(mid);
        let left_leaves = leaves;

        let (left, d0) = Self::build(left_leaves, depth + 1);
        let (right, d1) = Self::build(right_leaves, depth + 1);

        let node = BvhNode::Interior {
            bounds,
            children: vec![left, right],
        };
        (node, d0.max(d1))
    }

    /// Nearest hit within `[near, far]`.
    ///
    /// `leaf_test(data_id, ray, near, far)` returns the distance and a
    /// payload for a hit. Each subtree is searched with the closest
    /// distance found so far as its far bound. A hit only counts if it is
    /// strictly closer than `far`.
    pub fn intersect<F>(&self, ray: &Ray, near: f64, far: f64, mut leaf_test: F) -> Option<BvhHit>
    where
        F: FnMut(usize, &Ray, f64, f64) -> Option<(f64, usize)>,
    {
        let root = self.root.as_ref()?;
        Self::intersect_node(root, ray, near, far, &mut leaf_test).filter(|hit| hit.distance < far)
    }

    fn intersect_node<F>(
        node: &BvhNode,
        ray: &Ray,
        near: f64,
        far: f64,
        leaf_test: &mut F,
    ) -> Option<BvhHit>
    where
        F: FnMut(usize, &Ray, f64, f64) -> Option<(f64, usize)>,
    {
        match node {
            BvhNode::Leaf(leaf) => {
                leaf_test(leaf.data_id, ray, near, far).map(|(distance, payload)| BvhHit {
                    distance,
                    data_id: leaf.data_id,
                    payload,
                })
            }
            BvhNode::Interior { bounds, children } => {
                if !bounds.is_intersect(ray, near, far) {
                    return None;
                }

                let mut closest: Option<BvhHit> = None;
                let mut min_far = far;
                for child in children {
                    if let Some(hit) = Self::intersect_node(child, ray, near, min_far, leaf_test) {
                        min_far = hit.distance;
                        closest = Some(hit);
                    }
                }

                closest.filter(|hit| hit.distance < far)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luma_math::{DVec3, Random};

    // Leaves are unit-ish spheres, intersected analytically
    struct Ball {
        center: DVec3,
        radius: f64,
    }

    impl Ball {
        fn bounds(&self) -> Aabb {
            Aabb::new(
                self.center - DVec3::splat(self.radius),
                self.center + DVec3::splat(self.radius),
            )
        }

        fn hit(&self, ray: &Ray, near: f64, far: f64) -> Option<f64> {
            let op = self.center - ray.origin;
            let b = op.dot(ray.direction);
            let det = b * b - op.dot(op) + self.radius * self.radius;
            if det < 0.0 {
                return None;
            }
            let s = det.sqrt();
            [b - s, b + s].into_iter().find(|&t| near < t && t < far)
        }
    }

    fn random_balls(n: usize, rng: &mut Random) -> Vec<Ball> {
        (0..n)
            .map(|_| Ball {
                center: DVec3::new(
                    rng.next_f64_signed_cc() * 50.0,
                    rng.next_f64_signed_cc() * 50.0,
                    rng.next_f64_signed_cc() * 50.0,
                ),
                radius: 0.2 + rng.next_f64_co(),
            })
            .collect()
    }

    fn build(balls: &[Ball]) -> (Bvh, usize) {
        let mut bvh = Bvh::new();
        for (i, ball) in balls.iter().enumerate() {
            bvh.append_leaf(ball.bounds(), i);
        }
        let depth = bvh.build_tree();
        (bvh, depth)
    }

    fn brute_force(balls: &[Ball], ray: &Ray, near: f64, far: f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, ball) in balls.iter().enumerate() {
            if let Some(t) = ball.hit(ray, near, far) {
                if best.map_or(true, |(_, d)| t < d) {
                    best = Some((i, t));
                }
            }
        }
        best
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mut rng = Random::new(2024);
        for n in [1, 2, 3, 10, 1000] {
            let balls = random_balls(n, &mut rng);
            let (bvh, _) = build(&balls);

            // Aim at every leaf (up to 50) from a random far-away point
            for target in balls.iter().take(50) {
                let origin = DVec3::new(
                    rng.next_f64_signed_cc(),
                    rng.next_f64_signed_cc(),
                    rng.next_f64_signed_cc(),
                ) * 200.0;
                let ray = Ray::new(origin, (target.center - origin).normalize());

                let expected = brute_force(&balls, &ray, 1e-4, 1e10);
                let hit = bvh.intersect(&ray, 1e-4, 1e10, |id, ray, near, far| {
                    balls[id].hit(ray, near, far).map(|t| (t, id))
                });

                let (expected_id, expected_t) = expected.expect("ray aimed at a center must hit");
                let hit = hit.expect("bvh missed a hit found by brute force");
                assert_eq!(hit.data_id, expected_id, "n = {}", n);
                assert_eq!(hit.payload, expected_id);
                assert!((hit.distance - expected_t).abs() < 1e-9, "n = {}", n);
            }
        }
    }

    #[test]
    fn test_bvh_miss() {
        let balls = vec![Ball {
            center: DVec3::new(0.0, 0.0, -5.0),
            radius: 1.0,
        }];
        let (bvh, depth) = build(&balls);
        assert_eq!(depth, 1);

        let ray = Ray::new(DVec3::new(10.0, 0.0, 0.0), DVec3::NEG_Z);
        let hit = bvh.intersect(&ray, 1e-4, 1e10, |id, ray, near, far| {
            balls[id].hit(ray, near, far).map(|t| (t, 0))
        });
        assert!(hit.is_none());
    }

    #[test]
    fn test_bvh_depth_balanced() {
        let mut rng = Random::new(5);
        let balls = random_balls(8, &mut rng);
        let (bvh, depth) = build(&balls);

        // Root, two levels of interior nodes, then leaves
        assert_eq!(depth, 4);
        assert!(matches!(bvh.root(), Some(BvhNode::Interior { children, .. }) if children.len() == 2));
    }

    #[test]
    fn test_bvh_far_bound_is_strict() {
        let balls = vec![Ball {
            center: DVec3::ZERO,
            radius: 1.0,
        }];
        let (bvh, _) = build(&balls);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::NEG_Z);

        // A leaf that reports exactly `far` does not count
        let hit = bvh.intersect(&ray, 0.0, 4.0, |_, _, _, far| Some((far, 0)));
        assert!(hit.is_none());

        let hit = bvh.intersect(&ray, 0.0, 10.0, |id, ray, near, far| {
            balls[id].hit(ray, near, far).map(|t| (t, 0))
        });
        assert!((hit.unwrap().distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_bvh_equal_centroids_keep_order() {
        let mut bvh = Bvh::new();
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        for id in 0..4 {
            bvh.append_leaf(bounds, id);
        }
        bvh.build_tree();

        let mut order = Vec::new();
        fn collect(node: &BvhNode, out: &mut Vec<usize>) {
            match node {
                BvhNode::Leaf(leaf) => out.push(leaf.data_id),
                BvhNode::Interior { children, .. } => {
                    children.iter().for_each(|c| collect(c, out));
                }
            }
        }
        collect(bvh.root().unwrap(), &mut order);
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "at least one leaf")]
    fn test_bvh_empty_build_panics() {
        Bvh::new().build_tree();
    }
}
