//! Kernel-norm index: a binary ball tree in the kernel's feature space
//!
//! Nodes live in an arena (`Vec<Node>`) in pre-order, so the subtree rooted at
//! node `id` occupies ids `id..id + subtree_nodes` and every node's points are
//! the contiguous slice `begin..begin + count` of the tree's index permutation.
//! Parent links are plain arena indices.

pub mod bound;

use crate::core::{Dataset, FastMksError, Result};
use crate::kernel::Kernel;
use log::debug;
use std::ops::Range;

use self::bound::{covering_distance, squared_distance};

/// Number of evenly strided points tried when picking a node center
const CENTER_CANDIDATES: usize = 8;

/// A node of the kernel tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// First position of this node's points in the index permutation
    pub begin: usize,
    /// Number of points under this node
    pub count: usize,
    /// Dataset index of the center point (always one of the node's points)
    pub center: usize,
    /// sqrt(K(center, center))
    pub center_norm: f64,
    /// Upper bound on the feature-space distance from the center to any point
    pub radius: f64,
    /// Upper bound on sqrt(K(p, p)) over the node's points
    pub max_norm: f64,
    /// Smallest dataset index under this node
    pub min_index: usize,
    /// Arena index of the parent, `None` for the root
    pub parent: Option<usize>,
    /// Arena indices of the two children, `None` for leaves
    pub children: Option<(usize, usize)>,
    /// Number of nodes in this subtree, itself included
    pub subtree_nodes: usize,
}

impl Node {
    /// Whether this node holds points directly
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Positions of this node's points in the index permutation
    pub fn range(&self) -> Range<usize> {
        self.begin..self.begin + self.count
    }
}

/// Binary ball tree over a dataset in kernel feature space
#[derive(Debug, Clone)]
pub struct KernelTree {
    nodes: Vec<Node>,
    indices: Vec<usize>,
    self_kernels: Vec<f64>,
    norms: Vec<f64>,
    leaf_size: usize,
}

/// Pending node during construction
struct BuildTask {
    begin: usize,
    end: usize,
    center: usize,
    radius: f64,
    parent: Option<(usize, usize)>,
}

/// Borrowed state shared by the construction steps
struct Builder<'a, K: Kernel + ?Sized> {
    dataset: &'a Dataset,
    kernel: &'a K,
    self_kernels: &'a [f64],
}

impl<'a, K: Kernel + ?Sized> Builder<'a, K> {
    fn kernel(&self, a: usize, b: usize) -> Result<f64> {
        let value = self
            .kernel
            .compute(self.dataset.point(a), self.dataset.point(b));
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FastMksError::NumericalError(format!(
                "Kernel between points {a} and {b} is {value}"
            )))
        }
    }

    fn covering_distance(&self, a: usize, b: usize, kab: f64) -> f64 {
        covering_distance(self.self_kernels[a], self.self_kernels[b], kab)
    }

    /// Pick the strided candidate with the smallest covering radius
    fn select_center(&self, points: &[usize]) -> Result<(usize, f64)> {
        let n = points.len();
        let n_candidates = CENTER_CANDIDATES.min(n);
        let mut best: Option<(usize, f64)> = None;

        for c in 0..n_candidates {
            let candidate = points[c * n / n_candidates];
            let mut radius: f64 = 0.0;
            for &p in points {
                let kcp = self.kernel(candidate, p)?;
                radius = radius.max(self.covering_distance(candidate, p, kcp));
            }
            if best.map_or(true, |(_, best_radius)| radius < best_radius) {
                best = Some((candidate, radius));
            }
        }

        best.ok_or_else(|| FastMksError::ConstructionError("Empty tree node".to_string()))
    }

    /// Partition `points` between the center `a` and the point `b` farthest
    /// from it, returning the split position, the left radius, the right
    /// center (`b`) and the right radius.
    ///
    /// Each child is centered on its own pivot, so a point's side agrees with
    /// the center kernel traversals use to order equal bounds.
    fn split(&self, points: &mut [usize], a: usize) -> Result<(usize, f64, usize, f64)> {
        let ka: Vec<f64> = points
            .iter()
            .map(|&p| self.kernel(a, p))
            .collect::<Result<_>>()?;
        let dist_a: Vec<f64> = points
            .iter()
            .zip(&ka)
            .map(|(&p, &kap)| squared_distance(self.self_kernels[a], self.self_kernels[p], kap))
            .collect();

        // Farthest point from the center, first one on ties
        let (far_pos, far_dist) = dist_a
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (i, d)| if d > best.1 { (i, d) } else { best });
        let b = points[far_pos];
        if far_dist == 0.0 || b == a {
            return self.half_split(points, a);
        }

        let mut left = Vec::with_capacity(points.len());
        let mut right = Vec::with_capacity(points.len());
        let mut left_radius: f64 = 0.0;
        let mut right_radius: f64 = 0.0;
        for (i, &p) in points.iter().enumerate() {
            let kbp = self.kernel(b, p)?;
            // d(a, p) <= d(b, p) through kernel differences; the rounded
            // distances tie whenever both kernel values vanish next to K(p, p)
            let closer_to_a =
                self.self_kernels[a] - self.self_kernels[b] <= 2.0 * (ka[i] - kbp);
            if p == a || (p != b && closer_to_a) {
                left.push(p);
                left_radius = left_radius.max(self.covering_distance(a, p, ka[i]));
            } else {
                right.push(p);
                right_radius = right_radius.max(self.covering_distance(b, p, kbp));
            }
        }

        let mid = left.len();
        points[..mid].copy_from_slice(&left);
        points[mid..].copy_from_slice(&right);
        Ok((mid, left_radius, b, right_radius))
    }

    /// Positional split for points that coincide with the center in feature space
    fn half_split(&self, points: &mut [usize], a: usize) -> Result<(usize, f64, usize, f64)> {
        let a_pos = points.iter().position(|&p| p == a).unwrap_or(0);
        points.swap(0, a_pos);
        let mid = points.len() / 2;

        let mut left_radius: f64 = 0.0;
        for &p in &points[..mid] {
            let kap = self.kernel(a, p)?;
            left_radius = left_radius.max(self.covering_distance(a, p, kap));
        }
        let (right_center, right_radius) = self.select_center(&points[mid..])?;
        Ok((mid, left_radius, right_center, right_radius))
    }
}

impl KernelTree {
    /// Build a tree over every point of `dataset`
    ///
    /// Fails with `InvalidArgument` for a zero leaf size, `ConstructionError`
    /// for non-finite coordinates and `NumericalError` when the kernel
    /// returns a non-finite value.
    pub fn build<K: Kernel + ?Sized>(dataset: &Dataset, kernel: &K, leaf_size: usize) -> Result<Self> {
        if leaf_size == 0 {
            return Err(FastMksError::InvalidArgument(
                "Leaf size must be positive".to_string(),
            ));
        }
        dataset.check_finite()?;

        let self_kernels = self_kernels(dataset, kernel)?;
        let norms: Vec<f64> = self_kernels.iter().map(|k| k.max(0.0).sqrt()).collect();
        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        let mut nodes: Vec<Node> = Vec::new();

        let builder = Builder {
            dataset,
            kernel,
            self_kernels: &self_kernels,
        };

        let (root_center, root_radius) = builder.select_center(&indices)?;
        let mut stack = vec![BuildTask {
            begin: 0,
            end: indices.len(),
            center: root_center,
            radius: root_radius,
            parent: None,
        }];

        while let Some(task) = stack.pop() {
            let id = nodes.len();
            if let Some((parent, side)) = task.parent {
                let children = nodes[parent].children.get_or_insert((id, id));
                if side == 0 {
                    children.0 = id;
                } else {
                    children.1 = id;
                }
            }

            nodes.push(Node {
                begin: task.begin,
                count: task.end - task.begin,
                center: task.center,
                center_norm: norms[task.center],
                radius: task.radius,
                max_norm: 0.0,
                min_index: usize::MAX,
                parent: task.parent.map(|(parent, _)| parent),
                children: None,
                subtree_nodes: 1,
            });

            if task.end - task.begin <= leaf_size {
                continue;
            }

            let (mid, left_radius, right_center, right_radius) =
                builder.split(&mut indices[task.begin..task.end], task.center)?;
            let mid = task.begin + mid;

            // Pushed right first so the left subtree gets the next ids
            stack.push(BuildTask {
                begin: mid,
                end: task.end,
                center: right_center,
                radius: right_radius,
                parent: Some((id, 1)),
            });
            stack.push(BuildTask {
                begin: task.begin,
                end: mid,
                center: task.center,
                radius: left_radius,
                parent: Some((id, 0)),
            });
        }

        // Children always have larger ids than their parent
        for id in (0..nodes.len()).rev() {
            let (max_norm, min_index, subtree_nodes) = match nodes[id].children {
                Some((left, right)) => (
                    nodes[left].max_norm.max(nodes[right].max_norm),
                    nodes[left].min_index.min(nodes[right].min_index),
                    1 + nodes[left].subtree_nodes + nodes[right].subtree_nodes,
                ),
                None => {
                    let points = &indices[nodes[id].range()];
                    (
                        points.iter().map(|&p| norms[p]).fold(0.0, f64::max),
                        points.iter().copied().min().unwrap_or(usize::MAX),
                        1,
                    )
                }
            };
            let node = &mut nodes[id];
            node.max_norm = max_norm;
            node.min_index = min_index;
            node.subtree_nodes = subtree_nodes;
        }

        let tree = Self {
            nodes,
            indices,
            self_kernels,
            norms,
            leaf_size,
        };
        debug!(
            "Built kernel tree: {} points, {} nodes, depth {}, leaf size {}",
            tree.len(),
            tree.nodes.len(),
            tree.depth(),
            leaf_size
        );
        Ok(tree)
    }

    /// The root node (always arena index 0)
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Node by arena index
    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Dataset indices of the points under `node`
    pub fn points(&self, node: &Node) -> &[usize] {
        &self.indices[node.range()]
    }

    /// The full index permutation; leaves reference contiguous ranges of it
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// K(p, p) for dataset index `p`
    pub fn self_kernel(&self, p: usize) -> f64 {
        self.self_kernels[p]
    }

    /// sqrt(K(p, p)) for dataset index `p`
    pub fn norm(&self, p: usize) -> f64 {
        self.norms[p]
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false: a tree is never built over an empty dataset
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Maximum number of points per leaf
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Number of levels, a single leaf counting as 1
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut deepest = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            depths[id] = node.parent.map_or(1, |parent| depths[parent] + 1);
            deepest = deepest.max(depths[id]);
        }
        deepest
    }
}

/// Self-kernels of every point, failing on non-finite values
pub(crate) fn self_kernels<K: Kernel + ?Sized>(dataset: &Dataset, kernel: &K) -> Result<Vec<f64>> {
    dataset
        .points()
        .enumerate()
        .map(|(i, point)| {
            let value = kernel.self_compute(point);
            if value.is_finite() {
                Ok(value)
            } else {
                Err(FastMksError::NumericalError(format!(
                    "Self-kernel of point {i} is {value}"
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GaussianKernel, LinearKernel, PolynomialKernel};

    /// Four tight groups of 20 points at x = 0, 36, 12 and 24, in that order
    fn line_groups() -> Dataset {
        let rows = [0.0, 36.0, 12.0, 24.0]
            .iter()
            .flat_map(|&x| {
                (0..20).map(move |i| vec![x + 0.01 * (i % 5) as f64, 0.01 * (i / 5) as f64])
            })
            .collect();
        Dataset::from_rows(rows).unwrap()
    }

    fn grid(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| vec![(i % 7) as f64 - 3.0, (i / 7) as f64 * 0.5 - 1.0, (i % 3) as f64])
            .collect();
        Dataset::from_rows(rows).unwrap()
    }

    fn assert_invariants<K: Kernel>(tree: &KernelTree, data: &Dataset, kernel: &K) {
        // The permutation covers every point exactly once
        let mut seen = tree.indices().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..data.len()).collect::<Vec<_>>());

        for (id, node) in tree.nodes().iter().enumerate() {
            let points = tree.points(node);
            assert!(points.contains(&node.center));
            assert_eq!(node.min_index, *points.iter().min().unwrap());
            assert!(node.subtree_nodes >= 1);

            for &p in points {
                let kcp = kernel.compute(data.point(node.center), data.point(p));
                let dist = squared_distance(tree.self_kernel(node.center), tree.self_kernel(p), kcp)
                    .sqrt();
                assert!(dist <= node.radius, "radius of node {id} misses point {p}");
                assert!(tree.norm(p) <= node.max_norm);
            }

            match node.children {
                Some((left, right)) => {
                    assert_eq!(left, id + 1);
                    assert_eq!(right, id + 1 + tree.node(left).subtree_nodes);
                    assert_eq!(tree.node(left).parent, Some(id));
                    assert_eq!(tree.node(right).parent, Some(id));
                    assert_eq!(tree.node(left).center, node.center);
                    assert_eq!(tree.node(left).begin, node.begin);
                    assert_eq!(
                        tree.node(left).count + tree.node(right).count,
                        node.count
                    );
                    assert!(tree.node(left).count > 0 && tree.node(right).count > 0);
                }
                None => assert!(node.count <= tree.leaf_size()),
            }
        }
    }

    #[test]
    fn test_build_linear_tree() {
        let data = grid(200);
        let kernel = LinearKernel::new();
        let tree = KernelTree::build(&data, &kernel, 10).unwrap();

        assert_eq!(tree.len(), 200);
        assert_eq!(tree.root().count, 200);
        assert_eq!(tree.root().parent, None);
        assert_eq!(tree.root().subtree_nodes, tree.nodes().len());
        assert!(tree.depth() > 1);
        assert_invariants(&tree, &data, &kernel);
    }

    #[test]
    fn test_build_polynomial_tree() {
        let data = grid(150);
        let kernel = PolynomialKernel::with_offset(3, 1.0);
        let tree = KernelTree::build(&data, &kernel, 4).unwrap();
        assert_invariants(&tree, &data, &kernel);
    }

    #[test]
    fn test_single_leaf_tree() {
        let data = grid(5);
        let tree = KernelTree::build(&data, &LinearKernel::new(), 20).unwrap();
        assert_eq!(tree.nodes().len(), 1);
        assert!(tree.root().is_leaf());
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_identical_points() {
        let data = Dataset::new(vec![1.5; 3 * 64], 3).unwrap();
        let kernel = LinearKernel::new();
        let tree = KernelTree::build(&data, &kernel, 4).unwrap();
        assert_invariants(&tree, &data, &kernel);
        assert!(tree.nodes().len() > 1);
    }

    #[test]
    fn test_zero_self_kernel() {
        let data = Dataset::new(vec![0.0; 2 * 30], 2).unwrap();
        let tree = KernelTree::build(&data, &LinearKernel::new(), 3).unwrap();
        assert_eq!(tree.root().max_norm, 0.0);
        assert_eq!(tree.len(), 30);
    }

    #[test]
    fn test_build_rejects_bad_input() {
        let data = grid(10);
        assert!(matches!(
            KernelTree::build(&data, &LinearKernel::new(), 0),
            Err(FastMksError::InvalidArgument(_))
        ));

        let bad = Dataset::new(vec![1.0, f64::INFINITY, 0.0, 0.0], 2).unwrap();
        assert!(matches!(
            KernelTree::build(&bad, &LinearKernel::new(), 1),
            Err(FastMksError::ConstructionError(_))
        ));

        // Finite coordinates whose self-kernel overflows
        let huge = Dataset::new(vec![1e200, 1e200], 2).unwrap();
        assert!(matches!(
            KernelTree::build(&huge, &LinearKernel::new(), 1),
            Err(FastMksError::NumericalError(_))
        ));
    }

    #[test]
    fn test_far_groups_split_evenly() {
        // Gaussian distances between the groups all round to sqrt(2), so the
        // split has to be decided by the kernel values themselves
        let data = line_groups();
        let kernel = GaussianKernel::from_bandwidth(1.0);
        let tree = KernelTree::build(&data, &kernel, 20).unwrap();
        assert_invariants(&tree, &data, &kernel);

        let (left, right) = tree.root().children.unwrap();
        assert_eq!(tree.node(left).count, 40);
        assert_eq!(tree.node(right).count, 40);
        assert_eq!(tree.depth(), 3);

        // Every leaf holds exactly one group
        for node in tree.nodes().iter().filter(|node| node.is_leaf()) {
            let group = node.min_index / 20;
            assert!(tree.points(node).iter().all(|&p| p / 20 == group));
        }
    }
}
