use crate::error::Axis;
use crate::matrix::Matrix;
use crate::split::SplitGroup;
use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// One agglomeration step. Ids `< n_leaves` are leaves, id `n_leaves + k` is
/// the cluster created by merge `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// U-shaped dendrogram link in scipy `icoord` / `dcoord` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramSegment {
    pub icoord: [f64; 4],
    pub dcoord: [f64; 4],
}

/// Binary merge tree produced by agglomerative clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeTree {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl MergeTree {
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    fn root(&self) -> usize {
        self.n_leaves + self.merges.len() - 1
    }

    /// Leaves in left-to-right dendrogram order.
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.merges.is_empty() {
            return (0..self.n_leaves).collect();
        }
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if id < self.n_leaves {
                order.push(id);
            } else {
                let merge = &self.merges[id - self.n_leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

    /// One segment per merge, in merge order. Leaf `k` of the leaf order sits
    /// at `5 + 10k`; heights are merge distances.
    pub fn dendrogram_segments(&self) -> Vec<DendrogramSegment> {
        let mut x = vec![0.0; self.n_leaves + self.merges.len()];
        let mut height = vec![0.0; self.n_leaves + self.merges.len()];
        for (k, leaf) in self.leaf_order().into_iter().enumerate() {
            x[leaf] = 5.0 + 10.0 * k as f64;
        }
        let mut segments = Vec::with_capacity(self.merges.len());
        for (k, merge) in self.merges.iter().enumerate() {
            let id = self.n_leaves + k;
            let (xl, xr) = (x[merge.left], x[merge.right]);
            let (hl, hr) = (height[merge.left], height[merge.right]);
            x[id] = (xl + xr) / 2.0;
            height[id] = merge.distance;
            segments.push(DendrogramSegment {
                icoord: [xl, xl, xr, xr],
                dcoord: [hl, merge.distance, merge.distance, hr],
            });
        }
        segments
    }
}

/// Permutation of axis indices, with the merge tree when it came from clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOrdering {
    order: Vec<usize>,
    tree: Option<MergeTree>,
}

impl ClusterOrdering {
    pub fn identity(n: usize) -> Self {
        ClusterOrdering {
            order: (0..n).collect(),
            tree: None,
        }
    }

    pub fn from_tree(tree: MergeTree) -> Self {
        ClusterOrdering {
            order: tree.leaf_order(),
            tree: Some(tree),
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn tree(&self) -> Option<&MergeTree> {
        self.tree.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(i, &o)| i == o)
    }

    /// Reorder `items` (labels, values, ...) by this permutation.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.order.iter().map(|&i| items[i].clone()).collect()
    }
}

/// Euclidean distance. Coordinates missing on either side are skipped and the
/// squared sum is scaled by `total / used`. Differences are divided by the
/// largest one before squaring so far-apart vectors stay finite.
fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    let mut scale = 0.0_f64;
    let mut used = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        if x.is_finite() && y.is_finite() {
            scale = scale.max((x - y).abs());
            used += 1;
        }
    }
    if used == 0 || scale == 0.0 {
        return 0.0;
    }
    if !scale.is_finite() {
        return f64::INFINITY;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| ((x - y) / scale).powi(2))
        .sum();
    scale * (sum * a.len() as f64 / used as f64).sqrt()
}

/// Full symmetric `n x n` distance matrix, row-major.
pub fn pairwise_distances(vectors: &[Vec<f64>]) -> Vec<f64> {
    let n = vectors.len();
    let pairs: Vec<(usize, usize, f64)> = (0..n)
        .into_par_iter()
        .flat_map(|i| {
            (i + 1..n)
                .map(move |j| (i, j, euclidean(&vectors[i], &vectors[j])))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut dist = vec![0.0; n * n];
    for (i, j, d) in pairs {
        dist[i * n + j] = d;
        dist[j * n + i] = d;
    }
    dist
}

/// Average-linkage agglomerative clustering over a full distance matrix.
///
/// Keeps, for every active slot `i`, its nearest active neighbour `j > i`.
/// The pair with the smallest distance merges first; ties go to the smallest
/// slot index, then the smallest neighbour index.
pub fn average_linkage(dist: &[f64], n: usize) -> MergeTree {
    debug_assert_eq!(dist.len(), n * n);
    let mut d = dist.to_vec();
    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut node: Vec<usize> = (0..n).collect();
    let mut nn = vec![usize::MAX; n];
    let mut nn_dist = vec![f64::INFINITY; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    let nearest = |d: &[f64], active: &[bool], i: usize| -> (usize, f64) {
        let mut best = (usize::MAX, f64::INFINITY);
        for j in (i + 1)..n {
            if active[j] && (best.0 == usize::MAX || d[i * n + j] < best.1) {
                best = (j, d[i * n + j]);
            }
        }
        best
    };

    for i in 0..n {
        (nn[i], nn_dist[i]) = nearest(&d, &active, i);
    }

    for step in 0..n.saturating_sub(1) {
        let mut a = usize::MAX;
        let mut best = f64::INFINITY;
        for i in 0..n {
            if active[i] && nn[i] != usize::MAX && (a == usize::MAX || nn_dist[i] < best) {
                a = i;
                best = nn_dist[i];
            }
        }
        if a == usize::MAX {
            break;
        }
        let b = nn[a];

        merges.push(Merge {
            left: node[a].min(node[b]),
            right: node[a].max(node[b]),
            distance: best,
            size: size[a] + size[b],
        });

        let (sa, sb) = (size[a] as f64, size[b] as f64);
        for k in 0..n {
            if !active[k] || k == a || k == b {
                continue;
            }
            let merged = (sa * d[a * n + k] + sb * d[b * n + k]) / (sa + sb);
            d[a * n + k] = merged;
            d[k * n + a] = merged;
        }
        active[b] = false;
        size[a] += size[b];
        node[a] = n + step;

        for i in 0..n {
            if !active[i] {
                continue;
            }
            if i == a || nn[i] == a || nn[i] == b {
                (nn[i], nn_dist[i]) = nearest(&d, &active, i);
            } else if i < a {
                let candidate = d[i * n + a];
                if candidate < nn_dist[i] || (candidate == nn_dist[i] && a < nn[i]) {
                    nn[i] = a;
                    nn_dist[i] = candidate;
                }
            }
        }
    }

    MergeTree { n_leaves: n, merges }
}

/// Order one axis of `matrix`. Identity when `cluster` is off or the axis has
/// fewer than two elements.
pub fn order_axis(matrix: &Matrix, axis: Axis, cluster: bool) -> ClusterOrdering {
    let n = matrix.len(axis);
    if !cluster || n < 2 {
        return ClusterOrdering::identity(n);
    }
    debug!("Clustering {} {}s (average linkage)", n, axis);
    let vectors = matrix.axis_vectors(axis);
    let dist = pairwise_distances(&vectors);
    ClusterOrdering::from_tree(average_linkage(&dist, n))
}

/// Ordering of one split group; `ordering` indexes into `members`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOrdering {
    pub label: String,
    pub members: Vec<usize>,
    pub ordering: ClusterOrdering,
}

impl GroupOrdering {
    /// Member row indices in display order.
    pub fn ordered_rows(&self) -> Vec<usize> {
        self.ordering.apply(&self.members)
    }
}

/// Per-group row orderings, in group order, addressable by label.
#[derive(Debug, Clone, Default)]
pub struct GroupOrderings {
    groups: Vec<GroupOrdering>,
    by_label: FxHashMap<String, usize>,
}

impl GroupOrderings {
    /// Cluster the rows of each group independently.
    pub fn compute(matrix: &Matrix, groups: &[SplitGroup], cluster: bool) -> Self {
        let mut out = GroupOrderings::default();
        for group in groups {
            let sub = matrix.select_rows(&group.members);
            let ordering = order_axis(&sub, Axis::Row, cluster);
            out.by_label.insert(group.label.clone(), out.groups.len());
            out.groups.push(GroupOrdering {
                label: group.label.clone(),
                members: group.members.clone(),
                ordering,
            });
        }
        out
    }

    pub fn get(&self, label: &str) -> Option<&GroupOrdering> {
        self.by_label.get(label).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupOrdering> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All rows in display order, group after group.
    pub fn row_order(&self) -> Vec<usize> {
        self.groups.iter().flat_map(|g| g.ordered_rows()).collect()
    }
}
