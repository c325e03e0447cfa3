//! Hierarchical agglomerative clustering over optional embedding vectors

use crate::extraction::cosine_similarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Linkage {
    /// Cluster similarity is the least similar pair; resists chaining
    Complete,
    /// Cluster similarity is the size-weighted mean over all pairs
    Average,
}

/// One agglomeration step: two clusters joined at `similarity`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Merge {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub similarity: f64,
}

impl Merge {
    /// Every member of the merged cluster, ascending
    pub fn members(&self) -> Vec<usize> {
        let mut members: Vec<usize> = self.left.iter().chain(&self.right).copied().collect();
        members.sort_unstable();
        members
    }
}

/// Similarities between items, upper triangle only
struct PairTable {
    n: usize,
    values: Vec<f64>,
}

impl PairTable {
    fn new(n: usize) -> Self {
        Self {
            n,
            values: vec![f64::NEG_INFINITY; n * n.saturating_sub(1) / 2],
        }
    }

    fn slot(&self, a: usize, b: usize) -> usize {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        a * (2 * self.n - a - 1) / 2 + (b - a - 1)
    }

    fn get(&self, a: usize, b: usize) -> f64 {
        self.values[self.slot(a, b)]
    }

    fn set(&mut self, a: usize, b: usize, value: f64) {
        let slot = self.slot(a, b);
        self.values[slot] = value;
    }
}

/// Most similar live cluster after `a`; ties go to the lower index
fn closest(table: &PairTable, clusters: &[Option<Vec<usize>>], a: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for b in (a + 1)..clusters.len() {
        if clusters[b].is_none() {
            continue;
        }
        let s = table.get(a, b);
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((b, s));
        }
    }
    best
}

/// Merge the most similar pair of clusters until none reaches `threshold`.
///
/// Items without a vector, or with a vector of a different dimension than
/// the first one, never merge. Equal similarities merge the lowest index pair
/// first. Returns the merges in the order they happened and the final
/// clusters ordered by their smallest member.
///
/// Memory grows with the square of the number of embedded items (one `f64`
/// per pair). Each row caches its nearest partner, so a merge only rescans
/// the rows it invalidated. Consolidation runs this over distinct surfaces,
/// which keeps a batch of a few thousand surfaces well within bounds; larger
/// batches should lower `embedding.max_spans`.
pub(crate) fn agglomerate(vectors: &[Option<&[f32]>], threshold: f64, linkage: Linkage) -> (Vec<Merge>, Vec<Vec<usize>>) {
    let n = vectors.len();
    let dim = vectors.iter().flatten().map(|v| v.len()).next();
    let embedded: Vec<(usize, &[f32])> = vectors
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| v.filter(|v| Some(v.len()) == dim).map(|v| (i, v)))
        .collect();
    let m = embedded.len();

    let mut table = PairTable::new(m);
    for a in 0..m {
        for b in (a + 1)..m {
            table.set(a, b, cosine_similarity(embedded[a].1, embedded[b].1) as f64);
        }
    }

    let mut clusters: Vec<Option<Vec<usize>>> = embedded.iter().map(|&(i, _)| Some(vec![i])).collect();
    let mut nearest: Vec<Option<(usize, f64)>> = (0..m).map(|a| closest(&table, &clusters, a)).collect();
    let mut merges = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..m {
            if clusters[a].is_none() {
                continue;
            }
            if let Some((b, s)) = nearest[a] {
                if best.map_or(true, |(_, _, top)| s > top) {
                    best = Some((a, b, s));
                }
            }
        }

        let Some((i, j, similarity)) = best else { break };
        if similarity < threshold {
            break;
        }

        let (Some(mut left), Some(right)) = (clusters[i].take(), clusters[j].take()) else {
            break;
        };
        let (wi, wj) = (left.len() as f64, right.len() as f64);
        for k in 0..m {
            if k == i || k == j || clusters[k].is_none() {
                continue;
            }
            let updated = match linkage {
                Linkage::Complete => table.get(i, k).min(table.get(j, k)),
                Linkage::Average => (wi * table.get(i, k) + wj * table.get(j, k)) / (wi + wj),
            };
            table.set(i, k, updated);
        }

        merges.push(Merge {
            left: left.clone(),
            right: right.clone(),
            similarity,
        });
        left.extend(right);
        left.sort_unstable();
        clusters[i] = Some(left);
        nearest[j] = None;

        for k in 0..m {
            if clusters[k].is_none() {
                continue;
            }
            let stale = k == i
                || nearest[k].is_some_and(|(partner, s)| {
                    partner == i || partner == j || (k < i && table.get(k, i) >= s)
                });
            if stale {
                nearest[k] = closest(&table, &clusters, k);
            }
        }
    }

    let mut in_table = vec![false; n];
    for &(i, _) in &embedded {
        in_table[i] = true;
    }
    let mut out: Vec<Vec<usize>> = clusters.into_iter().flatten().collect();
    out.extend((0..n).filter(|&i| !in_table[i]).map(|i| vec![i]));
    out.sort_by_key(|c| c[0]);
    (merges, out)
}
