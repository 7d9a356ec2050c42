// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Edit distance and near-duplicate clustering for street and city spellings.

use std::collections::HashMap;

use log::debug;

/// Levenshtein distance (unit-cost insert/delete/substitute) between two
/// strings, counted in chars.
pub fn levenshtein(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();
    let (m, n) = (source.len(), target.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=n).collect();
    let mut curr_row = vec![0; n + 1];

    for i in 1..=m {
        curr_row[0] = i;
        for j in 1..=n {
            let cost = if source[i - 1] == target[j - 1] { 0 } else { 1 };
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[n]
}

/// Disjoint sets over a fixed list of strings.
#[derive(Debug)]
pub struct UnionFind {
    elems: Vec<String>,
    idx: HashMap<String, usize>,
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl UnionFind {
    pub fn new(elems: Vec<String>) -> Self {
        let idx = elems
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i))
            .collect();
        let n = elems.len();
        Self {
            elems,
            idx,
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merges the sets containing `a` and `b`. Unknown elements are ignored.
    pub fn union(&mut self, a: &str, b: &str) {
        let (ia, ib) = match (self.idx.get(a), self.idx.get(b)) {
            (Some(&ia), Some(&ib)) => (ia, ib),
            _ => return,
        };
        let (ra, rb) = (self.find(ia), self.find(ib));
        if ra == rb {
            return;
        }
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }

    /// Groups of connected elements. Groups are ordered by their earliest
    /// element, and each group keeps insertion order.
    pub fn clusters(&mut self) -> Vec<Vec<String>> {
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut out: Vec<Vec<String>> = Vec::new();
        for i in 0..self.elems.len() {
            let root = self.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                out.push(Vec::new());
                out.len() - 1
            });
            out[slot].push(self.elems[i].clone());
        }
        out
    }
}

/// Clusters spellings whose normalised edit distance is below `threshold`.
///
/// Variants are sorted by length first. A pair is compared only when their
/// lengths differ by at most 2 chars or by less than `threshold` of the longer
/// one, and joined when `distance / longer < threshold`.
pub fn cluster_variants(mut variants: Vec<String>, threshold: f64) -> Vec<Vec<String>> {
    variants.sort_by_key(|v| v.chars().count());
    let lens: Vec<usize> = variants.iter().map(|v| v.chars().count()).collect();
    let mut uf = UnionFind::new(variants.clone());

    for (i, s1) in variants.iter().enumerate() {
        for (j, s2) in variants.iter().enumerate().skip(i + 1) {
            let (len1, len2) = (lens[i], lens[j]);
            let longer = len1.max(len2);
            if longer == 0 {
                continue;
            }
            let diff = if len1 > len2 { len1 - len2 } else { len2 - len1 };
            if diff > 2 && diff as f64 / longer as f64 >= threshold {
                continue;
            }
            let distance = levenshtein(s1, s2);
            if (distance as f64) / (longer as f64) < threshold {
                debug!("joining {:?} and {:?} (distance {})", s1, s2, distance);
                uf.union(s1, s2);
            }
        }
    }

    uf.clusters()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("main", "main"), 0);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        // Counted in chars, not bytes
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_union_find_clusters_keep_insertion_order() {
        let mut uf = UnionFind::new(strings(&["a", "b", "c", "d"]));
        uf.union("d", "b");
        uf.union("a", "c");
        assert_eq!(
            uf.clusters(),
            vec![strings(&["a", "c"]), strings(&["b", "d"])]
        );
    }

    #[test]
    fn test_union_find_ignores_unknown() {
        let mut uf = UnionFind::new(strings(&["a", "b"]));
        uf.union("a", "zzz");
        assert_eq!(uf.clusters().len(), 2);
    }

    #[test]
    fn test_cluster_variants_joins_typos() {
        // 1 edit in 17 chars is below 10%
        let clusters = cluster_variants(
            strings(&["martin luther king", "martin luthr king", "elm"]),
            0.10,
        );
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], strings(&["elm"]));
        assert_eq!(
            clusters[1],
            strings(&["martin luthr king", "martin luther king"])
        );
    }

    #[test]
    fn test_cluster_variants_short_names_stay_apart() {
        // 1 edit in 4 chars is 25%, above the threshold
        let clusters = cluster_variants(strings(&["main", "mian"]), 0.10);
        assert_eq!(clusters.len(), 2);

        let clusters = cluster_variants(strings(&["main", "mian"]), 0.60);
        assert_eq!(clusters, vec![strings(&["main", "mian"])]);
    }

    #[test]
    fn test_cluster_variants_zero_threshold_never_joins() {
        let clusters = cluster_variants(strings(&["abcdefghijk", "abcdefghijl"]), 0.0);
        assert_eq!(clusters.len(), 2);
    }
}
