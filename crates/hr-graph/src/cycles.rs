//! Minimum cycle basis of an element view.
//!
//! Candidates are Horton cycles (shortest-path tree from every root, closed
//! by one non-tree edge) on the 2-core of the view. They are sorted by
//! length and then by node ids, and the GF(2) independent ones are kept
//! until the basis has `m - n + c` cycles.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use hr_core::ElementId;

use crate::view::ElementGraph;

type Adjacency = BTreeMap<ElementId, BTreeSet<ElementId>>;

impl<'g> ElementGraph<'g> {
    /// Cycle basis of the view, each cycle as an ordered node list starting
    /// at its smallest node. Deterministic for identical graphs.
    pub fn get_cycles(&self) -> Vec<Vec<ElementId>> {
        minimum_cycle_basis(&two_core(self.adjacency()))
    }
}

/// Strip nodes of degree < 2 until none remain; they are on no cycle.
fn two_core(mut adj: Adjacency) -> Adjacency {
    let mut queue: Vec<ElementId> = adj
        .iter()
        .filter(|(_, ns)| ns.len() < 2)
        .map(|(n, _)| *n)
        .collect();
    while let Some(n) = queue.pop() {
        let Some(ns) = adj.remove(&n) else {
            continue;
        };
        for m in ns {
            if let Some(mn) = adj.get_mut(&m) {
                mn.remove(&n);
                if mn.len() < 2 {
                    queue.push(m);
                }
            }
        }
    }
    adj
}

fn component_count(adj: &Adjacency) -> usize {
    let mut seen = HashSet::new();
    let mut count = 0;
    for &start in adj.keys() {
        if !seen.insert(start) {
            continue;
        }
        count += 1;
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            for &m in adj.get(&n).into_iter().flatten() {
                if seen.insert(m) {
                    stack.push(m);
                }
            }
        }
    }
    count
}

fn bfs_parents(adj: &Adjacency, root: ElementId) -> HashMap<ElementId, ElementId> {
    let mut parent = HashMap::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(n) = queue.pop_front() {
        for &m in adj.get(&n).into_iter().flatten() {
            if seen.insert(m) {
                parent.insert(m, n);
                queue.push_back(m);
            }
        }
    }
    parent
}

/// `[node, parent, ..., root]`
fn path_to_root(parent: &HashMap<ElementId, ElementId>, mut node: ElementId) -> Vec<ElementId> {
    let mut path = vec![node];
    while let Some(&p) = parent.get(&node) {
        path.push(p);
        node = p;
    }
    path
}

struct Candidate {
    nodes: Vec<ElementId>,
    bits: Vec<u64>,
}

fn set_bit(bits: &mut [u64], i: usize) {
    bits[i / 64] ^= 1 << (i % 64);
}

fn has_bit(bits: &[u64], i: usize) -> bool {
    bits[i / 64] & (1 << (i % 64)) != 0
}

fn lowest_bit(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

fn minimum_cycle_basis(adj: &Adjacency) -> Vec<Vec<ElementId>> {
    let edges: Vec<(ElementId, ElementId)> = adj
        .iter()
        .flat_map(|(&a, ns)| ns.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
        .collect();
    let dim = (edges.len() + component_count(adj)).saturating_sub(adj.len());
    if dim == 0 {
        return Vec::new();
    }
    let edge_index: HashMap<(ElementId, ElementId), usize> =
        edges.iter().enumerate().map(|(i, e)| (*e, i)).collect();
    let words = edges.len().div_ceil(64);

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for &root in adj.keys() {
        let parent = bfs_parents(adj, root);
        for &(x, y) in &edges {
            let reached = |n: ElementId| n == root || parent.contains_key(&n);
            if !reached(x) || !reached(y) {
                continue;
            }
            if parent.get(&y) == Some(&x) || parent.get(&x) == Some(&y) {
                continue;
            }
            let px = path_to_root(&parent, x);
            let py = path_to_root(&parent, y);
            let head: HashSet<_> = px[..px.len() - 1].iter().collect();
            if py[..py.len() - 1].iter().any(|n| head.contains(n)) {
                continue;
            }
            let mut cycle: Vec<ElementId> = px.iter().rev().copied().collect();
            cycle.extend_from_slice(&py[..py.len() - 1]);

            let mut bits = vec![0u64; words];
            for i in 0..cycle.len() {
                let (a, b) = (cycle[i], cycle[(i + 1) % cycle.len()]);
                let key = if a < b { (a, b) } else { (b, a) };
                if let Some(&e) = edge_index.get(&key) {
                    set_bit(&mut bits, e);
                }
            }
            if seen.insert(bits.clone()) {
                candidates.push(Candidate {
                    nodes: normalize(cycle),
                    bits,
                });
            }
        }
    }
    candidates.sort_by(|a, b| {
        let mut sa = a.nodes.clone();
        let mut sb = b.nodes.clone();
        sa.sort();
        sb.sort();
        a.nodes.len().cmp(&b.nodes.len()).then(sa.cmp(&sb))
    });

    let mut basis: Vec<(usize, Vec<u64>)> = Vec::new();
    let mut out = Vec::new();
    for cand in candidates {
        let mut v = cand.bits;
        for (pivot, row) in &basis {
            if has_bit(&v, *pivot) {
                for (w, r) in v.iter_mut().zip(row) {
                    *w ^= r;
                }
            }
        }
        if let Some(pivot) = lowest_bit(&v) {
            basis.push((pivot, v));
            out.push(cand.nodes);
            if out.len() == dim {
                break;
            }
        }
    }
    out
}

/// Rotate to the smallest node, then walk toward its smaller neighbor.
fn normalize(mut cycle: Vec<ElementId>) -> Vec<ElementId> {
    let Some(start) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, n)| **n)
        .map(|(i, _)| i)
    else {
        return cycle;
    };
    cycle.rotate_left(start);
    if cycle.len() > 2 && cycle[cycle.len() - 1] < cycle[1] {
        cycle[1..].reverse();
    }
    cycle
}
