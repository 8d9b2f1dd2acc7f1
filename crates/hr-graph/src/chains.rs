//! Linear runs of same-kind elements.

use std::collections::BTreeSet;

use hr_core::ElementId;

use crate::view::ElementGraph;

impl<'g> ElementGraph<'g> {
    /// Maximal runs of elements whose type is in `types` and which have at
    /// most two neighbors in the whole graph.
    ///
    /// Each run is ordered along its path starting at the endpoint with the
    /// smaller id. A closed ring starts at its smallest node and ends at
    /// that node's smaller neighbor. Single-element runs are only returned
    /// with `include_singles`.
    pub fn get_type_chains(&self, types: &[&str], include_singles: bool) -> Vec<Vec<ElementId>> {
        let graph = self.graph();
        let candidates = self.filter(|n| self.is_type_in(n, types) && graph.neighbors(n).len() <= 2);

        let mut chains = Vec::new();
        for comp in candidates.connected_components() {
            if comp.len() == 1 {
                if include_singles {
                    chains.extend(comp.into_iter().map(|n| vec![n]));
                }
                continue;
            }
            let run = candidates.subgraph(comp.iter().copied());
            chains.push(order_run(&run, &comp));
        }
        chains
    }
}

fn order_run(run: &ElementGraph<'_>, comp: &BTreeSet<ElementId>) -> Vec<ElementId> {
    let endpoint = comp.iter().copied().find(|&n| run.degree(n) <= 1);
    let (start, first) = match endpoint {
        Some(start) => (start, run.neighbors(start).into_iter().next()),
        None => {
            // ring
            let start = comp.iter().copied().next();
            let next = start.and_then(|s| run.neighbors(s).into_iter().next_back());
            match start {
                Some(s) => (s, next),
                None => return Vec::new(),
            }
        }
    };

    let mut order = vec![start];
    let mut seen = BTreeSet::from([start]);
    let mut current = first;
    while let Some(n) = current {
        if !seen.insert(n) {
            break;
        }
        order.push(n);
        current = run.neighbors(n).into_iter().find(|m| !seen.contains(m));
    }
    order
}

#[cfg(test)]
mod tests {
    use hr_core::ElementId;

    use crate::builder::NetworkBuilder;
    use crate::types::{PIPE_LIKE, PIPE_SEGMENT, PUMP};

    fn link(b: &mut NetworkBuilder, i: ElementId, j: ElementId) {
        let pi = b.add_port(i);
        let pj = b.add_port(j);
        b.connect(pi, pj);
    }

    #[test]
    fn chains_stop_at_other_types_and_junctions() {
        // p0 - p1 - pump - p2 - p3 - tee - p5, tee also feeds p6
        let mut b = NetworkBuilder::new();
        let ids: Vec<_> = [
            ("p0", PIPE_SEGMENT),
            ("p1", PIPE_SEGMENT),
            ("pump", PUMP),
            ("p2", PIPE_SEGMENT),
            ("p3", PIPE_SEGMENT),
            ("tee", PIPE_SEGMENT),
            ("p5", PIPE_SEGMENT),
            ("p6", PIPE_SEGMENT),
        ]
        .into_iter()
        .map(|(name, t)| b.add_element(name, t))
        .collect();
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (5, 7)] {
            link(&mut b, ids[i], ids[j]);
        }

        let g = b.build().unwrap();
        let view = g.element_graph();
        let chains = view.get_type_chains(PIPE_LIKE, false);
        assert_eq!(chains, vec![vec![ids[0], ids[1]], vec![ids[3], ids[4]]]);

        let with_singles = view.get_type_chains(PIPE_LIKE, true);
        assert_eq!(with_singles.len(), 4);
        assert!(with_singles.contains(&vec![ids[6]]));
    }

    #[test]
    fn ring_is_cut_at_smallest_node() {
        let mut b = NetworkBuilder::new();
        let ids: Vec<_> = (0..4)
            .map(|i| b.add_element(format!("r{i}"), PIPE_SEGMENT))
            .collect();
        for i in 0..4 {
            link(&mut b, ids[i], ids[(i + 1) % 4]);
        }
        let g = b.build().unwrap();
        let chains = g.element_graph().get_type_chains(PIPE_LIKE, false);
        assert_eq!(chains, vec![vec![ids[0], ids[3], ids[2], ids[1]]]);
    }
}
