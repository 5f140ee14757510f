//! s-t max-flow / min-cut on a pixel graph.
//!
//! [`FlowGraph`] stores one node per pixel, terminal capacities towards the
//! source and the sink, and undirected neighbor edges. [`MaxFlowSolver`]
//! turns it into a [`MinCut`]; [`Dinic`] is the bundled solver.
use crate::error::{CosegError, Result};
use log::debug;
use std::collections::VecDeque;

/// Residual capacities at or below this are treated as saturated.
const EPS: f64 = 1e-10;
const UNREACHED: usize = usize::MAX;

/// Pixel graph with terminal links and undirected neighbor edges.
#[derive(Clone, Debug, Default)]
pub struct FlowGraph {
    source_caps: Vec<f64>,
    sink_caps: Vec<f64>,
    edges: Vec<(usize, usize, f64)>,
}

impl FlowGraph {
    /// `nodes` non-terminal nodes with zero terminal capacity.
    pub fn new(nodes: usize) -> Self {
        Self {
            source_caps: vec![0.0; nodes],
            sink_caps: vec![0.0; nodes],
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.source_caps.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add `source` to the `s → p` link and `sink` to the `p → t` link.
    pub fn add_terminal(&mut self, p: usize, source: f64, sink: f64) -> Result<()> {
        self.check_node(p)?;
        check_capacity(source)?;
        check_capacity(sink)?;
        self.source_caps[p] += source;
        self.sink_caps[p] += sink;
        Ok(())
    }

    /// Undirected edge `a — b` with the same capacity in both directions.
    pub fn add_edge(&mut self, a: usize, b: usize, cap: f64) -> Result<()> {
        self.check_node(a)?;
        self.check_node(b)?;
        check_capacity(cap)?;
        if a != b && cap > 0.0 {
            self.edges.push((a, b, cap));
        }
        Ok(())
    }

    fn check_node(&self, p: usize) -> Result<()> {
        if p >= self.node_count() {
            return Err(CosegError::InvalidEnergy(format!(
                "node {p} outside graph of {} nodes",
                self.node_count()
            )));
        }
        Ok(())
    }
}

fn check_capacity(cap: f64) -> Result<()> {
    if !cap.is_finite() || cap < 0.0 {
        return Err(CosegError::InvalidEnergy(format!(
            "capacity {cap} is not a finite non-negative value"
        )));
    }
    Ok(())
}

/// Result of a min cut: flow value and the side of each node.
#[derive(Clone, Debug, PartialEq)]
pub struct MinCut {
    pub flow: f64,
    /// `true` for nodes still reachable from the source in the residual graph.
    pub source_side: Vec<bool>,
}

impl MinCut {
    pub fn is_sink_side(&self, p: usize) -> bool {
        !self.source_side[p]
    }
}

/// Narrow contract of the max-flow collaborator.
pub trait MaxFlowSolver: Send + Sync {
    fn min_cut(&self, graph: &FlowGraph) -> Result<MinCut>;
}

/// Dinic's blocking-flow algorithm on a residual arc list.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dinic;

/// Arcs are stored in pairs; arc `a ^ 1` is the reverse of arc `a`.
struct Residual {
    head: Vec<Vec<usize>>,
    to: Vec<usize>,
    cap: Vec<f64>,
    source: usize,
    sink: usize,
}

impl Residual {
    fn from_graph(graph: &FlowGraph) -> (Self, f64) {
        let n = graph.node_count();
        let mut r = Residual {
            head: vec![Vec::new(); n + 2],
            to: Vec::with_capacity(2 * (2 * n + graph.edges.len())),
            cap: Vec::with_capacity(2 * (2 * n + graph.edges.len())),
            source: n,
            sink: n + 1,
        };
        // Flow straight through s → p → t never needs a residual path.
        let mut direct = 0.0;
        for p in 0..n {
            let (s, t) = (graph.source_caps[p], graph.sink_caps[p]);
            let through = s.min(t);
            direct += through;
            if s - through > EPS {
                r.push_pair(r.source, p, s - through, 0.0);
            }
            if t - through > EPS {
                r.push_pair(p, r.sink, t - through, 0.0);
            }
        }
        for &(a, b, c) in &graph.edges {
            r.push_pair(a, b, c, c);
        }
        (r, direct)
    }

    fn push_pair(&mut self, a: usize, b: usize, forward: f64, backward: f64) {
        self.head[a].push(self.to.len());
        self.to.push(b);
        self.cap.push(forward);
        self.head[b].push(self.to.len());
        self.to.push(a);
        self.cap.push(backward);
    }

    /// BFS levels from the source; `None` when the sink is unreachable.
    fn levels(&self) -> Option<Vec<usize>> {
        let mut level = vec![UNREACHED; self.head.len()];
        let mut queue = VecDeque::new();
        level[self.source] = 0;
        queue.push_back(self.source);
        while let Some(u) = queue.pop_front() {
            for &a in &self.head[u] {
                let v = self.to[a];
                if self.cap[a] > EPS && level[v] == UNREACHED {
                    level[v] = level[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        (level[self.sink] != UNREACHED).then_some(level)
    }

    /// One augmenting path in the level graph, iteratively; returns its flow.
    fn augment(&mut self, level: &mut [usize], next: &mut [usize]) -> f64 {
        let mut path: Vec<usize> = Vec::new();
        let mut u = self.source;
        loop {
            if u == self.sink {
                let push = path
                    .iter()
                    .map(|&a| self.cap[a])
                    .fold(f64::INFINITY, f64::min);
                for &a in &path {
                    self.cap[a] -= push;
                    self.cap[a ^ 1] += push;
                }
                return push;
            }
            let mut advanced = false;
            while next[u] < self.head[u].len() {
                let a = self.head[u][next[u]];
                let v = self.to[a];
                if self.cap[a] > EPS && level[v] == level[u] + 1 {
                    path.push(a);
                    u = v;
                    advanced = true;
                    break;
                }
                next[u] += 1;
            }
            if !advanced {
                // Dead end: prune the node and step back.
                level[u] = UNREACHED;
                match path.pop() {
                    None => return 0.0,
                    Some(a) => {
                        u = self.to[a ^ 1];
                        next[u] += 1;
                    }
                }
            }
        }
    }

    fn source_reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.head.len()];
        let mut queue = VecDeque::from([self.source]);
        seen[self.source] = true;
        while let Some(u) = queue.pop_front() {
            for &a in &self.head[u] {
                let v = self.to[a];
                if self.cap[a] > EPS && !seen[v] {
                    seen[v] = true;
                    queue.push_back(v);
                }
            }
        }
        seen
    }
}

impl MaxFlowSolver for Dinic {
    fn min_cut(&self, graph: &FlowGraph) -> Result<MinCut> {
        let n = graph.node_count();
        let (mut residual, mut flow) = Residual::from_graph(graph);
        let mut phases = 0usize;
        while let Some(mut level) = residual.levels() {
            phases += 1;
            let mut next = vec![0usize; residual.head.len()];
            loop {
                let pushed = residual.augment(&mut level, &mut next);
                if pushed <= EPS {
                    break;
                }
                flow += pushed;
            }
        }
        let mut source_side = residual.source_reachable();
        source_side.truncate(n);
        debug!(
            "Dinic: nodes={n} edges={} phases={phases} flow={flow:.4}",
            graph.edge_count()
        );
        Ok(MinCut { flow, source_side })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_node_goes_to_cheaper_side() {
        let mut g = FlowGraph::new(2);
        g.add_terminal(0, 5.0, 1.0).unwrap();
        g.add_terminal(1, 1.0, 5.0).unwrap();
        let cut = Dinic.min_cut(&g).unwrap();
        assert_relative_eq!(cut.flow, 2.0, epsilon = 1e-12);
        assert!(cut.source_side[0]);
        assert!(cut.is_sink_side(1));
    }

    #[test]
    fn chain_flow_matches_bottleneck() {
        // s -> 0 (4), 0 - 1 (2), 1 -> t (3)
        let mut g = FlowGraph::new(2);
        g.add_terminal(0, 4.0, 0.0).unwrap();
        g.add_terminal(1, 0.0, 3.0).unwrap();
        g.add_edge(0, 1, 2.0).unwrap();
        let cut = Dinic.min_cut(&g).unwrap();
        assert_relative_eq!(cut.flow, 2.0, epsilon = 1e-12);
        assert_eq!(cut.source_side, vec![true, false]);
    }

    #[test]
    fn strong_edge_merges_labels() {
        let mut g = FlowGraph::new(2);
        g.add_terminal(0, 3.0, 1.0).unwrap();
        g.add_terminal(1, 1.0, 2.0).unwrap();
        g.add_edge(0, 1, 100.0).unwrap();
        let cut = Dinic.min_cut(&g).unwrap();
        // Both on the source side costs 1 + 2 = 3; both on the sink side 3 + 1 = 4.
        assert_relative_eq!(cut.flow, 3.0, epsilon = 1e-9);
        assert_eq!(cut.source_side, vec![true, true]);
    }

    #[test]
    fn rejects_bad_capacities() {
        let mut g = FlowGraph::new(1);
        assert!(g.add_terminal(0, -1.0, 0.0).is_err());
        assert!(g.add_terminal(0, f64::NAN, 0.0).is_err());
        assert!(g.add_edge(0, 3, 1.0).is_err());
    }
}
