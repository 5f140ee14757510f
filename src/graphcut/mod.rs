//! Binary labeling of a pixel grid by s-t minimum cut.

pub mod energy;
pub mod maxflow;

pub use energy::{build_graph, mean_neighbor_distance, segment, EdgeWeights};
pub use maxflow::{Dinic, FlowGraph, MaxFlowSolver, MinCut};
