//! Sparse undirected graph over implicit node ids `0..n`.
//!
//! Used to express the "same object" relation between raster regions and to
//! collapse it into groups.

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Default)]
pub struct UndirectedGraph {
    adjacency: Vec<Vec<usize>>,
}

impl UndirectedGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Inserts the edge `i - j`. Self loops are ignored, duplicates are harmless.
    pub fn add_edge(&mut self, i: usize, j: usize) -> Result<()> {
        let len = self.adjacency.len();
        for node in [i, j] {
            if node >= len {
                return Err(EvalError::NodeOutOfRange { node, len });
            }
        }
        if i == j || self.adjacency[i].contains(&j) {
            return Ok(());
        }
        self.adjacency[i].push(j);
        self.adjacency[j].push(i);
        Ok(())
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Partitions every node by reachability.
    ///
    /// Groups come out ordered by their smallest node id and each group's members
    /// are sorted ascending. Isolated nodes form singleton groups.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.adjacency.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();
        let mut stack = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut group = Vec::new();

            while let Some(node) = stack.pop() {
                group.push(node);
                for &next in &self.adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }

            group.sort_unstable();
            components.push(group);
        }

        components
    }
}
