//! Dependency cycle detection
//!
//! Depth-first search with three colors over the declared dependency graph. Every back
//! edge closes one cycle, reported as the path from the target back to itself:
//! `a -> b -> a`, or `a -> a` for a self dependency.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A graph over string ids, nodes and edges kept in insertion order
#[derive(Debug, Default)]
pub struct DependencyGraph<'a> {
    nodes: Vec<&'a str>,
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &'a str) {
        if !self.edges.contains_key(id) {
            self.nodes.push(id);
            self.edges.insert(id, Vec::new());
        }
    }

    /// Edges to ids that are not nodes are ignored by [`find_cycles`](Self::find_cycles)
    pub fn add_edge(&mut self, from: &'a str, to: &'a str) {
        self.add_node(from);
        if let Some(targets) = self.edges.get_mut(from) {
            targets.push(to);
        }
    }

    /// Every cycle closed by a back edge, in discovery order
    ///
    /// The walk keeps its own frame stack, so chain length is bounded by memory only.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut colors: HashMap<&str, Color> =
            self.nodes.iter().map(|id| (*id, Color::White)).collect();
        let mut cycles = Vec::new();

        for &root in &self.nodes {
            if colors.get(root) != Some(&Color::White) {
                continue;
            }

            // (node, index of the next edge to follow)
            let mut frames: Vec<(&'a str, usize)> = vec![(root, 0)];
            let mut on_path: HashMap<&'a str, usize> = HashMap::new();
            colors.insert(root, Color::Gray);
            on_path.insert(root, 0);

            while let Some(frame) = frames.last_mut() {
                let (id, next) = *frame;
                let targets = self.edges.get(id).map(Vec::as_slice).unwrap_or(&[]);

                let Some(&target) = targets.get(next) else {
                    frames.pop();
                    on_path.remove(id);
                    colors.insert(id, Color::Black);
                    continue;
                };
                frame.1 += 1;

                match colors.get(target) {
                    Some(Color::White) => {
                        colors.insert(target, Color::Gray);
                        on_path.insert(target, frames.len());
                        frames.push((target, 0));
                    }
                    Some(Color::Gray) => {
                        if let Some(&start) = on_path.get(target) {
                            let mut path: Vec<String> =
                                frames[start..].iter().map(|(node, _)| node.to_string()).collect();
                            path.push(target.to_string());
                            cycles.push(path);
                        }
                    }
                    Some(Color::Black) | None => {}
                }
            }
        }

        cycles
    }
}
