//! Generic directed-graph utility.
//!
//! Cycle detection, transpose, reachability closure and topological sorting
//! over an arbitrary directed graph keyed by opaque vertex identity. Used to
//! derive the structural flags of record-like types.
//!
//! Traversals are iterative — an explicit stack of enter/exit markers with
//! parent links held in an entry arena — so arbitrarily deep graphs cannot
//! overflow the call stack. Vertex and adjacency order are preserved from
//! insertion order, which makes every result deterministic for a stable
//! input order.

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A directed graph over vertices of type `T`.
#[derive(Debug, Clone)]
pub struct DirGraph<T> {
    verts: Vec<T>,
    adj: Vec<Vec<usize>>,
    index: FxHashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> Default for DirGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> DirGraph<T> {
    pub fn new() -> DirGraph<T> {
        DirGraph {
            verts: Vec::new(),
            adj: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Add a vertex; idempotent. Returns its index.
    pub fn add_vertex(&mut self, v: T) -> usize {
        if let Some(&i) = self.index.get(&v) {
            return i;
        }
        let i = self.verts.len();
        self.index.insert(v.clone(), i);
        self.verts.push(v);
        self.adj.push(Vec::new());
        i
    }

    /// Add an edge, adding missing vertices as needed.
    pub fn add_edge(&mut self, from: T, to: T) {
        let f = self.add_vertex(from);
        let t = self.add_vertex(to);
        self.adj[f].push(t);
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Some, not all cycles: at least one reported cycle per cyclic vertex.
    pub fn find_cycles(&self) -> Vec<Vec<T>> {
        struct Entry {
            vert: usize,
            enter: bool,
            parent: Option<usize>,
        }

        let mut arena: Vec<Entry> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut visiting = vec![false; self.verts.len()];
        let mut visited = vec![false; self.verts.len()];
        let mut cycles = Vec::new();

        for v in 0..self.verts.len() {
            arena.push(Entry {
                vert: v,
                enter: true,
                parent: None,
            });
            queue.push_back(arena.len() - 1);
        }

        while let Some(id) = queue.pop_front() {
            let (vert, enter, parent) = {
                let e = &arena[id];
                (e.vert, e.enter, e.parent)
            };

            if !enter {
                assert!(visiting[vert]);
                visiting[vert] = false;
                assert!(!visited[vert]);
                visited[vert] = true;
                continue;
            } else if visited[vert] {
                assert!(!visiting[vert]);
                continue;
            } else if visiting[vert] {
                // re-entered a vertex currently on the path: recover the
                // cycle by walking parent links back to it
                let mut cycle = vec![self.verts[vert].clone()];
                let mut cur = parent;
                loop {
                    let p = cur.expect("cycle entry without parent");
                    let pe = &arena[p];
                    if pe.vert == vert {
                        break;
                    }
                    cycle.push(self.verts[pe.vert].clone());
                    cur = pe.parent;
                }
                cycles.push(cycle);
                continue;
            }

            arena.push(Entry {
                vert,
                enter: false,
                parent,
            });
            queue.push_front(arena.len() - 1);
            visiting[vert] = true;

            for &a in &self.adj[vert] {
                arena.push(Entry {
                    vert: a,
                    enter: true,
                    parent: Some(id),
                });
                queue.push_front(arena.len() - 1);
            }
        }

        cycles
    }

    /// Exactly the set of vertices reachable from themselves via a nonempty
    /// path, in first-reported order.
    pub fn find_cyclic_vertices(&self) -> Vec<T> {
        let mut seen = FxHashMap::default();
        let mut res = Vec::new();
        for cycle in self.find_cycles() {
            for v in cycle {
                if seen.insert(v.clone(), ()).is_none() {
                    res.push(v);
                }
            }
        }
        res
    }

    /// The graph with every edge reversed; vertex order is preserved.
    pub fn transpose(&self) -> DirGraph<T> {
        let mut res = DirGraph::new();
        for v in &self.verts {
            res.add_vertex(v.clone());
        }
        for (f, adj) in self.adj.iter().enumerate() {
            for &t in adj {
                res.adj[t].push(f);
            }
        }
        res
    }

    /// All vertices reachable from `seeds` (including the seeds).
    pub fn closure(&self, seeds: &[T]) -> Vec<T> {
        let mut queue: VecDeque<usize> = seeds
            .iter()
            .map(|s| *self.index.get(s).expect("closure seed not in graph"))
            .collect();
        let mut visited = vec![false; self.verts.len()];
        let mut res = Vec::new();

        while let Some(v) = queue.pop_front() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            res.push(self.verts[v].clone());
            for &a in &self.adj[v] {
                queue.push_back(a);
            }
        }

        res
    }

    /// Topological order: for every edge u→v, v precedes u (dependencies
    /// first). Panics when the graph contains a cycle — callers must run
    /// [`DirGraph::find_cycles`] first and report a user error before
    /// sorting; reaching this with a cyclic graph is a programming error.
    pub fn topological_sort(&self) -> Vec<T> {
        struct Entry {
            vert: usize,
            enter: bool,
        }

        let mut queue: VecDeque<Entry> = VecDeque::new();
        let mut visiting = vec![false; self.verts.len()];
        let mut visited = vec![false; self.verts.len()];
        let mut result = Vec::new();

        for v in 0..self.verts.len() {
            queue.push_back(Entry {
                vert: v,
                enter: true,
            });
        }

        while let Some(e) = queue.pop_front() {
            if !e.enter {
                assert!(visiting[e.vert]);
                visiting[e.vert] = false;
                assert!(!visited[e.vert]);
                visited[e.vert] = true;
                result.push(self.verts[e.vert].clone());
                continue;
            } else if visited[e.vert] {
                assert!(!visiting[e.vert]);
                continue;
            }

            assert!(!visiting[e.vert], "topological_sort on a cyclic graph");
            queue.push_front(Entry {
                vert: e.vert,
                enter: false,
            });
            visiting[e.vert] = true;

            for &a in &self.adj[e.vert] {
                queue.push_front(Entry {
                    vert: a,
                    enter: true,
                });
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)], verts: &[&str]) -> DirGraph<String> {
        let mut g = DirGraph::new();
        for v in verts {
            g.add_vertex(v.to_string());
        }
        for (f, t) in edges {
            g.add_edge(f.to_string(), t.to_string());
        }
        g
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")], &["a", "b", "c"]);
        assert!(g.find_cycles().is_empty());
        assert!(g.find_cyclic_vertices().is_empty());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&[("a", "a")], &["a"]);
        let cycles = g.find_cycles();
        assert_eq!(cycles, vec![vec!["a".to_string()]]);
        assert_eq!(g.find_cyclic_vertices(), vec!["a".to_string()]);
    }

    #[test]
    fn two_cycle_members_are_all_reported() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c")], &["a", "b", "c"]);
        let cyclic = g.find_cyclic_vertices();
        assert_eq!(cyclic.len(), 2);
        assert!(cyclic.contains(&"a".to_string()));
        assert!(cyclic.contains(&"b".to_string()));
        assert!(!cyclic.contains(&"c".to_string()));
    }

    #[test]
    fn topological_sort_puts_dependencies_first() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")], &["a", "b", "c"]);
        let order = g.topological_sort();
        assert_eq!(order.len(), 3);
        let pos = |v: &str| order.iter().position(|x| x == v).unwrap();
        // for every edge u->v, v precedes u
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("b"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    #[should_panic(expected = "cyclic graph")]
    fn topological_sort_panics_on_cycle() {
        let g = graph(&[("a", "b"), ("b", "a")], &["a", "b"]);
        g.topological_sort();
    }

    #[test]
    fn transpose_reverses_edges() {
        let g = graph(&[("a", "b"), ("b", "c")], &["a", "b", "c"]);
        let t = g.transpose();
        // in the transposed graph, closure from "c" reaches everything
        let r = t.closure(&["c".to_string()]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn closure_includes_seeds_and_reachable() {
        let g = graph(&[("a", "b"), ("b", "c"), ("d", "a")], &["a", "b", "c", "d"]);
        let r = g.closure(&["a".to_string()]);
        assert_eq!(r, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn diamond_is_acyclic() {
        let g = graph(
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            &["a", "b", "c", "d"],
        );
        assert!(g.find_cyclic_vertices().is_empty());
        let order = g.topological_sort();
        let pos = |v: &str| order.iter().position(|x| x == v).unwrap();
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
    }
}
