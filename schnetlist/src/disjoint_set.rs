//! Disjoint-set (union-find) helper shared by the connectivity passes.

/// A union-find structure over contiguous `usize` node ids.
///
/// `find` compresses paths but there is no union-by-rank: the sets
/// built here (touching segments on one page, local nets sharing a
/// name) stay small, so the plain variant is good enough.
///
/// Nodes spring into existence on first mention; callers never insert
/// them explicitly.
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    /// Pre-allocate room for `c` nodes.
    pub fn with_capacity(c: usize) -> DisjointSet {
        DisjointSet {
            parent: Vec::with_capacity(c),
        }
    }

    /// Representative of the set holding `u`, growing the node table
    /// as needed.
    fn find(&mut self, u: usize) -> usize {
        if self.parent.len() <= u {
            // nodes mentioned for the first time are their own
            // singleton roots
            self.parent.extend(self.parent.len()..=u);
        }
        let mut root = u;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // second sweep: point the whole chain straight at the root
        let mut cur = u;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Union the sets holding `a` and `b`.
    pub fn merge(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        self.parent[ra] = rb;
    }

    /// Number the sets and return `(set count, node -> set index)`.
    ///
    /// Set indices follow the first member node, so downstream
    /// structures keep the input order.  Consumes the structure;
    /// after numbering there is nothing left to merge.
    pub fn finalize(mut self, num_nodes: usize) -> (usize, Vec<usize>) {
        self.parent.truncate(num_nodes);
        self.parent.extend(self.parent.len()..num_nodes);

        let mut set_indices = vec![usize::MAX; num_nodes];
        let mut num_sets = 0;
        for node in 0..num_nodes {
            let root = self.find(node);
            if set_indices[root] == usize::MAX {
                set_indices[root] = num_sets;
                num_sets += 1;
            }
            set_indices[node] = set_indices[root];
        }

        (num_sets, set_indices)
    }
}

#[test]
fn test_disjoint_set() {
    let mut ds = DisjointSet::with_capacity(8);
    ds.merge(0, 3);
    ds.merge(4, 5);
    ds.merge(5, 0);
    let (num_sets, sets) = ds.finalize(7);
    assert_eq!(num_sets, 4);
    assert_eq!(sets[0], sets[3]);
    assert_eq!(sets[0], sets[4]);
    assert_eq!(sets[0], sets[5]);
    assert_ne!(sets[0], sets[1]);
    assert_ne!(sets[1], sets[2]);
    // set ids follow first appearance
    assert_eq!(sets[0], 0);
    assert_eq!(sets[1], 1);
    assert_eq!(sets[2], 2);
    assert_eq!(sets[6], 3);
}
