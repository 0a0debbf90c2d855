use std::collections::{HashMap, VecDeque};

/// Node of a prefix tree over hash values. Each node exclusively owns its
/// children, so dropping the root releases the whole tree.
#[derive(Debug)]
struct Node<I> {
    // Hash value on the edge from the parent; zero for the root.
    hash: i64,
    ids: Vec<I>,
    children: HashMap<i64, Node<I>>,
}

impl<I> Node<I> {
    fn new(hash: i64) -> Self {
        Self {
            hash,
            ids: Vec::new(),
            children: HashMap::new(),
        }
    }
}

/// Prefix tree of the table keys of one hash table.
#[derive(Debug)]
pub struct Tree<I> {
    root: Node<I>,
    // Number of inserts that created a new path.
    paths: usize,
}

impl<I> Default for Tree<I> {
    fn default() -> Self {
        Self {
            root: Node::new(0),
            paths: 0,
        }
    }
}

impl<I: Clone + PartialEq> Tree<I> {
    /// Walks down the tree along key, creating missing nodes,
    /// and appends id to the deepest node.
    pub fn insert(&mut self, key: &[i64], id: I) {
        let mut created = false;
        let mut node = &mut self.root;
        for &hv in key {
            node = node.children.entry(hv).or_insert_with(|| {
                created = true;
                Node::new(hv)
            });
        }
        node.ids.push(id);
        if created {
            self.paths += 1;
        }
    }

    /// Finds the node matching the first `min(level, key.len())` hash
    /// values of key, and collects all the ids in its subtree.
    /// Returns an empty vector if the prefix is absent.
    pub fn lookup(&self, level: usize, key: &[i64]) -> Vec<I> {
        let mut answers = Vec::new();
        if let Some(node) = self.descend(level, key) {
            let mut queue = VecDeque::from([node]);
            while let Some(node) = queue.pop_front() {
                answers.extend_from_slice(&node.ids);
                queue.extend(node.children.values());
            }
        }
        answers
    }

    /// Visits the ids of the same subtree as [`Tree::lookup`] one by one,
    /// stopping as soon as visit returns false.
    pub fn visit<F>(&self, level: usize, key: &[i64], mut visit: F)
    where
        F: FnMut(&I) -> bool,
    {
        let node = match self.descend(level, key) {
            Some(node) => node,
            None => return,
        };
        let mut queue = VecDeque::from([node]);
        while let Some(node) = queue.pop_front() {
            for id in &node.ids {
                if !visit(id) {
                    return;
                }
            }
            queue.extend(node.children.values());
        }
    }

    /// Removes all the occurrences of id. Nodes are kept even if emptied.
    /// Returns the number of removed entries.
    pub fn remove(&mut self, id: &I) -> usize {
        let mut removed = 0;
        let mut stack = vec![&mut self.root];
        while let Some(node) = stack.pop() {
            let before = node.ids.len();
            node.ids.retain(|x| x != id);
            removed += before - node.ids.len();
            stack.extend(node.children.values_mut());
        }
        removed
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn get_paths(&self) -> usize {
        self.paths
    }

    /// Gets the number of nodes including the root.
    pub fn num_nodes(&self) -> usize {
        let mut n = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            n += 1;
            stack.extend(node.children.values());
        }
        n
    }

    fn descend(&self, level: usize, key: &[i64]) -> Option<&Node<I>> {
        let mut node = &self.root;
        for hv in key.iter().take(level) {
            node = node.children.get(hv)?;
            debug_assert_eq!(node.hash, *hv);
        }
        Some(node)
    }
}
