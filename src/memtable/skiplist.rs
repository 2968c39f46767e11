use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::options::Options;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// A node gets one more level with probability 1/BRANCHING.
const BRANCHING: u32 = 4;

/// Handle of a node in the node table.
///
/// Links are stored as `Option<NodeId>`, so "no successor" is `None` and
/// never aliases the head sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const HEAD: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

/// Fixed-layout node metadata.
///
/// Key and value bytes live back to back in the arena at `kv_offset`.
/// The node's forward links occupy `links[first_link..first_link + height]`.
/// An unlinked node keeps its stale links, so `unlinked` marks it dead.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
#[derive(Debug, Clone, Copy)]
struct Node {
    kv_offset: usize,
    key_len: usize,
    val_len: usize,
    height: usize,
    first_link: usize,
    unlinked: bool,
}

/// A probabilistic sorted map over an append-only arena.
///
/// Key/value bytes are appended to one growable buffer and never reclaimed:
/// overwriting a key appends the new bytes and repoints the node, deleting
/// a key unlinks its node and leaves the bytes behind. `size` counts live
/// bytes only, `capacity`/`free` describe the arena.
///
/// This type is single-threaded. Write-mode searches record predecessors in
/// a scratch array owned by the list, which is why every mutation takes
/// `&mut self`; [`MemTable`](super::MemTable) puts it behind a lock.
///
/// Average case: O(log n) insert, O(log n) lookup, O(n) iteration.
pub struct SkipList<C> {
    cmp: C,
    seed: u64,
    rng: StdRng,
    height_cap: usize,

    arena: Vec<u8>,
    nodes: Vec<Node>,
    links: Vec<Option<NodeId>>,
    // Predecessor per level from the last write-mode search. Only meaningful
    // between `find_splice` and the end of the same put/delete.
    prev: [NodeId; MAX_HEIGHT],

    height: usize,
    len: usize,
    kv_size: usize,
    generation: u64,
}

impl<C: Comparator> SkipList<C> {
    /// Create an empty list with default options.
    pub fn new(cmp: C) -> Self {
        Self::build(cmp, &Options::default())
    }

    /// Create an empty list with default options and the given arena capacity.
    pub fn with_capacity(cmp: C, capacity: usize) -> Self {
        Self::build(cmp, &Options::default().with_capacity(capacity))
    }

    /// Create an empty list with validated options.
    pub fn with_options(cmp: C, opts: &Options) -> Result<Self> {
        opts.validate()?;
        Ok(Self::build(cmp, opts))
    }

    fn build(cmp: C, opts: &Options) -> Self {
        let height_cap = opts.max_height;
        SkipList {
            cmp,
            seed: opts.seed,
            rng: StdRng::seed_from_u64(opts.seed),
            height_cap,
            arena: Vec::with_capacity(opts.capacity),
            nodes: vec![Node {
                kv_offset: 0,
                key_len: 0,
                val_len: 0,
                height: height_cap,
                first_link: 0,
                unlinked: false,
            }],
            links: vec![None; height_cap],
            prev: [NodeId::HEAD; MAX_HEIGHT],
            height: 1,
            len: 0,
            kv_size: 0,
            generation: 0,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Insert a key-value pair. Overwrites if the key already exists.
    ///
    /// Algorithm:
    ///   1. Find the insertion point at each level (track predecessors)
    ///   2. Generate a random height for the new node
    ///   3. Append key/value to the arena and the node to the node table
    ///   4. Splice into the list at each level up to the node's height
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        if let (Some(node), true) = self.find_splice(key) {
            let kv_offset = self.append_kv(key, value);
            let n = &mut self.nodes[node.index()];
            self.kv_size = self.kv_size - (n.key_len + n.val_len) + key.len() + value.len();
            n.kv_offset = kv_offset;
            n.key_len = key.len();
            n.val_len = value.len();
            return;
        }

        let h = self.random_height();
        if h > self.height {
            for level in self.height..h {
                self.prev[level] = NodeId::HEAD;
            }
            self.height = h;
        }

        let kv_offset = self.append_kv(key, value);
        let id = NodeId(self.nodes.len());
        let first_link = self.links.len();
        self.nodes.push(Node {
            kv_offset,
            key_len: key.len(),
            val_len: value.len(),
            height: h,
            first_link,
            unlinked: false,
        });
        for level in 0..h {
            let slot = self.link_slot(self.prev[level], level);
            let succ = self.links[slot];
            self.links.push(succ);
            self.links[slot] = Some(id);
        }

        self.kv_size += key.len() + value.len();
        self.len += 1;
    }

    /// Unlink the node holding `key` from every level it is on.
    ///
    /// The arena bytes stay where they are. Fails with `NotFound` if the key
    /// is absent.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let node = match self.find_splice(key) {
            (Some(node), true) => node,
            _ => return Err(Error::NotFound),
        };

        let Node {
            key_len,
            val_len,
            height,
            ..
        } = self.nodes[node.index()];
        for level in 0..height {
            let slot = self.link_slot(self.prev[level], level);
            self.links[slot] = self.link(node, level);
        }
        self.nodes[node.index()].unlinked = true;

        self.kv_size -= key_len + val_len;
        self.len -= 1;
        Ok(())
    }

    /// Look up the value stored under exactly `key`.
    pub fn get(&self, key: &[u8]) -> Result<&[u8]> {
        match self.find_ge(key) {
            (Some(node), true) => Ok(self.node_value(node)),
            _ => Err(Error::NotFound),
        }
    }

    /// First entry whose key is >= `key`.
    pub fn find(&self, key: &[u8]) -> Result<(&[u8], &[u8])> {
        match self.find_ge(key) {
            (Some(node), _) => Ok((self.node_key(node), self.node_value(node))),
            (None, _) => Err(Error::NotFound),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.find_ge(key).1
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live key+value bytes. Deleted and overwritten bytes are not counted.
    pub fn size(&self) -> usize {
        self.kv_size
    }

    /// Arena capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Arena bytes available before the next reallocation.
    pub fn free(&self) -> usize {
        self.arena.capacity() - self.arena.len()
    }

    /// Current number of levels in use.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Back to the empty state, keeping the arena and node table allocations.
    /// The height RNG is reseeded so the same workload reproduces the same shape.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.height = 1;
        self.len = 0;
        self.kv_size = 0;
        self.arena.clear();
        self.nodes.truncate(1);
        self.links.truncate(self.height_cap);
        self.links.fill(None);
        self.prev = [NodeId::HEAD; MAX_HEIGHT];
        self.generation += 1;
    }

    /// Iterate live entries in order by following level 0.
    pub fn iter(&self) -> SkipListIter<'_, C> {
        SkipListIter {
            list: self,
            node: self.link(NodeId::HEAD, 0),
        }
    }

    /// Each level has a 1/4 probability of extending the tower
    /// (LevelDB uses 1/4, not 1/2).
    fn random_height(&mut self) -> usize {
        let mut h = 1;
        while h < self.height_cap && self.rng.gen_ratio(1, BRANCHING) {
            h += 1;
        }
        h
    }

    fn append_kv(&mut self, key: &[u8], value: &[u8]) -> usize {
        let offset = self.arena.len();
        self.arena.extend_from_slice(key);
        self.arena.extend_from_slice(value);
        offset
    }

    #[inline]
    fn link_slot(&self, node: NodeId, level: usize) -> usize {
        self.nodes[node.index()].first_link + level
    }

    #[inline]
    fn link(&self, node: NodeId, level: usize) -> Option<NodeId> {
        self.links[self.link_slot(node, level)]
    }

    #[inline]
    pub(crate) fn node_key(&self, node: NodeId) -> &[u8] {
        let n = &self.nodes[node.index()];
        &self.arena[n.kv_offset..n.kv_offset + n.key_len]
    }

    #[inline]
    pub(crate) fn node_value(&self, node: NodeId) -> &[u8] {
        let n = &self.nodes[node.index()];
        let start = n.kv_offset + n.key_len;
        &self.arena[start..start + n.val_len]
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.link(NodeId::HEAD, 0)
    }

    pub(crate) fn next_node(&self, node: NodeId) -> Option<NodeId> {
        self.link(node, 0)
    }

    /// False once `delete` has unlinked the node. Its links are stale then.
    pub(crate) fn is_linked(&self, node: NodeId) -> bool {
        !self.nodes[node.index()].unlinked
    }

    /// Read-mode search for the first node >= `key`. Returns early on an
    /// exact match found at any level.
    pub(crate) fn find_ge(&self, key: &[u8]) -> (Option<NodeId>, bool) {
        let mut node = NodeId::HEAD;
        let mut level = self.height - 1;
        loop {
            let next = self.link(node, level);
            let ord = next.map_or(Ordering::Greater, |n| self.cmp.compare(self.node_key(n), key));
            match (next, ord) {
                (Some(n), Ordering::Less) => node = n,
                (Some(_), Ordering::Equal) => return (next, true),
                _ => {
                    if level == 0 {
                        return (next, false);
                    }
                    level -= 1;
                }
            }
        }
    }

    /// Write-mode search: same walk as `find_ge`, but always descends to
    /// level 0 and records the last node before the target on every level.
    fn find_splice(&mut self, key: &[u8]) -> (Option<NodeId>, bool) {
        let mut node = NodeId::HEAD;
        let mut level = self.height - 1;
        loop {
            let next = self.link(node, level);
            let ord = next.map_or(Ordering::Greater, |n| self.cmp.compare(self.node_key(n), key));
            match (next, ord) {
                (Some(n), Ordering::Less) => node = n,
                _ => {
                    self.prev[level] = node;
                    if level == 0 {
                        return (next, ord == Ordering::Equal);
                    }
                    level -= 1;
                }
            }
        }
    }

    /// First node whose key is > `key`.
    pub(crate) fn find_gt(&self, key: &[u8]) -> Option<NodeId> {
        let mut node = NodeId::HEAD;
        let mut level = self.height - 1;
        loop {
            let next = self.link(node, level);
            match next {
                Some(n) if self.cmp.compare(self.node_key(n), key) != Ordering::Greater => node = n,
                _ => {
                    if level == 0 {
                        return next;
                    }
                    level -= 1;
                }
            }
        }
    }

    /// Last node whose key is < `key`.
    pub(crate) fn find_lt(&self, key: &[u8]) -> Option<NodeId> {
        let mut node = NodeId::HEAD;
        let mut level = self.height - 1;
        loop {
            match self.link(node, level) {
                Some(n) if self.cmp.compare(self.node_key(n), key) == Ordering::Less => node = n,
                _ => {
                    if level == 0 {
                        break;
                    }
                    level -= 1;
                }
            }
        }
        (node != NodeId::HEAD).then_some(node)
    }

    pub(crate) fn find_last(&self) -> Option<NodeId> {
        let mut node = NodeId::HEAD;
        let mut level = self.height - 1;
        loop {
            match self.link(node, level) {
                Some(n) => node = n,
                None => {
                    if level == 0 {
                        break;
                    }
                    level -= 1;
                }
            }
        }
        (node != NodeId::HEAD).then_some(node)
    }
}

/// Iterator over skip list entries in sorted order.
///
/// Simply follows level 0 forward links — level 0 is a sorted linked list
/// containing every live entry.
pub struct SkipListIter<'a, C> {
    list: &'a SkipList<C>,
    node: Option<NodeId>,
}

impl<'a, C: Comparator> Iterator for SkipListIter<'a, C> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = self.list.next_node(node);
        Some((self.list.node_key(node), self.list.node_value(node)))
    }
}
