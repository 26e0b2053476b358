use crate::error::{Result, SkipListError};
use crate::options::Options;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt::{self, Debug};
use std::iter::FromIterator;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace, warn};

pub const DEFAULT_MAX_LEVELS: usize = 12;

// Slot index of the sentinel. A link equal to this is "no further element".
const SENTINEL: usize = usize::MAX;

// Stamped into handles so a handle from one list is never accepted by another.
static NEXT_LIST_ID: AtomicU32 = AtomicU32::new(1);

fn next_list_id() -> u32 {
    NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a node of a [`SkipList`].
///
/// Handles stay cheap to copy and never borrow the list. A handle whose node
/// has been deleted (or that belongs to another list) is rejected by every
/// operation that takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    list: u32,
    slot: usize,
    generation: u32,
}

impl NodeRef {
    /// The sentinel: returned by [`SkipList::find_last_less_than`] when no
    /// smaller key exists.
    pub const SENTINEL: NodeRef = NodeRef {
        list: 0,
        slot: SENTINEL,
        generation: 0,
    };

    pub fn is_sentinel(self) -> bool {
        self.slot == SENTINEL
    }
}

#[derive(Clone, Copy)]
struct Links<const L: usize> {
    next: usize,
    // lanes[i] is Some iff the node was promoted to express lane i
    lanes: [Option<usize>; L],
}

impl<const L: usize> Links<L> {
    fn circular() -> Self {
        Self {
            next: SENTINEL,
            lanes: [Some(SENTINEL); L],
        }
    }
}

struct SkipNode<K, V, const L: usize> {
    key: K,
    val: V,
    links: Links<L>,
}

struct Slot<K, V, const L: usize> {
    generation: u32,
    node: Option<SkipNode<K, V, L>>,
}

/// Result of a descent: the last node before the target on every express
/// lane, plus the one on the base chain.
struct Predecessors<const L: usize> {
    lanes: [usize; L],
    base: usize,
}

/// An ordered multimap built from one base chain and `MAX_LEVELS` express
/// lanes, all of them circular through a shared sentinel.
///
/// ```text
/// lane 1:  S ────────────► 20 ──────────────► S
/// lane 0:  S ──► 10 ─────► 20 ──► 35 ───────► S
/// base:    S ──► 10 ─► 15 ► 20 ──► 35 ──► 50 ► S
/// ```
///
/// Nodes live in an arena of slots and are addressed by [`NodeRef`].
pub struct SkipList<K, V, const MAX_LEVELS: usize = DEFAULT_MAX_LEVELS> {
    id: u32,
    head: Links<MAX_LEVELS>,
    highest_active_level: usize,
    slots: Vec<Slot<K, V, MAX_LEVELS>>,
    free: Vec<usize>,
    len: usize,
    probability: f64,
    rng: StdRng,
}

impl<K, V, const MAX_LEVELS: usize> SkipList<K, V, MAX_LEVELS> {
    /// Creates an empty list promoting nodes with probability `probability`.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is not in `(0, 1]` or `MAX_LEVELS` is zero.
    pub fn new(probability: f64) -> Self {
        assert!(
            probability > 0.0 && probability <= 1.0,
            "probability must be in (0, 1]"
        );
        Self::from_parts(probability, StdRng::from_entropy())
    }

    pub fn with_options(options: Options) -> Result<Self> {
        options.validate()?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::from_parts(options.probability, rng))
    }

    fn from_parts(probability: f64, rng: StdRng) -> Self {
        assert!(MAX_LEVELS > 0);
        Self {
            id: next_list_id(),
            head: Links::circular(),
            highest_active_level: MAX_LEVELS - 1,
            slots: vec![],
            free: vec![],
            len: 0,
            probability,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn max_levels(&self) -> usize {
        MAX_LEVELS
    }

    /// Highest express lane searched and promoted into. Fixed at
    /// `MAX_LEVELS - 1`.
    pub fn highest_active_level(&self) -> usize {
        self.highest_active_level
    }

    /// Drops every node. Handles issued before the call become invalid.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = Links::circular();
        self.len = 0;
        self.id = next_list_id();
        debug!("skip list cleared");
    }

    pub fn key(&self, node: NodeRef) -> Option<&K> {
        self.resolve(node).map(|n| &n.key)
    }

    pub fn value(&self, node: NodeRef) -> Option<&V> {
        self.resolve(node).map(|n| &n.val)
    }

    pub fn value_mut(&mut self, node: NodeRef) -> Option<&mut V> {
        self.resolve_mut(node).map(|n| &mut n.val)
    }

    pub fn entry(&self, node: NodeRef) -> Option<(&K, &V)> {
        self.resolve(node).map(|n| (&n.key, &n.val))
    }

    /// First node of the base chain.
    pub fn first(&self) -> Option<NodeRef> {
        self.successor(NodeRef::SENTINEL)
    }

    /// Next node on the base chain. The sentinel's successor is the first node.
    pub fn successor(&self, node: NodeRef) -> Option<NodeRef> {
        let links = if node.is_sentinel() {
            &self.head
        } else {
            &self.resolve(node)?.links
        };
        match links.next {
            SENTINEL => None,
            next => Some(self.handle(next)),
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V, MAX_LEVELS> {
        Iter {
            list: self,
            pos: SENTINEL,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Keys reachable on express lane `level`, in order.
    ///
    /// # Panics
    ///
    /// Panics if `level >= MAX_LEVELS`.
    pub fn lane_keys(&self, level: usize) -> LaneKeys<'_, K, V, MAX_LEVELS> {
        assert!(level < MAX_LEVELS, "lane {} out of range", level);
        LaneKeys {
            list: self,
            level,
            pos: SENTINEL,
        }
    }

    fn handle(&self, slot: usize) -> NodeRef {
        if slot == SENTINEL {
            return NodeRef::SENTINEL;
        }
        NodeRef {
            list: self.id,
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn resolve(&self, node: NodeRef) -> Option<&SkipNode<K, V, MAX_LEVELS>> {
        if node.is_sentinel() || node.list != self.id {
            return None;
        }
        let slot = self.slots.get(node.slot)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn resolve_mut(&mut self, node: NodeRef) -> Option<&mut SkipNode<K, V, MAX_LEVELS>> {
        if node.is_sentinel() || node.list != self.id {
            return None;
        }
        let slot = self.slots.get_mut(node.slot)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn node(&self, slot: usize) -> &SkipNode<K, V, MAX_LEVELS> {
        match &self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("link to vacant slot {}", slot),
        }
    }

    fn links(&self, slot: usize) -> &Links<MAX_LEVELS> {
        if slot == SENTINEL {
            &self.head
        } else {
            &self.node(slot).links
        }
    }

    fn links_mut(&mut self, slot: usize) -> &mut Links<MAX_LEVELS> {
        if slot == SENTINEL {
            return &mut self.head;
        }
        match &mut self.slots[slot].node {
            Some(node) => &mut node.links,
            None => unreachable!("link to vacant slot {}", slot),
        }
    }

    fn alloc(&mut self, node: SkipNode<K, V, MAX_LEVELS>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> SkipNode<K, V, MAX_LEVELS> {
        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        let node = match entry.node.take() {
            Some(node) => node,
            None => unreachable!("double release of slot {}", slot),
        };
        self.free.push(slot);
        node
    }
}

impl<K: Ord, V, const MAX_LEVELS: usize> SkipList<K, V, MAX_LEVELS> {
    fn locate(&self, key: &K) -> Predecessors<MAX_LEVELS> {
        let mut preds = Predecessors {
            lanes: [SENTINEL; MAX_LEVELS],
            base: SENTINEL,
        };
        let mut pos = SENTINEL;
        for level in (0..=self.highest_active_level).rev() {
            while let Some(next) = self.links(pos).lanes[level] {
                if next == SENTINEL || self.node(next).key >= *key {
                    break;
                }
                pos = next;
            }
            preds.lanes[level] = pos;
        }
        // confirmation pass along the base chain
        loop {
            let next = self.links(pos).next;
            if next == SENTINEL || self.node(next).key >= *key {
                break;
            }
            pos = next;
        }
        preds.base = pos;
        trace!(base = preds.base, "located predecessors");
        preds
    }

    /// Inserts a new node, keeping any existing nodes with an equal key.
    ///
    /// The node lands right after the greatest key strictly less than `key`,
    /// i.e. in front of older duplicates.
    pub fn insert(&mut self, key: K, val: V) -> NodeRef {
        let preds = self.locate(&key);
        let next = self.links(preds.base).next;
        let slot = self.alloc(SkipNode {
            key,
            val,
            links: Links {
                next,
                lanes: [None; MAX_LEVELS],
            },
        });
        self.links_mut(preds.base).next = slot;

        // stop at the first failed draw so promotions stay contiguous
        let mut height = 0;
        for level in 0..=self.highest_active_level {
            if self.rng.gen::<f64>() > self.probability {
                break;
            }
            let pred = preds.lanes[level];
            let succ = self.links(pred).lanes[level];
            self.links_mut(slot).lanes[level] = succ;
            self.links_mut(pred).lanes[level] = Some(slot);
            height += 1;
        }

        self.len += 1;
        debug!(slot, height, len = self.len, "inserted node");
        self.handle(slot)
    }

    /// Unlinks `node` from every chain and hands back its entry.
    ///
    /// Fails without touching the structure if `node` is the sentinel or is
    /// not linked into this list.
    pub fn delete(&mut self, node: NodeRef) -> Result<(K, V)> {
        if node.is_sentinel() {
            warn!("refused to delete the sentinel");
            return Err(SkipListError::InvalidSentinelOperation);
        }
        if self.resolve(node).is_none() {
            warn!(?node, "delete of stale or foreign node");
            return Err(SkipListError::NodeNotFound);
        }
        let target = node.slot;
        let preds = match self.predecessors_of(target) {
            Some(preds) => preds,
            None => {
                warn!(?node, "node not reachable from the sentinel");
                return Err(SkipListError::NodeNotFound);
            }
        };

        let next = self.links(target).next;
        self.links_mut(preds.base).next = next;
        for level in 0..=self.highest_active_level {
            let pred = preds.lanes[level];
            if self.links(pred).lanes[level] == Some(target) {
                let succ = self.links(target).lanes[level];
                self.links_mut(pred).lanes[level] = succ;
            }
        }

        let removed = self.release(target);
        self.len -= 1;
        debug!(slot = target, len = self.len, "deleted node");
        Ok((removed.key, removed.val))
    }

    // Descends with strict `<`, then on every chain walks across equal keys
    // until the identical node. Starting each walk from the strict predecessor
    // keeps a taller duplicate behind the target from carrying the search
    // past it.
    fn predecessors_of(&self, target: usize) -> Option<Predecessors<MAX_LEVELS>> {
        let mut preds = self.locate(&self.node(target).key);
        for level in 0..=self.highest_active_level {
            preds.lanes[level] = self.seek(preds.lanes[level], target, |l| l.lanes[level]);
        }
        preds.base = self.seek(preds.base, target, |l| Some(l.next));
        if self.links(preds.base).next == target {
            Some(preds)
        } else {
            None
        }
    }

    fn seek<F>(&self, mut pos: usize, target: usize, step: F) -> usize
    where
        F: Fn(&Links<MAX_LEVELS>) -> Option<usize>,
    {
        let key = &self.node(target).key;
        while let Some(next) = step(self.links(pos)) {
            if next == SENTINEL || next == target || self.node(next).key > *key {
                break;
            }
            pos = next;
        }
        pos
    }

    /// The node with the greatest key strictly less than `key`, or
    /// [`NodeRef::SENTINEL`] if there is none.
    pub fn find_last_less_than(&self, key: &K) -> NodeRef {
        self.handle(self.locate(key).base)
    }

    /// The first node holding exactly `key`. With duplicates this is the most
    /// recently inserted one.
    pub fn find_first(&self, key: &K) -> Option<NodeRef> {
        let pred = self.find_last_less_than(key);
        match self.links(pred.slot).next {
            SENTINEL => None,
            next if self.node(next).key == *key => Some(self.handle(next)),
            _ => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find_first(key).and_then(|n| self.value(n))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.find_first(key)?;
        self.value_mut(node)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_first(key).is_some()
    }

    /// Deletes the node [`find_first`](Self::find_first) would return.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node = self.find_first(key)?;
        self.delete(node).ok().map(|(_, v)| v)
    }
}

impl<K: Ord, V, const MAX_LEVELS: usize> Default for SkipList<K, V, MAX_LEVELS> {
    fn default() -> Self {
        let options = Options::default();
        Self::from_parts(options.probability, StdRng::from_entropy())
    }
}

impl<K: Ord, V, const MAX_LEVELS: usize> Extend<(K, V)> for SkipList<K, V, MAX_LEVELS> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V, const MAX_LEVELS: usize> FromIterator<(K, V)> for SkipList<K, V, MAX_LEVELS> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = Self::default();
        list.extend(iter);
        list
    }
}

/// In-order traversal of the base chain.
pub struct Iter<'a, K, V, const L: usize> {
    list: &'a SkipList<K, V, L>,
    pos: usize,
    remaining: usize,
}

impl<'a, K, V, const L: usize> Iterator for Iter<'a, K, V, L> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let next = list.links(self.pos).next;
        if next == SENTINEL {
            return None;
        }
        self.pos = next;
        self.remaining -= 1;
        let node = list.node(next);
        Some((&node.key, &node.val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, const L: usize> ExactSizeIterator for Iter<'a, K, V, L> {}

impl<'a, K, V, const L: usize> IntoIterator for &'a SkipList<K, V, L> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct LaneKeys<'a, K, V, const L: usize> {
    list: &'a SkipList<K, V, L>,
    level: usize,
    pos: usize,
}

impl<'a, K, V, const L: usize> Iterator for LaneKeys<'a, K, V, L> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        match list.links(self.pos).lanes[self.level] {
            Some(next) if next != SENTINEL => {
                self.pos = next;
                Some(&list.node(next).key)
            }
            _ => None,
        }
    }
}

impl<K, V, const MAX_LEVELS: usize> Debug for SkipList<K, V, MAX_LEVELS>
where
    K: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for l in (0..MAX_LEVELS).rev() {
            let mut lane = self.lane_keys(l).peekable();
            if lane.peek().is_none() {
                continue;
            }
            write!(f, "lane {}:", l)?;
            for key in lane {
                write!(f, " {:?}", key)?;
            }
            writeln!(f)?;
        }
        write!(f, "base:")?;
        for key in self.keys() {
            write!(f, " {:?}", key)?;
        }
        writeln!(f)
    }
}
