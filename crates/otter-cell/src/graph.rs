//! Dependency graph bookkeeping.
//!
//! The graph owns topology only: subscriber and dependency lists, levels,
//! dirty flags and the recompute hooks of derived nodes. Values live in the
//! typed slots held by [`Signal`](crate::Signal) handles.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Identifier of a node in a runtime's graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw index, useful in logs
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Re-evaluation hook of a derived node
pub(crate) type Recompute = Arc<dyn Fn() + Send + Sync>;

pub(crate) type NodeList = SmallVec<[NodeId; 4]>;

pub(crate) struct NodeMeta {
    deps: NodeList,
    subs: NodeList,
    level: u32,
    dirty: bool,
    /// `None` for sources
    recompute: Option<Recompute>,
}

impl NodeMeta {
    fn new(recompute: Option<Recompute>) -> Self {
        Self {
            deps: SmallVec::new(),
            subs: SmallVec::new(),
            level: 0,
            dirty: false,
            recompute,
        }
    }
}

#[derive(Default)]
pub(crate) struct Graph {
    nodes: FxHashMap<NodeId, NodeMeta>,
    next_id: u32,
    dirty: BinaryHeap<Reverse<(u32, NodeId)>>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, meta: NodeMeta) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, meta);
        id
    }

    pub(crate) fn insert_source(&mut self) -> NodeId {
        self.alloc(NodeMeta::new(None))
    }

    /// Reserve a derived node; its hook is installed with [`Graph::set_recompute`]
    /// once the caller knows the id.
    pub(crate) fn insert_derived(&mut self) -> NodeId {
        self.alloc(NodeMeta::new(None))
    }

    pub(crate) fn set_recompute(&mut self, id: NodeId, recompute: Recompute) {
        if let Some(meta) = self.nodes.get_mut(&id) {
            meta.recompute = Some(recompute);
        }
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn level(&self, id: NodeId) -> Option<u32> {
        self.nodes.get(&id).map(|meta| meta.level)
    }

    pub(crate) fn dependencies(&self, id: NodeId) -> NodeList {
        self.nodes
            .get(&id)
            .map(|meta| meta.deps.clone())
            .unwrap_or_default()
    }

    pub(crate) fn subscribers(&self, id: NodeId) -> NodeList {
        self.nodes
            .get(&id)
            .map(|meta| meta.subs.clone())
            .unwrap_or_default()
    }

    /// Mark every subscriber of `id` dirty and queue it by level.
    /// Returns how many nodes were newly queued.
    pub(crate) fn mark_subscribers_dirty(&mut self, id: NodeId) -> usize {
        let subs = match self.nodes.get(&id) {
            Some(meta) => meta.subs.clone(),
            None => return 0,
        };

        let mut queued = 0;
        for sub in subs {
            if let Some(meta) = self.nodes.get_mut(&sub) {
                if !meta.dirty && meta.recompute.is_some() {
                    meta.dirty = true;
                    self.dirty.push(Reverse((meta.level, sub)));
                    queued += 1;
                }
            }
        }
        queued
    }

    /// Pop the lowest-level dirty node and hand back its hook.
    pub(crate) fn pop_dirty(&mut self) -> Option<(NodeId, Recompute)> {
        while let Some(Reverse((_, id))) = self.dirty.pop() {
            let Some(meta) = self.nodes.get_mut(&id) else {
                continue;
            };
            if !meta.dirty {
                continue;
            }
            meta.dirty = false;
            if let Some(recompute) = &meta.recompute {
                return Some((id, Arc::clone(recompute)));
            }
        }
        None
    }

    pub(crate) fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drop every queued node without running it.
    pub(crate) fn clear_dirty(&mut self) -> usize {
        let dropped = self.dirty.len();
        while let Some(Reverse((_, id))) = self.dirty.pop() {
            if let Some(meta) = self.nodes.get_mut(&id) {
                meta.dirty = false;
            }
        }
        dropped
    }

    /// Replace the dependency set of `id` and recompute its level.
    pub(crate) fn rewire(&mut self, id: NodeId, deps: NodeList) {
        let Some(meta) = self.nodes.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut meta.deps, NodeList::new());

        for dep in old.iter().filter(|dep| !deps.contains(dep)) {
            if let Some(dep_meta) = self.nodes.get_mut(dep) {
                dep_meta.subs.retain(|sub| *sub != id);
            }
        }

        let mut level = 0;
        let mut live = NodeList::new();
        for dep in deps {
            let Some(dep_meta) = self.nodes.get_mut(&dep) else {
                continue;
            };
            if !dep_meta.subs.contains(&id) {
                dep_meta.subs.push(id);
            }
            level = level.max(dep_meta.level + 1);
            live.push(dep);
        }

        if let Some(meta) = self.nodes.get_mut(&id) {
            meta.deps = live;
            meta.level = level;
        }
    }

    /// Detach `id` from the graph and return its metadata.
    ///
    /// The caller must drop the returned value after releasing the graph
    /// lock: the hook may own the last handle to other nodes.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<NodeMeta> {
        self.rewire(id, NodeList::new());
        let meta = self.nodes.remove(&id)?;
        for sub in &meta.subs {
            if let Some(sub_meta) = self.nodes.get_mut(sub) {
                sub_meta.deps.retain(|dep| *dep != id);
            }
        }
        Some(meta)
    }
}
