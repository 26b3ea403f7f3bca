//! Edit scripts produced by the diff engine.
//!
//! Invariants:
//! - Edits are applied in order, exactly once.
//! - `path` is the child-index path from the root, resolved against the live
//!   tree at the moment the edit is applied.
//! - For any node, its own attribute edits precede all edits of its
//!   descendants, which precede its single `ReorderChildren` edit. Descendant
//!   paths therefore always use the pre-reorder child indices.

use std::fmt;

use crate::{Decoder, VNode, Value};

/// One primitive mutation of the render target.
pub enum PatchOp<Msg> {
    /// Discard the node at the path and build `VNode` in its place.
    Replace(VNode<Msg>),
    SetText(String),
    SetProperty(String, Value),
    RemoveProperty(String),
    SetAttribute(String, String),
    RemoveAttribute(String),
    SetStyle(String, String),
    RemoveStyle(String),
    AddListener(String, Decoder<Msg>),
    /// Swap the decoder behind an already registered listener. The render
    /// target is not touched.
    UpdateListener(String, Decoder<Msg>),
    RemoveListener(String),
    ReorderChildren(Reorder<Msg>),
}

impl<Msg> fmt::Debug for PatchOp<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Replace(node) => f.debug_tuple("Replace").field(node).finish(),
            PatchOp::SetText(text) => f.debug_tuple("SetText").field(text).finish(),
            PatchOp::SetProperty(name, value) => {
                f.debug_tuple("SetProperty").field(name).field(value).finish()
            }
            PatchOp::RemoveProperty(name) => f.debug_tuple("RemoveProperty").field(name).finish(),
            PatchOp::SetAttribute(name, value) => {
                f.debug_tuple("SetAttribute").field(name).field(value).finish()
            }
            PatchOp::RemoveAttribute(name) => {
                f.debug_tuple("RemoveAttribute").field(name).finish()
            }
            PatchOp::SetStyle(name, value) => {
                f.debug_tuple("SetStyle").field(name).field(value).finish()
            }
            PatchOp::RemoveStyle(name) => f.debug_tuple("RemoveStyle").field(name).finish(),
            PatchOp::AddListener(event, _) => f.debug_tuple("AddListener").field(event).finish(),
            PatchOp::UpdateListener(event, _) => {
                f.debug_tuple("UpdateListener").field(event).finish()
            }
            PatchOp::RemoveListener(event) => f.debug_tuple("RemoveListener").field(event).finish(),
            PatchOp::ReorderChildren(reorder) => {
                f.debug_tuple("ReorderChildren").field(reorder).finish()
            }
        }
    }
}

/// Structural change to one parent's child list.
///
/// Applied in two phases: every index in `removes` and every `Move::from`
/// is detached in descending order (removed nodes are destroyed, moved nodes
/// are kept alive), then every `Move::to` and `Insert::index` is placed in
/// ascending order. Children not mentioned keep their relative order.
pub struct Reorder<Msg> {
    /// Old child indices to destroy.
    pub removes: Vec<usize>,
    /// Existing subtrees to relocate.
    pub moves: Vec<Move>,
    /// Fresh subtrees to build.
    pub inserts: Vec<Insert<Msg>>,
}

impl<Msg> Default for Reorder<Msg> {
    fn default() -> Self {
        Self {
            removes: Vec::new(),
            moves: Vec::new(),
            inserts: Vec::new(),
        }
    }
}

impl<Msg> Reorder<Msg> {
    /// Whether no child is removed, moved or inserted.
    pub fn is_empty(&self) -> bool {
        self.removes.is_empty() && self.moves.is_empty() && self.inserts.is_empty()
    }
}

impl<Msg> fmt::Debug for Reorder<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reorder")
            .field("removes", &self.removes)
            .field("moves", &self.moves)
            .field("inserts", &self.inserts)
            .finish()
    }
}

/// Relocate the child at old index `from` to final index `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

/// Build `node` at final index `index`.
pub struct Insert<Msg> {
    pub index: usize,
    pub node: VNode<Msg>,
}

impl<Msg> fmt::Debug for Insert<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Insert")
            .field("index", &self.index)
            .field("node", &self.node)
            .finish()
    }
}

/// A primitive edit addressed to a node by its index path from the root.
pub struct Edit<Msg> {
    pub path: Vec<usize>,
    pub op: PatchOp<Msg>,
}

impl<Msg> fmt::Debug for Edit<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edit")
            .field("path", &self.path)
            .field("op", &self.op)
            .finish()
    }
}

/// An ordered edit script turning one rendered tree into the next.
pub struct Patch<Msg> {
    edits: Vec<Edit<Msg>>,
}

impl<Msg> Default for Patch<Msg> {
    fn default() -> Self {
        Self { edits: Vec::new() }
    }
}

impl<Msg> fmt::Debug for Patch<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.edits).finish()
    }
}

impl<Msg> Patch<Msg> {
    pub(crate) fn push(&mut self, path: &[usize], op: PatchOp<Msg>) {
        self.edits.push(Edit {
            path: path.to_vec(),
            op,
        });
    }

    /// Whether applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of edits, counting each `ReorderChildren` once.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// The edits in application order.
    pub fn edits(&self) -> &[Edit<Msg>] {
        &self.edits
    }

    /// Consume the patch, yielding its edits in application order.
    pub fn into_edits(self) -> Vec<Edit<Msg>> {
        self.edits
    }

    /// Count the primitive operations in this patch by kind.
    pub fn stats(&self) -> PatchStats {
        let mut stats = PatchStats::default();
        for edit in &self.edits {
            match &edit.op {
                PatchOp::Replace(_) => stats.replaces += 1,
                PatchOp::SetText(_) => stats.texts += 1,
                PatchOp::SetProperty(..)
                | PatchOp::RemoveProperty(_)
                | PatchOp::SetAttribute(..)
                | PatchOp::RemoveAttribute(_)
                | PatchOp::SetStyle(..)
                | PatchOp::RemoveStyle(_) => stats.facts += 1,
                PatchOp::AddListener(..)
                | PatchOp::UpdateListener(..)
                | PatchOp::RemoveListener(_) => stats.listeners += 1,
                PatchOp::ReorderChildren(reorder) => {
                    stats.inserts += reorder.inserts.len();
                    stats.moves += reorder.moves.len();
                    stats.removes += reorder.removes.len();
                }
            }
        }
        stats
    }
}

/// Operation counts of a [`Patch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub replaces: usize,
    pub texts: usize,
    pub facts: usize,
    pub listeners: usize,
    pub inserts: usize,
    pub moves: usize,
    pub removes: usize,
}

impl PatchStats {
    pub fn total(&self) -> usize {
        self.replaces
            + self.texts
            + self.facts
            + self.listeners
            + self.inserts
            + self.moves
            + self.removes
    }
}
