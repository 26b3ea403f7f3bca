//! Diff engine: computes the edit script between two virtual trees.

use std::collections::BTreeMap;

use crate::keyed;
use crate::patch::{Insert, Patch, PatchOp, Reorder};
use crate::vnode::{Attribute, Facts, VNode};

/// Compute the patch turning `old` into `new`.
///
/// Never fails: incompatible shapes fall back to replacing the node. Neither
/// input is modified.
///
/// ```rust
/// use oxide_vdom::{diff, node, text, VNode};
///
/// let old: VNode<()> = node("p", vec![], vec![text("0")]);
/// let new: VNode<()> = node("p", vec![], vec![text("1")]);
///
/// let patch = diff(&old, &new);
/// assert_eq!(patch.stats().texts, 1);
/// assert!(diff(&new, &new).is_empty());
/// ```
pub fn diff<Msg: 'static>(old: &VNode<Msg>, new: &VNode<Msg>) -> Patch<Msg> {
    let mut differ = Differ {
        patch: Patch::default(),
        path: Vec::new(),
    };
    differ.node(old, new);
    differ.patch
}

pub(crate) struct Differ<Msg> {
    patch: Patch<Msg>,
    path: Vec<usize>,
}

impl<Msg: 'static> Differ<Msg> {
    fn node(&mut self, old: &VNode<Msg>, new: &VNode<Msg>) {
        match (old, new) {
            (VNode::Text(old_text), VNode::Text(new_text)) => {
                if old_text != new_text {
                    self.emit(PatchOp::SetText(new_text.clone()));
                }
            }
            (
                VNode::Element {
                    tag: old_tag,
                    attributes: old_attributes,
                    children: old_children,
                },
                VNode::Element {
                    tag: new_tag,
                    attributes: new_attributes,
                    children: new_children,
                },
            ) if old_tag == new_tag => {
                self.facts(old_attributes, new_attributes);
                self.positional(old_children, new_children);
            }
            (
                VNode::Keyed {
                    tag: old_tag,
                    attributes: old_attributes,
                    children: old_children,
                },
                VNode::Keyed {
                    tag: new_tag,
                    attributes: new_attributes,
                    children: new_children,
                },
            ) if old_tag == new_tag => {
                self.facts(old_attributes, new_attributes);
                let reorder = keyed::reconcile(self, old_children, new_children);
                self.reorder(reorder);
            }
            _ => self.emit(PatchOp::Replace(new.clone())),
        }
    }

    /// Diff one child pair, addressed by the child's current (old) index.
    pub(crate) fn child(&mut self, index: usize, old: &VNode<Msg>, new: &VNode<Msg>) {
        self.path.push(index);
        self.node(old, new);
        self.path.pop();
    }

    fn emit(&mut self, op: PatchOp<Msg>) {
        self.patch.push(&self.path, op);
    }

    fn reorder(&mut self, reorder: Reorder<Msg>) {
        if !reorder.is_empty() {
            self.emit(PatchOp::ReorderChildren(reorder));
        }
    }

    fn positional(&mut self, old: &[VNode<Msg>], new: &[VNode<Msg>]) {
        let common = old.len().min(new.len());
        for (index, (old_child, new_child)) in old.iter().zip(new).enumerate() {
            self.child(index, old_child, new_child);
        }

        let mut reorder = Reorder::default();
        if new.len() > common {
            reorder.inserts = new[common..]
                .iter()
                .enumerate()
                .map(|(offset, node)| Insert {
                    index: common + offset,
                    node: node.clone(),
                })
                .collect();
        } else if old.len() > common {
            reorder.removes = (common..old.len()).collect();
        }
        self.reorder(reorder);
    }

    fn facts(&mut self, old: &[Attribute<Msg>], new: &[Attribute<Msg>]) {
        let old = Facts::organize(old);
        let new = Facts::organize(new);

        self.entries(
            &old.styles,
            &new.styles,
            |name| PatchOp::RemoveStyle(name.to_owned()),
            |name, value| PatchOp::SetStyle(name.to_owned(), (*value).to_owned()),
        );
        self.entries(
            &old.properties,
            &new.properties,
            |name| PatchOp::RemoveProperty(name.to_owned()),
            |name, value| PatchOp::SetProperty(name.to_owned(), (*value).clone()),
        );
        self.entries(
            &old.attributes,
            &new.attributes,
            |name| PatchOp::RemoveAttribute(name.to_owned()),
            |name, value| PatchOp::SetAttribute(name.to_owned(), (*value).to_owned()),
        );

        for event in old.events.keys() {
            if !new.events.contains_key(event) {
                self.emit(PatchOp::RemoveListener((*event).to_owned()));
            }
        }
        for (event, decoder) in &new.events {
            match old.events.get(event) {
                Some(previous) if previous.same(decoder) => {}
                Some(_) => self.emit(PatchOp::UpdateListener(
                    (*event).to_owned(),
                    (*decoder).clone(),
                )),
                None => self.emit(PatchOp::AddListener((*event).to_owned(), (*decoder).clone())),
            }
        }
    }

    /// Removals for names absent from `new`, then sets for added or changed values.
    fn entries<V: PartialEq + ?Sized>(
        &mut self,
        old: &BTreeMap<&str, &V>,
        new: &BTreeMap<&str, &V>,
        remove: impl Fn(&str) -> PatchOp<Msg>,
        set: impl Fn(&str, &&V) -> PatchOp<Msg>,
    ) {
        for name in old.keys() {
            if !new.contains_key(name) {
                self.emit(remove(*name));
            }
        }
        for (name, value) in new {
            if old.get(name) != Some(value) {
                self.emit(set(*name, value));
            }
        }
    }
}
