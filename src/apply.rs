//! Patch applier: executes edit scripts against a render target.

use std::collections::BTreeMap;

use crate::patch::{Edit, Move, Patch, PatchOp, Reorder};
use crate::target::{Listener, ListenerId, RenderTarget};
use crate::vnode::{Facts, VNode};
use crate::{Decoder, Emitter};

/// Mirror of one live render-target node.
struct LiveNode<H, Msg: Send> {
    handle: H,
    listeners: BTreeMap<String, Listener<Msg>>,
    children: Vec<LiveNode<H, Msg>>,
}

/// Hands out listeners bound to the runtime's emitter.
struct Listeners<Msg: Send> {
    emitter: Emitter<Msg>,
    next_id: u64,
}

impl<Msg: Send + 'static> Listeners<Msg> {
    fn create(&mut self, event: &str, decoder: Decoder<Msg>) -> Listener<Msg> {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        Listener::new(id, event.to_owned(), decoder, self.emitter.clone())
    }
}

enum Placement<H, Msg: Send> {
    Moved(LiveNode<H, Msg>),
    Fresh(VNode<Msg>),
}

/// Owns the render target and the live handles it created.
///
/// Nothing else reads or mutates the target while the applier owns it.
pub struct Applier<Msg: Send, T: RenderTarget<Msg>> {
    target: T,
    root: Option<LiveNode<T::Handle, Msg>>,
    listeners: Listeners<Msg>,
}

impl<Msg: Send + 'static, T: RenderTarget<Msg>> Applier<Msg, T> {
    /// Create an applier over `target`. Listeners it registers queue their
    /// decoded messages through `emitter`, e.g. [`Runtime::emitter`](crate::Runtime::emitter).
    pub fn new(target: T, emitter: Emitter<Msg>) -> Self {
        Self {
            target,
            root: None,
            listeners: Listeners {
                emitter,
                next_id: 0,
            },
        }
    }

    /// The render target edits are applied to.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Whether a tree is currently mounted.
    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }

    /// Build `vnode` from scratch and attach it to the target's container,
    /// replacing whatever was mounted before.
    pub fn mount(&mut self, vnode: &VNode<Msg>) {
        self.unmount();
        let root = build(&mut self.target, &mut self.listeners, vnode);
        let container = self.target.container();
        self.target.insert_child(&container, 0, &root.handle);
        self.root = Some(root);
    }

    /// Detach every listener and remove the mounted tree.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            let container = self.target.container();
            self.target.remove_child(&container, 0);
            discard(&mut self.target, root);
        }
    }

    /// Apply every edit of `patch` in order.
    pub fn apply(&mut self, patch: Patch<Msg>) {
        tracing::trace!(edits = patch.len(), "applying patch");
        for edit in patch.into_edits() {
            self.edit(edit);
        }
    }

    fn edit(&mut self, edit: Edit<Msg>) {
        let Edit { path, op } = edit;
        let Applier {
            target,
            root,
            listeners,
        } = self;

        if let PatchOp::Replace(vnode) = op {
            replace(target, listeners, root, &path, &vnode);
            return;
        }

        let Some(live) = resolve(root, &path) else {
            tracing::error!(?path, "patch addresses a node that does not exist");
            return;
        };
        let handle = &live.handle;

        match op {
            PatchOp::Replace(_) => {}
            PatchOp::SetText(text) => target.set_text(handle, &text),
            PatchOp::SetProperty(name, value) => target.set_property(handle, &name, &value),
            PatchOp::RemoveProperty(name) => target.remove_property(handle, &name),
            PatchOp::SetAttribute(name, value) => target.set_attribute(handle, &name, &value),
            PatchOp::RemoveAttribute(name) => target.remove_attribute(handle, &name),
            PatchOp::SetStyle(name, value) => target.set_style(handle, &name, &value),
            PatchOp::RemoveStyle(name) => target.remove_style(handle, &name),
            PatchOp::AddListener(event, decoder) => {
                let listener = listeners.create(&event, decoder);
                target.add_listener(handle, listener.clone());
                if let Some(previous) = live.listeners.insert(event, listener) {
                    previous.detach();
                    target.remove_listener(&live.handle, previous.event(), previous.id());
                }
            }
            PatchOp::UpdateListener(event, decoder) => match live.listeners.get(&event) {
                Some(listener) => listener.swap(decoder),
                None => {
                    let listener = listeners.create(&event, decoder);
                    target.add_listener(handle, listener.clone());
                    live.listeners.insert(event, listener);
                }
            },
            PatchOp::RemoveListener(event) => {
                if let Some(listener) = live.listeners.remove(&event) {
                    listener.detach();
                    target.remove_listener(&live.handle, &event, listener.id());
                }
            }
            PatchOp::ReorderChildren(reorder) => reorder_children(target, listeners, live, reorder),
        }
    }
}

fn resolve<'a, H, Msg: Send>(
    root: &'a mut Option<LiveNode<H, Msg>>,
    path: &[usize],
) -> Option<&'a mut LiveNode<H, Msg>> {
    let mut node = root.as_mut()?;
    for &index in path {
        node = node.children.get_mut(index)?;
    }
    Some(node)
}

fn build<Msg, T>(
    target: &mut T,
    listeners: &mut Listeners<Msg>,
    vnode: &VNode<Msg>,
) -> LiveNode<T::Handle, Msg>
where
    Msg: Send + 'static,
    T: RenderTarget<Msg>,
{
    let handle = match vnode {
        VNode::Text(text) => {
            return LiveNode {
                handle: target.create_text(text),
                listeners: BTreeMap::new(),
                children: Vec::new(),
            };
        }
        VNode::Element { tag, .. } | VNode::Keyed { tag, .. } => target.create_element(tag),
    };

    let facts = Facts::organize(vnode.attributes());
    for (name, value) in &facts.styles {
        target.set_style(&handle, name, value);
    }
    for (name, value) in &facts.properties {
        target.set_property(&handle, name, value);
    }
    for (name, value) in &facts.attributes {
        target.set_attribute(&handle, name, value);
    }
    let mut registered = BTreeMap::new();
    for (event, decoder) in &facts.events {
        let listener = listeners.create(event, (*decoder).clone());
        target.add_listener(&handle, listener.clone());
        registered.insert((*event).to_owned(), listener);
    }

    let mut children = Vec::with_capacity(vnode.child_count());
    for (index, child) in (0..vnode.child_count()).filter_map(|i| vnode.child(i)).enumerate() {
        let live = build(target, listeners, child);
        target.insert_child(&handle, index, &live.handle);
        children.push(live);
    }

    LiveNode {
        handle,
        listeners: registered,
        children,
    }
}

/// Unregister every listener in a subtree so late native events are no-ops.
fn detach_listeners<Msg, T>(target: &mut T, live: &LiveNode<T::Handle, Msg>)
where
    Msg: Send + 'static,
    T: RenderTarget<Msg>,
{
    for (event, listener) in &live.listeners {
        listener.detach();
        target.remove_listener(&live.handle, event, listener.id());
    }
    for child in &live.children {
        detach_listeners(target, child);
    }
}

/// Tear down a subtree that has already been detached from its parent.
fn discard<Msg, T>(target: &mut T, live: LiveNode<T::Handle, Msg>)
where
    Msg: Send + 'static,
    T: RenderTarget<Msg>,
{
    detach_listeners(target, &live);
    target.release(live.handle);
}

fn replace<Msg, T>(
    target: &mut T,
    listeners: &mut Listeners<Msg>,
    root: &mut Option<LiveNode<T::Handle, Msg>>,
    path: &[usize],
    vnode: &VNode<Msg>,
) where
    Msg: Send + 'static,
    T: RenderTarget<Msg>,
{
    let Some((&index, parent_path)) = path.split_last() else {
        if let Some(previous) = root.take() {
            let container = target.container();
            target.remove_child(&container, 0);
            discard(target, previous);
        }
        let fresh = build(target, listeners, vnode);
        let container = target.container();
        target.insert_child(&container, 0, &fresh.handle);
        *root = Some(fresh);
        return;
    };

    let Some(parent) = resolve(root, parent_path) else {
        tracing::error!(?path, "replace addresses a node that does not exist");
        return;
    };
    if index >= parent.children.len() {
        tracing::error!(?path, "replace addresses a node that does not exist");
        return;
    }

    detach_listeners(target, &parent.children[index]);
    target.remove_child(&parent.handle, index);
    let fresh = build(target, listeners, vnode);
    target.insert_child(&parent.handle, index, &fresh.handle);
    let previous = std::mem::replace(&mut parent.children[index], fresh);
    target.release(previous.handle);
}

fn reorder_children<Msg, T>(
    target: &mut T,
    listeners: &mut Listeners<Msg>,
    parent: &mut LiveNode<T::Handle, Msg>,
    reorder: Reorder<Msg>,
) where
    Msg: Send + 'static,
    T: RenderTarget<Msg>,
{
    let Reorder {
        removes,
        moves,
        inserts,
    } = reorder;

    if let ([], [Move { from, to }], []) = (removes.as_slice(), moves.as_slice(), inserts.as_slice()) {
        let (from, to) = (*from, *to);
        if from < parent.children.len() && to < parent.children.len() {
            target.move_child(&parent.handle, from, to);
            let child = parent.children.remove(from);
            parent.children.insert(to, child);
            return;
        }
    }

    // (old index, final index for moves)
    let mut detach: Vec<(usize, Option<usize>)> = removes
        .into_iter()
        .map(|index| (index, None))
        .chain(moves.into_iter().map(|m| (m.from, Some(m.to))))
        .collect();
    detach.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    if detach
        .first()
        .is_some_and(|(index, _)| *index >= parent.children.len())
    {
        tracing::error!(
            children = parent.children.len(),
            "reorder addresses a child that does not exist"
        );
        return;
    }

    let mut placements: Vec<(usize, Placement<T::Handle, Msg>)> = Vec::new();
    for (index, destination) in detach {
        let child = parent.children.remove(index);
        target.remove_child(&parent.handle, index);
        match destination {
            Some(to) => placements.push((to, Placement::Moved(child))),
            None => discard(target, child),
        }
    }
    placements.extend(
        inserts
            .into_iter()
            .map(|insert| (insert.index, Placement::Fresh(insert.node))),
    );
    placements.sort_by_key(|(index, _)| *index);

    for (index, placement) in placements {
        let child = match placement {
            Placement::Moved(child) => child,
            Placement::Fresh(vnode) => build(target, listeners, &vnode),
        };
        let index = if index > parent.children.len() {
            tracing::error!(index, "reorder places a child past the end");
            parent.children.len()
        } else {
            index
        };
        target.insert_child(&parent.handle, index, &child.handle);
        parent.children.insert(index, child);
    }
}
