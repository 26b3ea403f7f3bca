//! Render target abstraction and event listeners.

use std::fmt;

use portable_atomic_util::Arc;
use spin::Mutex;

use crate::{Decoder, Emitter, Value};

#[cfg(any(test, feature = "testing"))]
use std::collections::BTreeMap;

#[cfg(any(test, feature = "testing"))]
use crate::vnode::{Facts, VNode};

/// Registration identity of one listener.
///
/// Removal uses the same id that was used on addition, so removing one
/// handler never removes others registered for the same event name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// An event handler registered on a render-target node.
///
/// A listener holds a decoder slot and the runtime's [`Emitter`], never any
/// model state. When the render target observes the event it calls
/// [`handle`](Self::handle) with the native payload; the decoded message is
/// queued for dispatch. Payloads that fail to decode are dropped.
pub struct Listener<Msg: Send> {
    id: ListenerId,
    event: String,
    decoder: Arc<Mutex<Option<Decoder<Msg>>>>,
    emitter: Emitter<Msg>,
}

impl<Msg: Send> Clone for Listener<Msg> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            event: self.event.clone(),
            decoder: self.decoder.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<Msg: Send> fmt::Debug for Listener<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}

impl<Msg: Send + 'static> Listener<Msg> {
    pub(crate) fn new(
        id: ListenerId,
        event: String,
        decoder: Decoder<Msg>,
        emitter: Emitter<Msg>,
    ) -> Self {
        Self {
            id,
            event,
            decoder: Arc::new(Mutex::new(Some(decoder))),
            emitter,
        }
    }

    /// The identity to unregister this listener with.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The native event name this listener handles.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Decode a native event payload and queue the resulting message.
    pub fn handle(&self, payload: &Value) {
        // Clone out of the slot so user decoders never run under the lock.
        let Some(decoder) = self.decoder.lock().clone() else {
            tracing::trace!(event = %self.event, "event on detached listener ignored");
            return;
        };
        match decoder.decode(payload) {
            Ok(msg) => self.emitter.emit(msg),
            Err(error) => {
                tracing::debug!(event = %self.event, %error, "dropping event that failed to decode");
            }
        }
    }

    /// Whether the listener still belongs to a mounted node.
    pub fn is_attached(&self) -> bool {
        self.decoder.lock().is_some()
    }

    pub(crate) fn swap(&self, decoder: Decoder<Msg>) {
        *self.decoder.lock() = Some(decoder);
    }

    pub(crate) fn detach(&self) {
        self.decoder.lock().take();
    }
}

/// The external, mutable surface the patch applier operates on.
///
/// Implement this trait to integrate the runtime with a DOM, a terminal
/// widget tree, or any retained-mode UI. The applier calls these operations
/// and implements none of them.
///
/// Handles stay valid while a node is detached: removing a child and
/// inserting the same handle elsewhere relocates the existing subtree, which
/// is how reordered keyed children keep their state.
pub trait RenderTarget<Msg: Send> {
    type Handle: Clone;

    /// The node the application root is mounted into.
    fn container(&self) -> Self::Handle;

    fn create_element(&mut self, tag: &str) -> Self::Handle;

    fn create_text(&mut self, text: &str) -> Self::Handle;

    fn set_text(&mut self, node: &Self::Handle, text: &str);

    fn set_property(&mut self, node: &Self::Handle, name: &str, value: &Value);

    fn remove_property(&mut self, node: &Self::Handle, name: &str);

    fn set_attribute(&mut self, node: &Self::Handle, name: &str, value: &str);

    fn remove_attribute(&mut self, node: &Self::Handle, name: &str);

    fn set_style(&mut self, node: &Self::Handle, name: &str, value: &str);

    fn remove_style(&mut self, node: &Self::Handle, name: &str);

    /// Register `listener` for `listener.event()` on `node`.
    fn add_listener(&mut self, node: &Self::Handle, listener: Listener<Msg>);

    /// Unregister exactly the listener registered under `id`.
    fn remove_listener(&mut self, node: &Self::Handle, event: &str, id: ListenerId);

    /// Insert `child` so that it ends up at position `index` of `parent`.
    fn insert_child(&mut self, parent: &Self::Handle, index: usize, child: &Self::Handle);

    /// Detach the child at `index` of `parent`. The returned handle stays
    /// usable and may be inserted again.
    fn remove_child(&mut self, parent: &Self::Handle, index: usize) -> Self::Handle;

    /// Relocate the child at `from` so that it ends up at `to`.
    ///
    /// Used when a reorder consists of a single move. Override it when the
    /// target has a native relocation primitive.
    fn move_child(&mut self, parent: &Self::Handle, from: usize, to: usize) {
        let child = self.remove_child(parent, from);
        self.insert_child(parent, to, &child);
    }

    /// Called once a detached subtree is discarded for good.
    fn release(&mut self, _node: Self::Handle) {}
}

#[cfg(any(test, feature = "testing"))]
/// Node identity inside a [`TestTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[cfg(any(test, feature = "testing"))]
enum Kind {
    Container,
    Element(String),
    Text(String),
}

#[cfg(any(test, feature = "testing"))]
struct Registration<Msg: Send> {
    event: String,
    id: ListenerId,
    /// `None` for handlers registered outside the runtime.
    listener: Option<Listener<Msg>>,
}

#[cfg(any(test, feature = "testing"))]
struct TestNode<Msg: Send> {
    kind: Kind,
    properties: BTreeMap<String, Value>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    listeners: Vec<Registration<Msg>>,
    children: Vec<NodeId>,
    released: bool,
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send> TestNode<Msg> {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            released: false,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// Counts of structural render-target operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetCounters {
    pub created: usize,
    pub inserted: usize,
    pub detached: usize,
    pub released: usize,
}

#[cfg(any(test, feature = "testing"))]
struct Document<Msg: Send> {
    nodes: Vec<TestNode<Msg>>,
    counters: TargetCounters,
    next_foreign: u64,
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send> Document<Msg> {
    fn create(&mut self, kind: Kind) -> NodeId {
        self.nodes.push(TestNode::new(kind));
        self.counters.created += 1;
        NodeId(self.nodes.len() - 1)
    }

    fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = *self.nodes[0].children.first()?;
        for &index in path {
            current = *self.nodes[current.0].children.get(index)?;
        }
        Some(current)
    }

    fn snapshot(&self, id: NodeId) -> Snapshot {
        let node = &self.nodes[id.0];
        match &node.kind {
            Kind::Text(text) => Snapshot::Text(text.clone()),
            Kind::Element(tag) => Snapshot::Element {
                tag: tag.clone(),
                properties: node.properties.clone(),
                attributes: node.attributes.clone(),
                styles: node.styles.clone(),
                listeners: {
                    let mut events: Vec<String> = node
                        .listeners
                        .iter()
                        .filter(|r| r.listener.is_some())
                        .map(|r| r.event.clone())
                        .collect();
                    events.sort();
                    events
                },
                children: node.children.iter().map(|c| self.snapshot(*c)).collect(),
            },
            Kind::Container => Snapshot::Text(String::new()),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// Observable structure of a rendered tree, for equality assertions.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    Text(String),
    Element {
        tag: String,
        properties: BTreeMap<String, Value>,
        attributes: BTreeMap<String, String>,
        styles: BTreeMap<String, String>,
        /// Event names with a runtime listener, sorted.
        listeners: Vec<String>,
        children: Vec<Snapshot>,
    },
}

#[cfg(any(test, feature = "testing"))]
impl Snapshot {
    /// The snapshot a correct render of `vnode` must produce.
    pub fn of<Msg>(vnode: &VNode<Msg>) -> Snapshot {
        match vnode {
            VNode::Text(text) => Snapshot::Text(text.clone()),
            VNode::Element { tag, attributes, .. } | VNode::Keyed { tag, attributes, .. } => {
                let facts = Facts::organize(attributes);
                Snapshot::Element {
                    tag: tag.clone(),
                    properties: facts
                        .properties
                        .iter()
                        .map(|(k, v)| ((*k).to_owned(), (*v).clone()))
                        .collect(),
                    attributes: facts
                        .attributes
                        .iter()
                        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                        .collect(),
                    styles: facts
                        .styles
                        .iter()
                        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                        .collect(),
                    listeners: facts.events.keys().map(|k| (*k).to_owned()).collect(),
                    children: (0..vnode.child_count())
                        .filter_map(|i| vnode.child(i))
                        .map(Snapshot::of)
                        .collect(),
                }
            }
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// In-memory render target for tests.
///
/// Only available with the `testing` feature or during tests.
///
/// Clones share the same document, so a test can keep one clone for
/// inspection while the runtime owns another.
///
/// ```rust
/// use oxide_vdom::{node, text, Application, Command, Runtime, Snapshot, TestTarget, VNode};
///
/// struct Hello;
///
/// impl Application<(), ()> for Hello {
///     fn init(&self) -> ((), Command<()>) { ((), Command::none()) }
///     fn update(&self, _: (), _: &()) -> ((), Command<()>) { ((), Command::none()) }
///     fn view(&self, _: &()) -> VNode<()> { node("h1", vec![], vec![text("hello")]) }
/// }
///
/// let target = TestTarget::new();
/// let mut runtime = Runtime::new(Hello, target.clone());
/// runtime.start().unwrap();
///
/// let expected: VNode<()> = node("h1", vec![], vec![text("hello")]);
/// assert_eq!(target.snapshot(), Some(Snapshot::of(&expected)));
/// ```
pub struct TestTarget<Msg: Send> {
    document: Arc<Mutex<Document<Msg>>>,
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send> Clone for TestTarget<Msg> {
    fn clone(&self) -> Self {
        Self {
            document: self.document.clone(),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send + 'static> Default for TestTarget<Msg> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send + 'static> TestTarget<Msg> {
    /// An empty document holding only the container.
    pub fn new() -> Self {
        Self {
            document: Arc::new(Mutex::new(Document {
                nodes: vec![TestNode::new(Kind::Container)],
                counters: TargetCounters::default(),
                next_foreign: u64::MAX,
            })),
        }
    }

    /// Snapshot of the mounted root, if any.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let document = self.document.lock();
        let root = *document.nodes[0].children.first()?;
        Some(document.snapshot(root))
    }

    /// The node at `path` below the mounted root.
    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        self.document.lock().node_at(path)
    }

    /// Structural operation counts so far.
    pub fn counters(&self) -> TargetCounters {
        self.document.lock().counters
    }

    /// Whether `node` has been discarded by the applier.
    pub fn is_released(&self, node: NodeId) -> bool {
        self.document.lock().nodes[node.0].released
    }

    /// Number of handlers (runtime and foreign) registered for `event` at `path`.
    pub fn listener_count(&self, path: &[usize], event: &str) -> usize {
        let document = self.document.lock();
        document.node_at(path).map_or(0, |id| {
            document.nodes[id.0]
                .listeners
                .iter()
                .filter(|r| r.event == event)
                .count()
        })
    }

    /// Register a handler that does not belong to the runtime.
    pub fn add_foreign_listener(&self, path: &[usize], event: &str) -> Option<ListenerId> {
        let mut document = self.document.lock();
        let node = document.node_at(path)?;
        let id = ListenerId(document.next_foreign);
        document.next_foreign -= 1;
        document.nodes[node.0].listeners.push(Registration {
            event: event.to_owned(),
            id,
            listener: None,
        });
        Some(id)
    }

    /// Simulate a native event on the node at `path`. Returns the number of
    /// runtime listeners that received it.
    pub fn fire(&self, path: &[usize], event: &str, payload: &Value) -> usize {
        let listeners: Vec<Listener<Msg>> = {
            let document = self.document.lock();
            let Some(node) = document.node_at(path) else {
                return 0;
            };
            document.nodes[node.0]
                .listeners
                .iter()
                .filter(|r| r.event == event)
                .filter_map(|r| r.listener.clone())
                .collect()
        };
        for listener in &listeners {
            listener.handle(payload);
        }
        listeners.len()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Msg: Send + 'static> RenderTarget<Msg> for TestTarget<Msg> {
    type Handle = NodeId;

    fn container(&self) -> NodeId {
        NodeId(0)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.document.lock().create(Kind::Element(tag.to_owned()))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.document.lock().create(Kind::Text(text.to_owned()))
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        if let Kind::Text(content) = &mut self.document.lock().nodes[node.0].kind {
            *content = text.to_owned();
        }
    }

    fn set_property(&mut self, node: &NodeId, name: &str, value: &Value) {
        self.document.lock().nodes[node.0]
            .properties
            .insert(name.to_owned(), value.clone());
    }

    fn remove_property(&mut self, node: &NodeId, name: &str) {
        self.document.lock().nodes[node.0].properties.remove(name);
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.document.lock().nodes[node.0]
            .attributes
            .insert(name.to_owned(), value.to_owned());
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        self.document.lock().nodes[node.0].attributes.remove(name);
    }

    fn set_style(&mut self, node: &NodeId, name: &str, value: &str) {
        self.document.lock().nodes[node.0]
            .styles
            .insert(name.to_owned(), value.to_owned());
    }

    fn remove_style(&mut self, node: &NodeId, name: &str) {
        self.document.lock().nodes[node.0].styles.remove(name);
    }

    fn add_listener(&mut self, node: &NodeId, listener: Listener<Msg>) {
        self.document.lock().nodes[node.0]
            .listeners
            .push(Registration {
                event: listener.event().to_owned(),
                id: listener.id(),
                listener: Some(listener),
            });
    }

    fn remove_listener(&mut self, node: &NodeId, event: &str, id: ListenerId) {
        self.document.lock().nodes[node.0]
            .listeners
            .retain(|r| !(r.event == event && r.id == id));
    }

    fn insert_child(&mut self, parent: &NodeId, index: usize, child: &NodeId) {
        let mut document = self.document.lock();
        document.nodes[parent.0].children.insert(index, *child);
        document.counters.inserted += 1;
    }

    fn remove_child(&mut self, parent: &NodeId, index: usize) -> NodeId {
        let mut document = self.document.lock();
        document.counters.detached += 1;
        document.nodes[parent.0].children.remove(index)
    }

    fn release(&mut self, node: NodeId) {
        let mut document = self.document.lock();
        document.nodes[node.0].released = true;
        document.counters.released += 1;
    }
}
