//! Virtual nodes: immutable descriptions of a UI snapshot.

use std::collections::BTreeMap;
use std::fmt;

use portable_atomic_util::Arc;

use crate::{DecodeError, Value};

type DecodeFn<Msg> = dyn Fn(&Value) -> Result<Msg, DecodeError> + Send + Sync;

/// Turns a native event payload into an application message.
///
/// Decoders are shared, so cloning is cheap. Two decoders are considered the
/// same listener only when one is a clone of the other; the diff engine uses
/// this to skip re-registering unchanged handlers.
///
/// ```rust
/// use oxide_vdom::{Decoder, Value};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Msg { Input(String) }
///
/// let decoder = Decoder::new(|event: &Value| {
///     event
///         .at(["target", "value"])
///         .and_then(Value::as_str)
///         .map(|s| Msg::Input(s.to_owned()))
///         .ok_or(oxide_vdom::DecodeError::MissingField("target.value".into()))
/// });
///
/// let event = Value::object([("target", Value::object([("value", Value::from("hi"))]))]);
/// assert_eq!(decoder.decode(&event), Ok(Msg::Input("hi".into())));
/// ```
pub struct Decoder<Msg>(Arc<Box<DecodeFn<Msg>>>);

impl<Msg> Clone for Decoder<Msg> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Msg> fmt::Debug for Decoder<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decoder(..)")
    }
}

impl<Msg: 'static> Decoder<Msg> {
    /// Wrap a decoding function.
    pub fn new<F>(decode: F) -> Self
    where
        F: Fn(&Value) -> Result<Msg, DecodeError> + Send + Sync + 'static,
    {
        Self(Arc::new(Box::new(decode)))
    }

    /// A decoder that ignores the payload and always yields `msg`.
    pub fn succeed(msg: Msg) -> Self
    where
        Msg: Clone + Send + Sync,
    {
        Self::new(move |_| Ok(msg.clone()))
    }

    /// A decoder that always fails.
    pub fn fail(message: impl Into<String>) -> Self {
        let error = DecodeError::failure(message);
        Self::new(move |_| Err(error.clone()))
    }

    /// Decode a native event payload into a message.
    pub fn decode(&self, payload: &Value) -> Result<Msg, DecodeError> {
        (self.0)(payload)
    }

    /// Transform the decoded message.
    pub fn map<B, F>(self, f: F) -> Decoder<B>
    where
        B: 'static,
        F: Fn(Msg) -> B + Send + Sync + 'static,
    {
        Decoder::new(move |payload| self.decode(payload).map(&f))
    }

    /// Whether both decoders are the same shared function.
    pub fn same(&self, other: &Decoder<Msg>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A declared attribute of an element.
pub enum Attribute<Msg> {
    /// Inline style entries, merged key-wise with other style sets.
    Style(Vec<(String, String)>),
    /// Assigned as a live field on the render-target node.
    Property(String, Value),
    /// Assigned through the target's generic attribute path.
    Attribute(String, String),
    /// Event listener: event name plus the decoder producing messages.
    Event(String, Decoder<Msg>),
}

impl<Msg> Clone for Attribute<Msg> {
    fn clone(&self) -> Self {
        match self {
            Attribute::Style(entries) => Attribute::Style(entries.clone()),
            Attribute::Property(name, value) => Attribute::Property(name.clone(), value.clone()),
            Attribute::Attribute(name, value) => Attribute::Attribute(name.clone(), value.clone()),
            Attribute::Event(name, decoder) => Attribute::Event(name.clone(), decoder.clone()),
        }
    }
}

impl<Msg> fmt::Debug for Attribute<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Style(entries) => f.debug_tuple("Style").field(entries).finish(),
            Attribute::Property(name, value) => {
                f.debug_tuple("Property").field(name).field(value).finish()
            }
            Attribute::Attribute(name, value) => {
                f.debug_tuple("Attribute").field(name).field(value).finish()
            }
            Attribute::Event(name, _) => f.debug_tuple("Event").field(name).finish(),
        }
    }
}

impl<Msg: 'static> Attribute<Msg> {
    /// Lift an event attribute's messages through `f`; other kinds pass through.
    pub fn map<B: 'static>(self, f: &MapFn<Msg, B>) -> Attribute<B> {
        match self {
            Attribute::Style(entries) => Attribute::Style(entries),
            Attribute::Property(name, value) => Attribute::Property(name, value),
            Attribute::Attribute(name, value) => Attribute::Attribute(name, value),
            Attribute::Event(name, decoder) => {
                let f = f.clone();
                Attribute::Event(name, decoder.map(move |msg| (f.0)(msg)))
            }
        }
    }
}

/// Shared message-mapping function used by [`VNode::map`].
pub struct MapFn<A, B>(Arc<Box<dyn Fn(A) -> B + Send + Sync>>);

impl<A, B> Clone for MapFn<A, B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A, B> MapFn<A, B> {
    /// Share `f` across every decoder of a mapped subtree.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self(Arc::new(Box::new(f)))
    }
}

/// An immutable description of one UI element or text leaf.
pub enum VNode<Msg> {
    Text(String),
    /// Children are matched positionally across renders.
    Element {
        tag: String,
        attributes: Vec<Attribute<Msg>>,
        children: Vec<VNode<Msg>>,
    },
    /// Children carry a stable key, unique among siblings.
    Keyed {
        tag: String,
        attributes: Vec<Attribute<Msg>>,
        children: Vec<(String, VNode<Msg>)>,
    },
}

impl<Msg> Clone for VNode<Msg> {
    fn clone(&self) -> Self {
        match self {
            VNode::Text(content) => VNode::Text(content.clone()),
            VNode::Element {
                tag,
                attributes,
                children,
            } => VNode::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: children.clone(),
            },
            VNode::Keyed {
                tag,
                attributes,
                children,
            } => VNode::Keyed {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: children.clone(),
            },
        }
    }
}

impl<Msg> fmt::Debug for VNode<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Text(content) => f.debug_tuple("Text").field(content).finish(),
            VNode::Element {
                tag,
                attributes,
                children,
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("attributes", attributes)
                .field("children", children)
                .finish(),
            VNode::Keyed {
                tag,
                attributes,
                children,
            } => f
                .debug_struct("Keyed")
                .field("tag", tag)
                .field("attributes", attributes)
                .field("children", children)
                .finish(),
        }
    }
}

impl<Msg> VNode<Msg> {
    /// The element tag, or `None` for text.
    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Text(_) => None,
            VNode::Element { tag, .. } | VNode::Keyed { tag, .. } => Some(tag),
        }
    }

    /// The declared attributes; empty for text.
    pub fn attributes(&self) -> &[Attribute<Msg>] {
        match self {
            VNode::Text(_) => &[],
            VNode::Element { attributes, .. } | VNode::Keyed { attributes, .. } => attributes,
        }
    }

    /// Number of children, whether positional or keyed.
    pub fn child_count(&self) -> usize {
        match self {
            VNode::Text(_) => 0,
            VNode::Element { children, .. } => children.len(),
            VNode::Keyed { children, .. } => children.len(),
        }
    }

    /// The child at `index`, whether positional or keyed.
    pub fn child(&self, index: usize) -> Option<&VNode<Msg>> {
        match self {
            VNode::Text(_) => None,
            VNode::Element { children, .. } => children.get(index),
            VNode::Keyed { children, .. } => children.get(index).map(|(_, child)| child),
        }
    }
}

impl<Msg: 'static> VNode<Msg> {
    /// Lift a subtree producing `Msg` into one producing `B`.
    ///
    /// ```rust
    /// use oxide_vdom::{node, on, text, Decoder, VNode};
    ///
    /// #[derive(Clone)]
    /// enum Child { Clicked }
    /// enum Parent { Child(Child) }
    ///
    /// let child: VNode<Child> = node("button", vec![on("click", Decoder::succeed(Child::Clicked))], vec![text("go")]);
    /// let parent: VNode<Parent> = child.map(Parent::Child);
    /// assert_eq!(parent.tag(), Some("button"));
    /// ```
    pub fn map<B, F>(self, f: F) -> VNode<B>
    where
        B: 'static,
        F: Fn(Msg) -> B + Send + Sync + 'static,
    {
        self.map_with(&MapFn::new(f))
    }

    fn map_with<B: 'static>(self, f: &MapFn<Msg, B>) -> VNode<B> {
        match self {
            VNode::Text(content) => VNode::Text(content),
            VNode::Element {
                tag,
                attributes,
                children,
            } => VNode::Element {
                tag,
                attributes: attributes.into_iter().map(|a| a.map(f)).collect(),
                children: children.into_iter().map(|c| c.map_with(f)).collect(),
            },
            VNode::Keyed {
                tag,
                attributes,
                children,
            } => VNode::Keyed {
                tag,
                attributes: attributes.into_iter().map(|a| a.map(f)).collect(),
                children: children
                    .into_iter()
                    .map(|(key, c)| (key, c.map_with(f)))
                    .collect(),
            },
        }
    }
}

/// A text leaf.
pub fn text<Msg>(content: impl Into<String>) -> VNode<Msg> {
    VNode::Text(content.into())
}

/// An element whose children are diffed by position.
pub fn node<Msg>(
    tag: impl Into<String>,
    attributes: Vec<Attribute<Msg>>,
    children: Vec<VNode<Msg>>,
) -> VNode<Msg> {
    VNode::Element {
        tag: tag.into(),
        attributes,
        children,
    }
}

/// An element whose children are matched by key, so reordering them
/// relocates the existing subtrees.
pub fn keyed_node<Msg, K: Into<String>>(
    tag: impl Into<String>,
    attributes: Vec<Attribute<Msg>>,
    children: Vec<(K, VNode<Msg>)>,
) -> VNode<Msg> {
    VNode::Keyed {
        tag: tag.into(),
        attributes,
        children: children
            .into_iter()
            .map(|(key, child)| (key.into(), child))
            .collect(),
    }
}

/// A set of inline style entries.
pub fn style<Msg, K, V, I>(entries: I) -> Attribute<Msg>
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    Attribute::Style(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

/// A property assigned as a live field on the render-target node.
pub fn property<Msg>(name: impl Into<String>, value: impl Into<Value>) -> Attribute<Msg> {
    Attribute::Property(name.into(), value.into())
}

/// An attribute set through the render target's attribute path.
pub fn attribute<Msg>(name: impl Into<String>, value: impl Into<String>) -> Attribute<Msg> {
    Attribute::Attribute(name.into(), value.into())
}

/// An event listener that decodes `event` payloads into messages.
pub fn on<Msg>(event: impl Into<String>, decoder: Decoder<Msg>) -> Attribute<Msg> {
    Attribute::Event(event.into(), decoder)
}

/// Attributes of one element grouped by kind and name. Later declarations
/// of the same name win.
pub(crate) struct Facts<'a, Msg> {
    pub(crate) styles: BTreeMap<&'a str, &'a str>,
    pub(crate) properties: BTreeMap<&'a str, &'a Value>,
    pub(crate) attributes: BTreeMap<&'a str, &'a str>,
    pub(crate) events: BTreeMap<&'a str, &'a Decoder<Msg>>,
}

impl<'a, Msg> Facts<'a, Msg> {
    pub(crate) fn organize(declared: &'a [Attribute<Msg>]) -> Self {
        let mut facts = Facts {
            styles: BTreeMap::new(),
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
            events: BTreeMap::new(),
        };
        for attribute in declared {
            match attribute {
                Attribute::Style(entries) => {
                    for (name, value) in entries {
                        facts.styles.insert(name, value);
                    }
                }
                Attribute::Property(name, value) => {
                    facts.properties.insert(name, value);
                }
                Attribute::Attribute(name, value) => {
                    facts.attributes.insert(name, value);
                }
                Attribute::Event(name, decoder) => {
                    facts.events.insert(name, decoder);
                }
            }
        }
        facts
    }
}
