#![forbid(unsafe_code)]

//! Immutable element descriptions.
//!
//! An [`Element`] is the declarative input to reconciliation: an
//! [`ElementType`], a [`Props`] bag, and an ordered list of child elements.
//! Elements are reference counted, so handing the same description to several
//! fibers never copies it.
//!
//! # Invariants
//!
//! 1. An element is never mutated after construction.
//! 2. Bare text and numeric children are wrapped into a synthetic
//!    [`ElementType::Text`] element whose [`TEXT_VALUE_ATTR`] attribute holds
//!    the stringified value; text elements have no children.
//! 3. Type equality is exact: host tags compare by string, components compare
//!    by identity of their render function.
//!
//! # Example
//!
//! ```
//! use weft_core::element::{Element, ElementType};
//!
//! let tree = Element::host("div")
//!     .attr("id", "foo")
//!     .child(Element::host("a").child("bar"))
//!     .child(Element::host("b"))
//!     .build();
//!
//! assert_eq!(tree.children().len(), 2);
//! assert_eq!(*tree.children()[0].children()[0].ty(), ElementType::Text);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::hooks::Scope;
use crate::props::{Event, Listener, PropValue, Props};

/// Attribute holding a text element's value.
pub const TEXT_VALUE_ATTR: &str = "nodeValue";

/// Ordered child list of an element.
pub type Children = SmallVec<[Element; 4]>;

type RenderFn = dyn Fn(&mut Scope<'_>) -> Element;

// ============================================================================
// Component
// ============================================================================

/// A named render function producing exactly one element.
///
/// Clones share the function; two components are the same type only when
/// they share it, so create each component once and reuse the handle.
#[derive(Clone)]
pub struct Component {
    name: Cow<'static, str>,
    render: Rc<RenderFn>,
}

impl Component {
    /// Create a component from a name and a render function.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        render: impl Fn(&mut Scope<'_>) -> Element + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    /// Component name (diagnostics only).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the render function.
    pub fn render(&self, scope: &mut Scope<'_>) -> Element {
        (self.render)(scope)
    }

    /// Whether both handles share one render function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

// ============================================================================
// ElementType
// ============================================================================

/// What an element describes.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// A built-in physical element kind, named by tag.
    Host(Cow<'static, str>),
    /// The reserved text kind.
    Text,
    /// A user component.
    Component(Component),
}

impl ElementType {
    /// Host element type for `tag`.
    pub fn host(tag: impl Into<Cow<'static, str>>) -> Self {
        Self::Host(tag.into())
    }

    /// Short label for logs and snapshots.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Host(tag) => tag,
            Self::Text => "#text",
            Self::Component(component) => component.name(),
        }
    }
}

impl From<&'static str> for ElementType {
    fn from(tag: &'static str) -> Self {
        Self::Host(Cow::Borrowed(tag))
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        Self::Host(Cow::Owned(tag))
    }
}

impl From<&Component> for ElementType {
    fn from(component: &Component) -> Self {
        Self::Component(component.clone())
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        Self::Component(component)
    }
}

// ============================================================================
// Child
// ============================================================================

/// Anything accepted in a child position.
#[derive(Debug, Clone)]
pub enum Child {
    /// A nested element.
    Element(Element),
    /// Text, wrapped into a text element on construction.
    Text(String),
}

impl Child {
    fn into_element(self) -> Element {
        match self {
            Self::Element(element) => element,
            Self::Text(text) => create_text_element(text),
        }
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Self::Element(builder.build())
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Self::Text(n.to_string())
    }
}

impl From<i32> for Child {
    fn from(n: i32) -> Self {
        Self::Text(n.to_string())
    }
}

impl From<u32> for Child {
    fn from(n: u32) -> Self {
        Self::Text(n.to_string())
    }
}

impl From<usize> for Child {
    fn from(n: usize) -> Self {
        Self::Text(n.to_string())
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Self::Text(format_number(n))
    }
}

/// Stringify a float the way a text node displays it: integral values drop
/// the fraction, infinities are spelled out.
fn format_number(n: f64) -> String {
    if n.is_infinite() {
        let spelled = if n > 0.0 { "Infinity" } else { "-Infinity" };
        spelled.to_owned()
    } else {
        n.to_string()
    }
}

// ============================================================================
// Element
// ============================================================================

struct ElementData {
    ty: ElementType,
    props: Props,
    children: Children,
}

/// An immutable, shareable element description.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// Start building a host element.
    pub fn host(tag: impl Into<Cow<'static, str>>) -> ElementBuilder {
        ElementBuilder::new(ElementType::host(tag))
    }

    /// Start building a component element.
    pub fn component(component: &Component) -> ElementBuilder {
        ElementBuilder::new(ElementType::Component(component.clone()))
    }

    /// Element type.
    #[must_use]
    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    /// Property bag.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Children in order.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.0.children
    }

    /// Text value of a text element.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.0.ty {
            ElementType::Text => self.0.props.str_attr(TEXT_VALUE_ATTR),
            _ => None,
        }
    }

    /// Whether both handles share one description.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("ty", &self.0.ty.label())
            .field("props", &self.0.props)
            .field("children", &self.0.children)
            .finish()
    }
}

/// Build an element from a type, a property bag, and children.
///
/// Text and numeric children become text elements.
pub fn create_element<C: Into<Child>>(
    ty: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = C>,
) -> Element {
    let ty = ty.into();
    let children = match ty {
        ElementType::Text => Children::new(),
        _ => children
            .into_iter()
            .map(|child| child.into().into_element())
            .collect(),
    };
    Element(Rc::new(ElementData {
        ty,
        props,
        children,
    }))
}

/// Build a text element holding `value`.
pub fn create_text_element(value: impl Into<String>) -> Element {
    Element(Rc::new(ElementData {
        ty: ElementType::Text,
        props: Props::new().with_attr(TEXT_VALUE_ATTR, PropValue::Str(value.into())),
        children: Children::new(),
    }))
}

// ============================================================================
// Builder
// ============================================================================

/// Incremental element construction.
#[derive(Debug, Clone)]
#[must_use = "call `build()` to obtain the element"]
pub struct ElementBuilder {
    ty: ElementType,
    props: Props,
    children: Vec<Child>,
}

impl ElementBuilder {
    /// Start from a type with no properties or children.
    pub fn new(ty: impl Into<ElementType>) -> Self {
        Self {
            ty: ty.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.set_attr(name, value);
        self
    }

    /// Install an event listener.
    pub fn on(mut self, event: impl Into<String>, callback: impl Fn(&Event) + 'static) -> Self {
        self.props.set_listener(event, Listener::new(callback));
        self
    }

    /// Install an existing listener handle.
    pub fn listener(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.props.set_listener(event, listener);
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Finish the element.
    #[must_use]
    pub fn build(self) -> Element {
        create_element(self.ty, self.props, self.children)
    }
}
