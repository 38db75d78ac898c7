#![forbid(unsafe_code)]

//! Proptest strategies for element trees.
//!
//! Trees are generated as a plain [`TreeShape`] first so that failures shrink
//! and print readably, then converted with [`TreeShape::to_element`].

use proptest::prelude::*;
use weft_core::Element;

/// Tags drawn from a small pool so that consecutive generations share types
/// often enough to exercise fiber reuse.
pub const TAGS: &[&str] = &["div", "span", "p", "ul", "li"];

const CLASSES: &[&str] = &["a", "b"];

/// A generated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeShape {
    /// A text leaf.
    Text(String),
    /// A host element.
    Node {
        /// Element tag.
        tag: &'static str,
        /// Optional `id` attribute.
        id: Option<u8>,
        /// Optional `class` attribute.
        class: Option<&'static str>,
        /// Children in order.
        children: Vec<TreeShape>,
    },
}

impl TreeShape {
    /// Convert into an element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        match self {
            Self::Text(text) => weft_core::create_text_element(text.clone()),
            Self::Node {
                tag,
                id,
                class,
                children,
            } => {
                let mut builder = Element::host(*tag);
                if let Some(id) = id {
                    builder = builder.attr("id", format!("n{id}"));
                }
                if let Some(class) = class {
                    builder = builder.attr("class", *class);
                }
                builder
                    .children(children.iter().map(Self::to_element))
                    .build()
            }
        }
    }

    /// Fibers a render of this tree produces, excluding the root fiber.
    #[must_use]
    pub fn fiber_count(&self) -> usize {
        match self {
            Self::Text(_) => 1,
            Self::Node { children, .. } => 1 + children.iter().map(Self::fiber_count).sum::<usize>(),
        }
    }
}

fn leaf() -> impl Strategy<Value = TreeShape> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(TreeShape::Text),
        node_head().prop_map(|(tag, id, class)| TreeShape::Node {
            tag,
            id,
            class,
            children: Vec::new(),
        }),
    ]
}

fn node_head() -> impl Strategy<Value = (&'static str, Option<u8>, Option<&'static str>)> {
    (
        prop::sample::select(TAGS),
        prop::option::of(0u8..4),
        prop::option::of(prop::sample::select(CLASSES)),
    )
}

/// Arbitrary host trees, at most `depth` levels below the top element and
/// `width` children per node.
pub fn tree(depth: u32, width: usize) -> impl Strategy<Value = TreeShape> {
    let nested = leaf().prop_recursive(depth, 64, width as u32, move |inner| {
        (node_head(), prop::collection::vec(inner, 0..=width)).prop_map(
            |((tag, id, class), children)| TreeShape::Node {
                tag,
                id,
                class,
                children,
            },
        )
    });
    // The top of a render is always an element.
    (node_head(), prop::collection::vec(nested, 0..=width)).prop_map(
        |((tag, id, class), children)| TreeShape::Node {
            tag,
            id,
            class,
            children,
        },
    )
}

/// Two consecutive generations of a tree.
pub fn generations(depth: u32, width: usize) -> impl Strategy<Value = (TreeShape, TreeShape)> {
    (tree(depth, width), tree(depth, width))
}

/// Per-turn unit budgets for splitting a render.
pub fn turn_budgets() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..6, 1..8)
}
