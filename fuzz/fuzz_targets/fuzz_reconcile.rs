#![no_main]

//! Fuzz two consecutive generations through reconcile and commit.
//!
//! The second generation is rendered over the first in arbitrary turn
//! slices; the surface must end up identical to a fresh render of the second
//! generation, and no structural mutation may happen before the final turn.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_core::Element;
use weft_harness::Harness;

const TAGS: [&str; 4] = ["div", "span", "p", "li"];
const MAX_DEPTH: usize = 6;
const MAX_CHILDREN: usize = 6;

#[derive(Debug, Arbitrary)]
struct Node {
    tag: u8,
    id: Option<u8>,
    text: Option<u8>,
    children: Vec<Node>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    first: Node,
    second: Node,
    budgets: Vec<u8>,
}

fn to_element(node: &Node, depth: usize) -> Element {
    let mut builder = Element::host(TAGS[usize::from(node.tag) % TAGS.len()]);
    if let Some(id) = node.id {
        builder = builder.attr("id", i64::from(id % 4));
    }
    if let Some(text) = node.text {
        builder = builder.child(format!("t{}", text % 3));
    }
    if depth < MAX_DEPTH {
        builder = builder.children(
            node.children
                .iter()
                .take(MAX_CHILDREN)
                .map(|child| to_element(child, depth + 1)),
        );
    }
    builder.build()
}

fn run_sliced(harness: &Harness, element: Element, budgets: &[u8]) {
    harness.render(element);
    let mut turn = 0;
    while harness.has_pending_work() {
        let units = budgets.get(turn).map_or(1, |b| usize::from(b % 8));
        harness.turn(units);
        turn += 1;
        if harness.has_pending_work() {
            assert!(harness.surface().log().iter().all(|m| !m.is_structural()));
        }
    }
}

fuzz_target!(|input: Input| {
    let first = to_element(&input.first, 0);
    let second = to_element(&input.second, 0);

    let harness = Harness::new();
    run_sliced(&harness, first, &input.budgets);
    harness.surface_mut().take_log();
    run_sliced(&harness, second.clone(), &input.budgets);

    let fresh = Harness::new();
    fresh.mount(second);
    assert_eq!(harness.markup(), fresh.markup());
});
