#![forbid(unsafe_code)]

//! Snapshot tests for rendered markup.
//!
//! Run `BLESS=1 cargo test --package weft-harness` to create/update snapshots.

use weft_core::{Component, Element, Event};
use weft_harness::{Harness, assert_snapshot};

fn todo_list() -> Component {
    Component::new("TodoList", |scope| {
        let (items, set_items) = scope.use_state(Vec::<String>::new());
        Element::host("div")
            .child(
                Element::host("button")
                    .on("click", move |event| {
                        let text = event.value.clone().unwrap_or_default();
                        set_items.update(move |items| {
                            let mut next = items.clone();
                            next.push(text.clone());
                            next
                        });
                    })
                    .child("add"),
            )
            .child(
                Element::host("ul")
                    .children(items.iter().map(|item| Element::host("li").child(item.clone()))),
            )
            .build()
    })
}

// ============================================================================
// Host trees
// ============================================================================

#[test]
fn snapshot_sample_mount() {
    let harness = Harness::new();
    harness.mount(
        Element::host("div")
            .attr("id", "foo")
            .child(Element::host("a").child("bar"))
            .child(Element::host("b"))
            .build(),
    );
    assert_snapshot!("sample_mount", harness.markup());
}

// ============================================================================
// Components
// ============================================================================

#[test]
fn snapshot_counter_two_clicks() {
    let counter = Component::new("Counter", |scope| {
        let (count, set) = scope.use_state(1_i64);
        Element::host("h1")
            .on("click", move |_| set.update(|c| c + 1))
            .child("Count: ")
            .child(count)
            .build()
    });
    let harness = Harness::new();
    harness.mount(Element::component(&counter).build());
    for _ in 0..2 {
        harness.dispatch_to("h1", &Event::new("click"));
        harness.settle(16);
    }
    assert_snapshot!("counter_two_clicks", harness.markup());
}

#[test]
fn snapshot_todo_empty() {
    let harness = Harness::new();
    harness.mount(Element::component(&todo_list()).build());
    assert_snapshot!("todo_empty", harness.markup());
}

#[test]
fn snapshot_todo_two_items() {
    let harness = Harness::new();
    harness.mount(Element::component(&todo_list()).build());
    for item in ["milk", "eggs"] {
        harness.dispatch_to("button", &Event::new("click").with_value(item));
        harness.flush();
    }
    assert_snapshot!("todo_two_items", harness.markup());
}
