use oxide_vdom::{
    attribute, diff, keyed_node, node, on, property, style, text, Decoder, PatchOp, VNode, Value,
};

use super::TestMsg;

fn sample_tree() -> VNode<TestMsg> {
    node(
        "section",
        vec![
            attribute("id", "main"),
            property("hidden", false),
            style([("color", "red"), ("margin", "0")]),
            on("click", Decoder::succeed(TestMsg::Increment)),
        ],
        vec![
            text("title"),
            keyed_node(
                "ul",
                vec![],
                vec![
                    ("a", node("li", vec![], vec![text("A")])),
                    ("b", node("li", vec![], vec![text("B")])),
                ],
            ),
        ],
    )
}

#[test]
fn given_identical_trees_should_produce_an_empty_patch() {
    let tree = sample_tree();

    assert!(diff(&tree, &tree).is_empty());
    assert!(diff(&tree, &tree.clone()).is_empty());
}

#[test]
fn given_different_tags_should_replace_the_node() {
    let old: VNode<TestMsg> = node("div", vec![], vec![text("x")]);
    let new: VNode<TestMsg> = node("span", vec![], vec![text("x")]);

    let patch = diff(&old, &new);

    assert_eq!(patch.len(), 1);
    assert!(patch.edits()[0].path.is_empty());
    assert!(matches!(&patch.edits()[0].op, PatchOp::Replace(replacement) if replacement.tag() == Some("span")));
}

#[test]
fn given_text_and_element_should_replace_the_node() {
    let old: VNode<TestMsg> = text("x");
    let new: VNode<TestMsg> = node("b", vec![], vec![]);

    assert_eq!(diff(&old, &new).stats().replaces, 1);
    assert_eq!(diff(&new, &old).stats().replaces, 1);
}

#[test]
fn given_positional_and_keyed_elements_with_the_same_tag_should_replace() {
    let old: VNode<TestMsg> = node("ul", vec![], vec![]);
    let no_children: Vec<(&str, VNode<TestMsg>)> = vec![];
    let new: VNode<TestMsg> = keyed_node("ul", vec![], no_children);

    assert_eq!(diff(&old, &new).stats().replaces, 1);
}

#[test]
fn given_changed_text_should_only_set_text() {
    let old: VNode<TestMsg> = node("p", vec![], vec![text("0")]);
    let new: VNode<TestMsg> = node("p", vec![], vec![text("1")]);

    let patch = diff(&old, &new);

    assert_eq!(patch.len(), 1);
    assert_eq!(patch.edits()[0].path, vec![0]);
    assert!(matches!(&patch.edits()[0].op, PatchOp::SetText(t) if t == "1"));
}

#[test]
fn given_attribute_changes_should_remove_set_and_add_by_name() {
    let old: VNode<TestMsg> = node(
        "input",
        vec![
            attribute("type", "text"),
            attribute("placeholder", "name"),
            property("value", "a"),
            style([("color", "red")]),
        ],
        vec![],
    );
    let new: VNode<TestMsg> = node(
        "input",
        vec![
            attribute("type", "text"),
            attribute("title", "Name"),
            property("value", "b"),
            style([("width", "10px")]),
        ],
        vec![],
    );

    let ops: Vec<String> = diff(&old, &new)
        .into_edits()
        .into_iter()
        .map(|edit| format!("{:?}", edit.op))
        .collect();

    assert_eq!(
        ops,
        vec![
            r#"RemoveStyle("color")"#,
            r#"SetStyle("width", "10px")"#,
            r#"SetProperty("value", String("b"))"#,
            r#"RemoveAttribute("placeholder")"#,
            r#"SetAttribute("title", "Name")"#,
        ]
    );
}

#[test]
fn given_duplicate_attribute_names_should_keep_the_last_declaration() {
    let old: VNode<TestMsg> = node("a", vec![attribute("href", "/x"), attribute("href", "/y")], vec![]);
    let new: VNode<TestMsg> = node("a", vec![attribute("href", "/y")], vec![]);

    assert!(diff(&old, &new).is_empty());
}

#[test]
fn given_more_new_children_should_emit_trailing_inserts() {
    let old: VNode<TestMsg> = node("ol", vec![], vec![text("1")]);
    let new: VNode<TestMsg> = node("ol", vec![], vec![text("1"), text("2"), text("3")]);

    let patch = diff(&old, &new);
    let stats = patch.stats();

    assert_eq!(stats.inserts, 2);
    assert_eq!(stats.removes + stats.moves + stats.replaces, 0);
    match &patch.edits()[0].op {
        PatchOp::ReorderChildren(reorder) => {
            let indices: Vec<usize> = reorder.inserts.iter().map(|i| i.index).collect();
            assert_eq!(indices, vec![1, 2]);
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn given_fewer_new_children_should_emit_trailing_removes() {
    let old: VNode<TestMsg> = node("ol", vec![], vec![text("1"), text("2"), text("3")]);
    let new: VNode<TestMsg> = node("ol", vec![], vec![text("one")]);

    let patch = diff(&old, &new);
    let stats = patch.stats();

    assert_eq!(stats.texts, 1);
    assert_eq!(stats.removes, 2);
    assert_eq!(stats.inserts + stats.moves, 0);
    // Child edits come before the parent's structural edit.
    assert!(matches!(patch.edits()[0].op, PatchOp::SetText(_)));
    assert!(matches!(patch.edits()[1].op, PatchOp::ReorderChildren(_)));
}

#[test]
fn given_a_fresh_decoder_for_the_same_event_should_update_the_listener() {
    let old: VNode<TestMsg> = node("button", vec![on("click", Decoder::succeed(TestMsg::Increment))], vec![]);
    let new: VNode<TestMsg> = node("button", vec![on("click", Decoder::succeed(TestMsg::Increment))], vec![]);

    let patch = diff(&old, &new);

    assert_eq!(patch.len(), 1);
    assert!(matches!(&patch.edits()[0].op, PatchOp::UpdateListener(event, _) if event == "click"));
}

#[test]
fn given_a_shared_decoder_should_leave_the_listener_alone() {
    let decoder = Decoder::succeed(TestMsg::Increment);
    let old: VNode<TestMsg> = node("button", vec![on("click", decoder.clone())], vec![]);
    let new: VNode<TestMsg> = node("button", vec![on("click", decoder)], vec![]);

    assert!(diff(&old, &new).is_empty());
}

#[test]
fn given_events_added_and_removed_should_emit_listener_edits() {
    let old: VNode<TestMsg> = node("div", vec![on("mouseover", Decoder::succeed(TestMsg::Increment))], vec![]);
    let new: VNode<TestMsg> = node("div", vec![on("click", Decoder::succeed(TestMsg::Increment))], vec![]);

    let ops: Vec<String> = diff(&old, &new)
        .edits()
        .iter()
        .map(|edit| format!("{:?}", edit.op))
        .collect();

    assert_eq!(ops, vec![r#"RemoveListener("mouseover")"#, r#"AddListener("click")"#]);
}

#[test]
fn given_a_nested_change_should_address_it_by_index_path() {
    let old: VNode<TestMsg> = node("div", vec![], vec![text("a"), node("p", vec![], vec![text("b")])]);
    let new: VNode<TestMsg> = node(
        "div",
        vec![],
        vec![text("a"), node("p", vec![property("title", Value::from("t"))], vec![text("c")])],
    );

    let patch = diff(&old, &new);

    let paths: Vec<Vec<usize>> = patch.edits().iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec![vec![1], vec![1, 0]]);
}
