use manos_editor_core::{
    Command, CommandKind, EMBED_PREVIEW_CLASS, EMBED_TAG, Editor, EditorValue, Position, Range,
};

#[test]
fn markup_round_trips_unchanged() {
    let html = concat!(
        r#"<h1>Title</h1><p>plain <b>bold</b> <a href="https://example.com" title="t">link</a></p>"#,
        r#"<ul><li>one<ol><li>two</li></ol></li></ul>"#,
        r#"<blockquote>quote</blockquote><p>a &amp; b &lt; c</p>"#,
    );
    let editor = Editor::from_html(html).unwrap();
    assert_eq!(editor.serialize(), html);

    let again = Editor::from_html(&editor.serialize()).unwrap();
    assert_eq!(again.serialize(), html);
}

#[test]
fn deleting_all_text_of_a_wrapper_keeps_markup_stable() {
    let mut editor = Editor::from_html("<p>a<b>x</b></p>").unwrap();
    let (leaf, _) = editor.doc().find_text("x").unwrap();
    editor.set_range(Range::new(Position::new(leaf, 0), Position::new(leaf, 1)));
    editor.run_command(CommandKind::DeleteContentBackward);

    let once = editor.serialize();
    assert_eq!(once, "<p>a</p>");
    let again = Editor::from_html(&once).unwrap();
    assert_eq!(again.serialize(), once);

    editor.run_command(Command::insert_text("y"));
    assert_eq!(editor.serialize(), "<p>ay</p>");
}

#[test]
fn ui_only_nodes_and_attributes_are_not_serialized() {
    let html = r#"<p data-ui-hint="x">a<editor-ui>overlay</editor-ui></p>"#;
    let editor = Editor::from_html(html).unwrap();
    assert_eq!(editor.serialize(), "<p>a</p>");
}

#[test]
fn embeds_serialize_as_their_bare_element() {
    let html = r#"<embed-block data-src="clip.mp4"/><p>after</p>"#;
    let editor = Editor::from_html(html).unwrap();
    assert_eq!(editor.serialize(), html);

    let root = editor.doc().root();
    let embed = editor.doc().child(root, 0).unwrap();
    assert!(editor.doc().has_tag(embed, EMBED_TAG));
    assert!(editor.doc().is_non_editable(embed));
    let preview = editor.doc().first_child(embed).unwrap();
    assert_eq!(editor.doc().attr(preview, "class"), Some(EMBED_PREVIEW_CLASS));
}

#[test]
fn editor_value_survives_json() {
    let editor = Editor::from_html("<p>hello <i>there</i></p>").unwrap();
    let json = editor.value().to_json_pretty().unwrap();

    let value = EditorValue::from_json_str(&json).unwrap();
    assert_eq!(value.schema, "manos-editor");
    assert_eq!(value.version, 1);

    let mut restored = Editor::from_html("").unwrap();
    restored.load_value(&value).unwrap();
    assert_eq!(restored.serialize(), editor.serialize());
}

#[test]
fn editor_value_fills_in_missing_schema() {
    let value = EditorValue::from_json_str(r#"{ "html": "<p>a</p>" }"#).unwrap();
    assert_eq!(value, EditorValue::from_html("<p>a</p>"));
}
