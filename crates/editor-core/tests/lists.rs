use manos_editor_core::{Command, CommandKind, Editor, Position, Range};

fn caret(editor: &mut Editor, needle: &str, offset: usize) {
    let (leaf, at) = editor.doc().find_text(needle).expect("text present");
    editor.set_range(Range::collapsed(Position::new(leaf, at + offset)));
}

#[test]
fn indent_nests_under_the_previous_item_and_clamps() {
    let mut editor = Editor::from_html("<ul><li>one</li><li>two</li></ul>").unwrap();
    caret(&mut editor, "two", 1);

    editor.run_command(CommandKind::FormatIndent);
    let nested = "<ul><li>one<ul><li>two</li></ul></li></ul>";
    assert_eq!(editor.serialize(), nested);

    editor.run_command(CommandKind::FormatIndent);
    assert_eq!(editor.serialize(), nested);

    editor.run_command(Command::insert_text("X"));
    assert_eq!(editor.serialize(), "<ul><li>one<ul><li>tXwo</li></ul></li></ul>");
}

#[test]
fn outdent_lifts_a_nested_item_back_to_the_top_level() {
    let mut editor = Editor::from_html("<ul><li>one<ul><li>two</li></ul></li></ul>").unwrap();
    caret(&mut editor, "two", 0);

    editor.run_command(CommandKind::FormatOutdent);
    assert_eq!(editor.serialize(), "<ul><li>one</li><li>two</li></ul>");

    editor.run_command(CommandKind::FormatOutdent);
    assert_eq!(editor.serialize(), "<ul><li>one</li></ul><p>two</p>");
}

#[test]
fn first_item_cannot_be_indented() {
    let html = "<ul><li>one</li><li>two</li></ul>";
    let mut editor = Editor::from_html(html).unwrap();
    caret(&mut editor, "one", 0);

    editor.run_command(CommandKind::FormatIndent);
    assert_eq!(editor.serialize(), html);
}

#[test]
fn list_toggle_converts_paragraphs_and_back() {
    let mut editor = Editor::from_html("<p>a</p><p>b</p>").unwrap();
    let (first, _) = editor.doc().find_text("a").unwrap();
    let (second, _) = editor.doc().find_text("b").unwrap();
    editor.set_range(Range::new(Position::new(first, 0), Position::new(second, 1)));

    editor.run_command(CommandKind::InsertUnorderedList);
    assert_eq!(editor.serialize(), "<ul><li>a</li><li>b</li></ul>");

    editor.run_command(CommandKind::InsertOrderedList);
    assert_eq!(editor.serialize(), "<ol><li>a</li><li>b</li></ol>");

    editor.run_command(CommandKind::InsertOrderedList);
    assert_eq!(editor.serialize(), "<p>a</p><p>b</p>");
}

#[test]
fn enter_in_the_middle_of_an_item_splits_it() {
    let mut editor = Editor::from_html("<ul><li>ab</li></ul>").unwrap();
    caret(&mut editor, "ab", 1);

    editor.run_command(CommandKind::InsertParagraph);
    assert_eq!(editor.serialize(), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn enter_in_an_empty_item_ends_the_list() {
    let mut editor = Editor::from_html("<ul><li>a</li><li><br/></li></ul>").unwrap();
    let root = editor.doc().root();
    let list = editor.doc().child(root, 0).unwrap();
    let empty = editor.doc().child(list, 1).unwrap();
    editor.set_range(Range::collapsed(Position::new(empty, 0)));

    editor.run_command(CommandKind::InsertParagraph);
    assert_eq!(editor.serialize(), "<ul><li>a</li></ul><p><br/></p>");
}

#[test]
fn backspace_at_item_start_merges_into_the_previous_item() {
    let mut editor = Editor::from_html("<ul><li>one</li><li>two</li></ul>").unwrap();
    caret(&mut editor, "two", 0);

    editor.run_command(CommandKind::DeleteContentBackward);
    assert_eq!(editor.serialize(), "<ul><li>onetwo</li></ul>");
}

#[test]
fn backspace_at_the_first_item_merges_into_the_paragraph_before() {
    let mut editor = Editor::from_html("<p>x</p><ul><li>one</li><li>two</li></ul>").unwrap();
    caret(&mut editor, "one", 0);

    editor.run_command(CommandKind::DeleteContentBackward);
    assert_eq!(editor.serialize(), "<p>xone</p><ul><li>two</li></ul>");

    editor.run_command(Command::insert_text("Z"));
    assert_eq!(editor.serialize(), "<p>xZone</p><ul><li>two</li></ul>");
}

#[test]
fn forward_delete_at_item_end_pulls_up_the_next_item() {
    let mut editor = Editor::from_html("<ul><li>one</li><li>two</li></ul>").unwrap();
    caret(&mut editor, "one", 3);

    editor.run_command(CommandKind::DeleteContentForward);
    assert_eq!(editor.serialize(), "<ul><li>onetwo</li></ul>");

    editor.run_command(Command::insert_text("X"));
    assert_eq!(editor.serialize(), "<ul><li>oneXtwo</li></ul>");
}

#[test]
fn forward_delete_from_a_paragraph_absorbs_the_first_item() {
    let mut editor = Editor::from_html("<p>x</p><ul><li>one</li><li>two</li></ul>").unwrap();
    caret(&mut editor, "x", 1);

    editor.run_command(CommandKind::DeleteContentForward);
    assert_eq!(editor.serialize(), "<p>xone</p><ul><li>two</li></ul>");
}

#[test]
fn backspace_at_the_very_first_item_does_nothing() {
    let html = "<ul><li>one</li></ul>";
    let mut editor = Editor::from_html(html).unwrap();
    caret(&mut editor, "one", 0);

    editor.run_command(CommandKind::DeleteContentBackward);
    assert_eq!(editor.serialize(), html);
}

#[test]
fn block_format_inside_a_list_converts_the_item() {
    let mut editor = Editor::from_html("<ul><li>a</li></ul>").unwrap();
    caret(&mut editor, "a", 0);

    editor.run_command(Command::new(CommandKind::FormatBlock).value("h2"));
    assert_eq!(editor.serialize(), "<h2>a</h2>");
}
