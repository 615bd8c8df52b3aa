use manos_editor_core::{Command, CommandKind, Editor, Position, Range};

fn select(editor: &mut Editor, needle: &str) {
    let (leaf, offset) = editor.doc().find_text(needle).expect("text present");
    editor.set_range(Range::new(
        Position::new(leaf, offset),
        Position::new(leaf, offset + needle.len()),
    ));
}

#[test]
fn bold_toggles_on_and_off() {
    let mut editor = Editor::from_html("<p>hello world</p>").unwrap();
    select(&mut editor, "world");

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>hello <b>world</b></p>");

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>hello world</p>");
}

#[test]
fn bold_wraps_an_existing_italic_and_comes_off_again() {
    let html = "<p>Hello <i>world</i></p>";
    let mut editor = Editor::from_html(html).unwrap();
    select(&mut editor, "world");

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>Hello <b><i>world</i></b></p>");

    select(&mut editor, "world");
    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), html);
}

#[test]
fn unbolding_the_middle_keeps_both_sides_bold() {
    let mut editor = Editor::from_html("<p><b>abcdef</b></p>").unwrap();
    select(&mut editor, "cd");

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p><b>ab</b>cd<b>ef</b></p>");

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p><b>abcdef</b></p>");
}

#[test]
fn backwards_selection_formats_like_a_forward_one() {
    let mut editor = Editor::from_html("<p>abcdef</p>").unwrap();
    let (leaf, _) = editor.doc().find_text("abcdef").unwrap();
    editor.set_range(Range::new(Position::new(leaf, 4), Position::new(leaf, 1)));

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>a<b>bcd</b>ef</p>");
}

#[test]
fn italic_toggle_cycle_returns_to_the_same_markup() {
    let mut editor = Editor::from_html("<p>ab<i>cd</i></p>").unwrap();
    editor.run_command(CommandKind::SelectAll);

    editor.run_command(CommandKind::FormatItalic);
    let once = editor.serialize();
    assert_eq!(once, "<p><i>abcd</i></p>");

    editor.run_command(CommandKind::SelectAll);
    editor.run_command(CommandKind::FormatItalic);
    editor.run_command(CommandKind::SelectAll);
    editor.run_command(CommandKind::FormatItalic);
    assert_eq!(editor.serialize(), once);
}

#[test]
fn bold_across_blocks_wraps_each_block_separately() {
    let mut editor = Editor::from_html("<p>ab</p><p>cd</p>").unwrap();
    let (first, _) = editor.doc().find_text("ab").unwrap();
    let (second, _) = editor.doc().find_text("cd").unwrap();
    editor.set_range(Range::new(Position::new(first, 1), Position::new(second, 1)));

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>a<b>b</b></p><p><b>c</b>d</p>");
}

#[test]
fn collapsed_toggle_formats_the_next_typed_text() {
    let mut editor = Editor::from_html("<p>ab</p>").unwrap();
    let (leaf, _) = editor.doc().find_text("ab").unwrap();
    editor.set_range(Range::collapsed(Position::new(leaf, 1)));

    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>ab</p>");
    assert_eq!(editor.state().pending.len(), 1);

    editor.run_command(Command::insert_text("X"));
    assert_eq!(editor.serialize(), "<p>a<b>X</b>b</p>");
    assert!(editor.state().pending.is_empty());
}

#[test]
fn host_selection_change_drops_pending_formats() {
    let mut editor = Editor::from_html("<p>ab</p>").unwrap();
    let (leaf, _) = editor.doc().find_text("ab").unwrap();
    editor.set_range(Range::collapsed(Position::new(leaf, 1)));
    editor.run_command(CommandKind::FormatBold);

    editor.set_range(Range::collapsed(Position::new(leaf, 2)));
    editor.run_command(Command::insert_text("X"));
    assert_eq!(editor.serialize(), "<p>abX</p>");
}

#[test]
fn moving_the_caret_by_command_drops_pending_formats() {
    let mut editor = Editor::from_html("<p>abc</p>").unwrap();
    let (leaf, _) = editor.doc().find_text("abc").unwrap();
    editor.set_range(Range::collapsed(Position::new(leaf, 2)));
    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.state().pending.len(), 1);

    editor.run_command(CommandKind::DeleteContentBackward);
    assert!(editor.state().pending.is_empty());

    editor.run_command(Command::insert_text("X"));
    assert_eq!(editor.serialize(), "<p>aXc</p>");
}

#[test]
fn remove_format_unwraps_inline_styles() {
    let mut editor = Editor::from_html("<p><b>ab</b><i>cd</i></p>").unwrap();
    editor.run_command(CommandKind::SelectAll);
    editor.run_command(CommandKind::FormatRemove);
    assert_eq!(editor.serialize(), "<p>abcd</p>");
}

#[test]
fn link_is_created_and_removed_by_href() {
    let mut editor = Editor::from_html("<p>hello</p>").unwrap();
    select(&mut editor, "hello");

    editor.run_command(Command::new(CommandKind::InsertLink).value("https://example.com"));
    assert_eq!(
        editor.serialize(),
        r#"<p><a href="https://example.com">hello</a></p>"#
    );

    editor.run_command(Command::new(CommandKind::InsertLink).value(""));
    assert_eq!(editor.serialize(), "<p>hello</p>");
}

#[test]
fn mark_keeps_both_colours_on_one_wrapper() {
    let mut editor = Editor::from_html("<p>ab</p>").unwrap();
    select(&mut editor, "ab");

    editor.run_command(Command::new(CommandKind::FormatFontColor).value("red"));
    assert_eq!(editor.serialize(), r#"<p><mark color="red">ab</mark></p>"#);

    editor.run_command(Command::new(CommandKind::FormatBackColor).value("yellow"));
    assert_eq!(
        editor.serialize(),
        r#"<p><mark background="yellow" color="red">ab</mark></p>"#
    );
}

#[test]
fn block_format_retags_the_current_block() {
    let mut editor = Editor::from_html("<p>title</p><p>body</p>").unwrap();
    let (leaf, _) = editor.doc().find_text("title").unwrap();
    editor.set_range(Range::collapsed(Position::new(leaf, 2)));

    editor.run_command(Command::new(CommandKind::FormatBlock).value("h2"));
    assert_eq!(editor.serialize(), "<h2>title</h2><p>body</p>");

    editor.run_command(Command::new(CommandKind::FormatBlock).value("marquee"));
    assert_eq!(editor.serialize(), "<h2>title</h2><p>body</p>");
}
