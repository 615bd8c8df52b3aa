use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use manos_editor_core::{
    Command, CommandKind, Editor, EditorConfig, ExtensionRegistry, Position, Range,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn caret_at_end(editor: &mut Editor, needle: &str) {
    let (leaf, at) = editor.doc().find_text(needle).expect("text present");
    editor.set_range(Range::collapsed(Position::new(leaf, at + needle.len())));
}

#[test]
fn bursts_of_typing_coalesce_into_one_entry() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    editor.run_command_at(Command::insert_text("b"), t0);
    editor.run_command_at(Command::insert_text("c"), t0 + ms(100));
    assert!(editor.history().has_pending());
    assert!(!editor.tick(t0 + ms(200)));

    assert!(editor.tick(t0 + ms(400)));
    assert_eq!(editor.history().len(), 2);
    assert_eq!(editor.serialize(), "<p>abc</p>");
}

#[test]
fn undo_then_redo_restores_each_state() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    editor.run_command_at(Command::insert_text("b"), t0);
    editor.tick(t0 + ms(400));
    assert!(editor.can_undo());

    editor.run_command_at(CommandKind::HistoryUndo, t0 + ms(500));
    assert_eq!(editor.serialize(), "<p>a</p>");
    assert!(editor.can_redo());

    editor.run_command_at(CommandKind::HistoryRedo, t0 + ms(600));
    assert_eq!(editor.serialize(), "<p>ab</p>");
    assert!(!editor.can_redo());
}

#[test]
fn undo_and_redo_restore_the_selection() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    editor.run_command_at(Command::insert_text("b"), t0);
    editor.tick(t0 + ms(400));

    editor.run_command_at(CommandKind::HistoryUndo, t0 + ms(500));
    let range = editor.range().expect("selection after undo");
    assert!(range.is_collapsed());
    assert_eq!(editor.doc().text(range.start.node), Some("a"));
    assert_eq!(range.start.offset, 0);

    editor.run_command_at(CommandKind::HistoryRedo, t0 + ms(600));
    let range = editor.range().expect("selection after redo");
    assert!(range.is_collapsed());
    assert_eq!(editor.doc().text(range.start.node), Some("ab"));
    assert_eq!(range.start.offset, 2);
}

#[test]
fn undo_commits_pending_changes_first() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    editor.run_command_at(Command::insert_text("b"), t0);
    editor.run_command_at(CommandKind::HistoryUndo, t0 + ms(10));
    assert_eq!(editor.serialize(), "<p>a</p>");

    editor.run_command_at(CommandKind::HistoryRedo, t0 + ms(20));
    assert_eq!(editor.serialize(), "<p>ab</p>");
}

#[test]
fn a_new_edit_after_undo_discards_the_redo_branch() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    editor.run_command_at(Command::insert_text("b"), t0);
    editor.tick(t0 + ms(400));
    editor.run_command_at(CommandKind::HistoryUndo, t0 + ms(500));
    caret_at_end(&mut editor, "a");
    editor.run_command_at(Command::insert_text("z"), t0 + ms(600));
    editor.tick(t0 + ms(1000));

    assert_eq!(editor.serialize(), "<p>az</p>");
    assert!(!editor.can_redo());
    assert_eq!(editor.history().len(), 2);
}

#[test]
fn history_is_capped() {
    let config = EditorConfig {
        history_cap: 3,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(config, ExtensionRegistry::standard());
    editor.load_html("<p>a</p>").unwrap();
    caret_at_end(&mut editor, "a");

    let t0 = Instant::now();
    for step in 0..5u64 {
        let at = t0 + ms(step * 1000);
        editor.run_command_at(Command::insert_text("x"), at);
        editor.tick(at + ms(400));
    }
    assert_eq!(editor.history().len(), 3);
    assert_eq!(editor.serialize(), "<p>axxxxx</p>");
}

#[test]
fn set_content_is_undoable_but_load_html_is_not() {
    let t0 = Instant::now();
    let mut editor = Editor::from_html("<p>a</p>").unwrap();

    editor.set_content_at("<p>b</p>", t0).unwrap();
    editor.tick(t0 + ms(400));
    editor.run_command_at(CommandKind::HistoryUndo, t0 + ms(500));
    assert_eq!(editor.serialize(), "<p>a</p>");

    editor.load_html("<p>c</p>").unwrap();
    assert!(!editor.can_undo());
}

#[test]
fn listeners_see_every_published_change_once() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut editor = Editor::from_html("<p>a</p>").unwrap();
    let sink = seen.clone();
    editor.on_change(move |html| sink.borrow_mut().push(html.to_string()));
    caret_at_end(&mut editor, "a");

    editor.run_command(Command::insert_text("b"));
    editor.run_command(CommandKind::FormatIndent);
    editor.flush_changes();

    assert_eq!(*seen.borrow(), vec!["<p>ab</p>".to_string()]);
}
