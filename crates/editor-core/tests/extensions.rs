use manos_editor_core::editing::insert_text;
use manos_editor_core::{
    CAP_INLINE_FORMAT, CAP_LIST, Command, CommandKind, CoreExtension, Editor, EditorConfig,
    EditorError, EditorExtension, EditorState, ExtensionRegistry, Handled, HistoryExtension,
    Position, Range, Result,
};

struct ShoutExtension;

impl EditorExtension for ShoutExtension {
    fn id(&self) -> &'static str {
        "shout"
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        if command.kind != CommandKind::InsertText {
            return Ok(Handled::Declined);
        }
        insert_text(state, &command.value_str().to_uppercase())?;
        Ok(Handled::Claimed)
    }
}

fn caret(editor: &mut Editor, needle: &str) {
    let (leaf, at) = editor.doc().find_text(needle).expect("text present");
    editor.set_range(Range::collapsed(Position::new(leaf, at)));
}

#[test]
fn first_registered_handler_wins() {
    let registry = ExtensionRegistry::new(vec![
        Box::new(ShoutExtension) as Box<dyn EditorExtension>,
        Box::new(HistoryExtension),
        Box::new(CoreExtension),
    ])
    .unwrap();
    let mut editor = Editor::new(EditorConfig::default(), registry);
    editor.load_html("<p>a</p>").unwrap();
    caret(&mut editor, "a");

    editor.run_command(Command::insert_text("b"));
    assert_eq!(editor.serialize(), "<p>Ba</p>");
}

#[test]
fn duplicate_extension_ids_are_rejected() {
    let result = ExtensionRegistry::new(vec![
        Box::new(CoreExtension) as Box<dyn EditorExtension>,
        Box::new(CoreExtension),
    ]);
    assert!(matches!(result, Err(EditorError::DuplicateExtension(id)) if id == "core"));
}

#[test]
fn captions_narrow_capabilities_to_inline_formatting() {
    let html = r#"<figure><img src="a.png"/><figcaption>cap</figcaption></figure><p>text</p>"#;
    let mut editor = Editor::from_html(html).unwrap();
    assert_eq!(editor.serialize(), html);

    caret(&mut editor, "text");
    let outside = editor.selection_capabilities();
    assert!(outside.contains(&CAP_LIST.to_string()));
    assert!(outside.contains(&CAP_INLINE_FORMAT.to_string()));

    caret(&mut editor, "cap");
    let inside = editor.selection_capabilities();
    assert_eq!(inside, vec![CAP_INLINE_FORMAT.to_string()]);
    assert!(inside.iter().all(|c| outside.contains(c)));
}

#[test]
fn wider_selections_never_gain_capabilities() {
    let html = r#"<p>text</p><figure><img src="a.png"/><figcaption>cap</figcaption></figure><p>more</p>"#;
    let mut editor = Editor::from_html(html).unwrap();
    let (text, _) = editor.doc().find_text("text").unwrap();
    let (more, _) = editor.doc().find_text("more").unwrap();

    editor.set_range(Range::new(Position::new(text, 0), Position::new(text, 2)));
    let narrow = editor.selection_capabilities();
    assert!(narrow.contains(&CAP_LIST.to_string()));

    editor.set_range(Range::new(Position::new(text, 0), Position::new(more, 2)));
    let wide = editor.selection_capabilities();
    assert_eq!(wide, vec![CAP_INLINE_FORMAT.to_string()]);
    assert!(wide.iter().all(|c| narrow.contains(c)));
}

#[test]
fn captions_swallow_enter_and_list_commands() {
    let html = r#"<figure><figcaption>cap</figcaption></figure>"#;
    let mut editor = Editor::from_html(html).unwrap();
    caret(&mut editor, "cap");

    editor.run_command(CommandKind::InsertParagraph);
    editor.run_command(CommandKind::InsertUnorderedList);
    assert_eq!(editor.serialize(), html);
}

#[test]
fn minimal_registry_ignores_formatting() {
    let mut editor = Editor::new(EditorConfig::default(), ExtensionRegistry::minimal());
    editor.load_html("<p>ab</p>").unwrap();
    editor.run_command(CommandKind::SelectAll);
    editor.run_command(CommandKind::FormatBold);
    assert_eq!(editor.serialize(), "<p>ab</p>");
    assert!(!editor.selection_capabilities().contains(&CAP_LIST.to_string()));
}
