use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context as _, Result, anyhow};
use manos_editor_core::{Command, Editor, EditorConfig, ExtensionRegistry, SerializedRange};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// A recorded editing session: initial content followed by host events.
#[derive(Debug, Deserialize)]
struct Script {
    html: String,
    #[serde(default)]
    config: Option<EditorConfig>,
    #[serde(default)]
    selection: Option<SerializedRange>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    Select { select: SerializedRange },
    Command(Command),
}

fn main() -> Result<()> {
    let default_level = "info";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let mut path: Option<PathBuf> = None;
    let mut as_json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => as_json = true,
            "-h" | "--help" => {
                eprintln!("Usage: manos-editor-replay <script.json> [--json]");
                return Ok(());
            }
            _ => path = Some(PathBuf::from(arg)),
        }
    }
    let path = path.ok_or_else(|| anyhow!("missing script path"))?;

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let editor = replay(script)?;
    if as_json {
        println!("{}", editor.value().to_json_pretty()?);
    } else {
        println!("{}", editor.serialize());
    }
    Ok(())
}

fn replay(script: Script) -> Result<Editor> {
    let config = script.config.unwrap_or_default();
    let debounce = config.debounce();
    let mut editor = Editor::new(config, ExtensionRegistry::standard());
    editor
        .load_html(&script.html)
        .context("failed to load initial markup")?;
    if let Some(selection) = script.selection {
        select(&mut editor, &selection)?;
    }

    let mut now = Instant::now();
    for (ix, step) in script.steps.into_iter().enumerate() {
        match step {
            Step::Select { select: selection } => select(&mut editor, &selection)?,
            Step::Command(command) => {
                tracing::debug!(step = ix, kind = ?command.kind, "replaying command");
                editor.run_command_at(command, now);
            }
        }
        now += debounce;
        editor.tick(now);
    }
    tracing::info!(
        entries = editor.history().len(),
        can_undo = editor.can_undo(),
        "replay finished"
    );
    Ok(editor)
}

fn select(editor: &mut Editor, selection: &SerializedRange) -> Result<()> {
    let range = selection
        .resolve(editor.doc())
        .ok_or_else(|| anyhow!("selection does not resolve against the document"))?;
    editor.set_range(range);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_selection_and_commands() {
        let script: Script = serde_json::from_str(
            r#"{
                "html": "<p>hello world</p>",
                "steps": [
                    { "select": { "start": { "path": [0, 0], "offset": 6 },
                                  "end": { "path": [0, 0], "offset": 11 } } },
                    { "type": "formatBold" }
                ]
            }"#,
        )
        .unwrap();
        let editor = replay(script).unwrap();
        assert_eq!(editor.serialize(), "<p>hello <b>world</b></p>");
        assert!(editor.can_undo());
    }
}
