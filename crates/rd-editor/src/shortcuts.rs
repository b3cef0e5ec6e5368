//! Keyboard shortcut resolution.
//!
//! `Mod` is Cmd on macOS and Ctrl elsewhere; both are accepted. Keys typed
//! inside node view inputs never reach the document shortcuts.

use crate::commands::EditorCommand;
use crate::input::{KeyEvent, KeyOrigin, Modifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutAction {
    Command(EditorCommand),
    SelectAll,
    /// Ask the host for a link target.
    Link,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutMap;

impl ShortcutMap {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        self.resolve(&event.key, event.modifiers, event.origin)
    }

    pub fn resolve(&self, key: &str, mods: Modifiers, origin: KeyOrigin) -> Option<ShortcutAction> {
        if origin == KeyOrigin::NodeViewInput || !mods.command() {
            return None;
        }
        let key = key.to_lowercase();
        let command = |c| Some(ShortcutAction::Command(c));
        match (key.as_str(), mods.shift, mods.alt) {
            ("b", false, false) => command(EditorCommand::Bold),
            ("i", false, false) => command(EditorCommand::Italic),
            ("e", false, false) => command(EditorCommand::Code),
            ("a", false, false) => Some(ShortcutAction::SelectAll),
            ("k", false, false) => Some(ShortcutAction::Link),
            ("\\", false, false) => command(EditorCommand::ClearFormatting),

            ("1" | "¡", false, true) => command(EditorCommand::Heading { level: 1 }),
            ("2" | "™", false, true) => command(EditorCommand::Heading { level: 2 }),
            ("3" | "£", false, true) => command(EditorCommand::Heading { level: 3 }),
            ("c" | "ç", false, true) => command(EditorCommand::CodeBlock),

            ("8" | "*", true, false) => command(EditorCommand::BulletList),
            ("7" | "&", true, false) => command(EditorCommand::OrderedList),
            ("b", true, false) => command(EditorCommand::Blockquote),

            _ => None,
        }
    }
}
