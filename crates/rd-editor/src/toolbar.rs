//! Toolbar state and the AI-assist action.

use crate::commands::EditorCommand;
use crate::engine::{Engine, EngineHandle, Replacement, SessionToken};
use crate::error::EditorError;
use crate::input::EventResponse;
use crate::notify::{Notice, Notifier};
use rd_assets::{AssistKind, GenerationRequest, TextGenerator};
use serde::Serialize;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub command: EditorCommand,
    pub label: String,
    pub active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Toolbar;

impl Toolbar {
    /// Buttons in display order.
    pub fn commands() -> Vec<EditorCommand> {
        vec![
            EditorCommand::Bold,
            EditorCommand::Italic,
            EditorCommand::Code,
            EditorCommand::Heading { level: 1 },
            EditorCommand::Heading { level: 2 },
            EditorCommand::Heading { level: 3 },
            EditorCommand::BulletList,
            EditorCommand::OrderedList,
            EditorCommand::Blockquote,
            EditorCommand::CodeBlock,
            EditorCommand::UnsetLink,
            EditorCommand::ClearFormatting,
        ]
    }

    pub fn buttons(engine: &Engine) -> Vec<ButtonState> {
        let editable = engine.is_editable() && !engine.is_closed();
        Self::commands()
            .into_iter()
            .map(|command| {
                let active = engine.is_active(&command);
                let enabled = editable
                    && match command {
                        EditorCommand::UnsetLink => active,
                        _ => true,
                    };
                ButtonState {
                    label: command.label(),
                    command,
                    active,
                    enabled,
                }
            })
            .collect()
    }

    /// Pressing a button must not take focus or the selection from the
    /// document.
    pub fn mouse_down() -> EventResponse {
        EventResponse::PREVENT
    }

    pub fn click(engine: &EngineHandle, command: &EditorCommand) -> bool {
        engine.with_mut(|e| e.apply_command(command))
    }
}

/// An AI-assist request over the selection captured when it started.
pub struct AssistTask {
    engine: EngineHandle,
    generator: Rc<dyn TextGenerator>,
    notifier: Rc<dyn Notifier>,
    kind: AssistKind,
    from: usize,
    to: usize,
    text: String,
    session: SessionToken,
}

impl AssistTask {
    /// Capture the selection. Fails with `NoSelection` when it holds no
    /// text.
    pub fn capture(
        engine: &EngineHandle,
        generator: Rc<dyn TextGenerator>,
        notifier: Rc<dyn Notifier>,
        kind: AssistKind,
    ) -> Result<Self, EditorError> {
        let (selection, text, session, editable) = engine.with(|e| {
            (
                e.selection(),
                e.get_selection_text(),
                e.session(),
                e.is_editable() && !e.is_closed(),
            )
        });
        if !editable {
            return Err(EditorError::NotEditable);
        }
        if text.trim().is_empty() {
            let err = EditorError::NoSelection;
            notifier.notify(Notice::from(&err));
            return Err(err);
        }
        Ok(Self {
            engine: engine.clone(),
            generator,
            notifier,
            kind,
            from: selection.from,
            to: selection.to,
            text,
            session,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Generate and apply. Returns whether the document was changed; a
    /// result that no longer has a place to go is dropped.
    pub async fn run(self) -> Result<bool, EditorError> {
        let request = GenerationRequest::new(self.kind.clone(), self.text.clone());
        let generated = self.generator.generate(&request).await;
        if !self.engine.is_current(self.session) {
            log::debug!("discarding {} result for a stale session", self.kind.as_str());
            return Ok(false);
        }
        let generation = match generated {
            Ok(generation) => generation,
            Err(err) => {
                let err = EditorError::from(err);
                log::warn!("{} failed: {err}", self.kind.label());
                self.notifier.notify(Notice::from(&err));
                return Err(err);
            }
        };

        let (from, to, text) = (self.from, self.to, self.text.as_str());
        let replacement = Replacement::Text(generation.result);
        let applied = self.engine.with_mut(|e| {
            if e.text_between(from, to) == text {
                return e.replace_range(from, to, replacement);
            }
            let sel = e.selection();
            if !sel.is_caret() && e.text_between(sel.from, sel.to) == text {
                return e.replace_range(sel.from, sel.to, replacement);
            }
            log::debug!("selection moved during generation, discarding result");
            false
        });
        if applied {
            self.notifier.notify(Notice::success(format!(
                "{} applied, {} credits remaining",
                self.kind.label(),
                generation.remaining_credits
            )));
        }
        Ok(applied)
    }
}
