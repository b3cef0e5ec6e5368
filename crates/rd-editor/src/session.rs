//! One open document: the engine handle plus the dirty flag the host uses
//! to decide whether a save is due.

use crate::engine::{Engine, EngineHandle, FocusTarget};
use crate::intercept::{InputInterceptor, PositionResolver};
use crate::notify::Notifier;
use crate::sync::SyncOutcome;
use rd_assets::AssetUploader;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Host surface the editor is embedded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorVariant {
    /// Findings, descriptions, remediation text.
    #[default]
    Standard,
    /// Evidence panes: picked screenshots always append to the end.
    Evidence,
}

pub struct EditorSession {
    handle: EngineHandle,
    dirty: Rc<Cell<bool>>,
    variant: EditorVariant,
}

impl EditorSession {
    pub fn open(content: &str, editable: bool, variant: EditorVariant) -> Self {
        let mut engine = Engine::initialize(content, editable);
        let dirty = Rc::new(Cell::new(false));
        let flag = dirty.clone();
        engine.on_update(move |_| flag.set(true));
        log::debug!("opened {variant:?} session {:?}", engine.session());
        Self {
            handle: EngineHandle::new(engine),
            dirty,
            variant,
        }
    }

    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    pub fn variant(&self) -> EditorVariant {
        self.variant
    }

    pub fn on_update(&self, listener: impl FnMut(&str) + 'static) {
        self.handle.with_mut(|engine| engine.on_update(listener));
    }

    pub fn get_content(&self) -> String {
        self.handle.with(Engine::get_content)
    }

    pub fn receive_external(&self, value: &str) -> SyncOutcome {
        self.handle.with_mut(|engine| engine.receive_external(value))
    }

    pub fn focus(&self, target: FocusTarget) {
        self.handle.with_mut(|engine| engine.focus(target));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn mark_saved(&self) {
        self.dirty.set(false);
    }

    pub fn interceptor(
        &self,
        uploader: Rc<dyn AssetUploader>,
        resolver: Rc<dyn PositionResolver>,
        notifier: Rc<dyn Notifier>,
    ) -> InputInterceptor {
        InputInterceptor::new(self.handle.clone(), uploader, resolver, notifier, self.variant)
    }

    pub fn close(&self) {
        self.handle.with_mut(Engine::close);
    }
}
