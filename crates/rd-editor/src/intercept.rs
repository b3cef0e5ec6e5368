//! Drop, paste, and file-picker interception.
//!
//! Each path answers the native event synchronously and hands back an
//! [`InsertTask`] for the async part: validate, upload, then insert the
//! image where the event pointed. The insertion target is resolved only
//! once the upload completes, against whatever the document is then.

use crate::engine::{EngineHandle, SessionToken};
use crate::error::EditorError;
use crate::input::{DragOverEvent, DropEvent, DropTarget, EventResponse, PasteEvent};
use crate::notify::{Notice, Notifier};
use crate::session::EditorVariant;
use rd_assets::{AssetUploader, LocalFile};
use rd_core::{Block, ImageAttrs, NodeId};
use std::rc::Rc;

/// Maps viewport coordinates to a document position.
pub trait PositionResolver {
    fn resolve_position(&self, x: f64, y: f64) -> Option<usize>;
}

/// Resolver for hosts without a layout; every drop appends.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl PositionResolver for NoLayout {
    fn resolve_position(&self, _x: f64, _y: f64) -> Option<usize> {
        None
    }
}

/// Where an uploaded image goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertTarget {
    /// Drop point; falls back to the end when it no longer resolves.
    Coordinates { x: f64, y: f64 },
    End,
    /// Replace the selection as it stands at completion.
    Selection,
    Caret,
}

/// The synchronous answer to an input event.
pub struct Interception {
    pub response: EventResponse,
    pub task: Option<InsertTask>,
}

impl Interception {
    fn ignored() -> Self {
        Self {
            response: EventResponse::IGNORED,
            task: None,
        }
    }
}

pub struct InputInterceptor {
    engine: EngineHandle,
    uploader: Rc<dyn AssetUploader>,
    resolver: Rc<dyn PositionResolver>,
    notifier: Rc<dyn Notifier>,
    variant: EditorVariant,
}

impl InputInterceptor {
    pub fn new(
        engine: EngineHandle,
        uploader: Rc<dyn AssetUploader>,
        resolver: Rc<dyn PositionResolver>,
        notifier: Rc<dyn Notifier>,
        variant: EditorVariant,
    ) -> Self {
        Self {
            engine,
            uploader,
            resolver,
            notifier,
            variant,
        }
    }

    fn editable(&self) -> bool {
        self.engine.with(|e| e.is_editable() && !e.is_closed())
    }

    fn task(&self, file: LocalFile, target: InsertTarget) -> InsertTask {
        InsertTask {
            engine: self.engine.clone(),
            uploader: self.uploader.clone(),
            resolver: self.resolver.clone(),
            notifier: self.notifier.clone(),
            session: self.engine.session(),
            file,
            target,
        }
    }

    pub fn drag_over(&self, event: &DragOverEvent) -> EventResponse {
        if event.has_files && self.editable() {
            EventResponse::PREVENT
        } else {
            EventResponse::IGNORED
        }
    }

    pub fn drop(&self, event: DropEvent) -> Interception {
        if !self.editable() {
            return Interception::ignored();
        }
        let Some(file) = event.files.into_iter().find(LocalFile::is_image) else {
            return Interception::ignored();
        };
        let target = match event.target {
            DropTarget::DropZone => InsertTarget::End,
            DropTarget::Content => InsertTarget::Coordinates {
                x: event.x,
                y: event.y,
            },
        };
        log::debug!("intercepted drop of {} ({:?})", file.name, target);
        Interception {
            response: EventResponse::CONSUMED,
            task: Some(self.task(file, target)),
        }
    }

    pub fn paste(&self, event: &PasteEvent) -> Interception {
        if !self.editable() {
            return Interception::ignored();
        }
        let Some(file) = event.image() else {
            return Interception::ignored();
        };
        Interception {
            response: EventResponse::PREVENT,
            task: Some(self.task(file.clone(), InsertTarget::Selection)),
        }
    }

    /// A file chosen through the host's picker. `None` when the editor is
    /// read-only.
    pub fn pick_file(&self, file: LocalFile) -> Option<InsertTask> {
        if !self.editable() {
            return None;
        }
        let target = match self.variant {
            EditorVariant::Evidence => InsertTarget::End,
            EditorVariant::Standard => InsertTarget::Caret,
        };
        Some(self.task(file, target))
    }
}

/// Pending upload-and-insert, bound to the session it started in.
pub struct InsertTask {
    engine: EngineHandle,
    uploader: Rc<dyn AssetUploader>,
    resolver: Rc<dyn PositionResolver>,
    notifier: Rc<dyn Notifier>,
    session: SessionToken,
    file: LocalFile,
    target: InsertTarget,
}

impl std::fmt::Debug for InsertTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertTask")
            .field("file", &self.file.name)
            .field("target", &self.target)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Alt text from a file name: the name without its extension.
fn alt_text(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

impl InsertTask {
    pub fn target(&self) -> InsertTarget {
        self.target
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    /// Validate and upload, then insert the image. `Ok(None)` means the
    /// session ended meanwhile and the outcome, success or failure, was
    /// dropped without a notice.
    pub async fn run(self) -> Result<Option<NodeId>, EditorError> {
        let uploaded = self.uploader.upload(&self.file).await;
        if !self.engine.is_current(self.session) {
            let name = &self.file.name;
            match &uploaded {
                Ok(_) => log::debug!("discarding upload of {name} for a stale session"),
                Err(err) => log::debug!("upload of {name} failed for a stale session: {err}"),
            }
            return Ok(None);
        }
        let uploaded = match uploaded {
            Ok(uploaded) => uploaded,
            Err(err) => {
                log::warn!("upload of {} failed: {err}", self.file.name);
                let err = EditorError::from(err);
                self.notifier.notify(Notice::from(&err));
                return Err(err);
            }
        };

        let block = Block::image(ImageAttrs::new(uploaded.url).with_alt(alt_text(&self.file.name)));
        let dropped_at = match self.target {
            InsertTarget::Coordinates { x, y } => self.resolver.resolve_position(x, y),
            _ => None,
        };
        let inserted = self.engine.with_mut(|engine| match self.target {
            InsertTarget::Coordinates { .. } => {
                let pos = dropped_at.unwrap_or_else(|| engine.end_position());
                engine.insert_at_position(pos, block)
            }
            InsertTarget::End => engine.insert_at_position(engine.end_position(), block),
            InsertTarget::Selection => engine.insert_at_selection(block),
            InsertTarget::Caret => engine.insert_at_position(engine.selection().to, block),
        });
        match inserted {
            Some(id) => Ok(Some(id)),
            None => {
                let err = EditorError::NotEditable;
                self.notifier.notify(Notice::from(&err));
                Err(err)
            }
        }
    }
}
