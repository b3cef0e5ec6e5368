//! Host input events as seen by the editor.

use rd_assets::LocalFile;

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// Mod: Cmd on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn cmd() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn cmd_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::NONE
        }
    }

    pub fn cmd_alt() -> Self {
        Self {
            ctrl: true,
            alt: true,
            ..Self::NONE
        }
    }
}

/// Where a key event originated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyOrigin {
    /// The editable document surface.
    #[default]
    Content,
    /// A text input inside a node view, such as an image caption.
    NodeViewInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
    pub origin: KeyOrigin,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            origin: KeyOrigin::Content,
        }
    }

    pub fn from_node_view(mut self) -> Self {
        self.origin = KeyOrigin::NodeViewInput;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropTarget {
    /// Over the document at the pointer coordinates.
    #[default]
    Content,
    /// The dedicated drop zone below the document.
    DropZone,
}

#[derive(Debug, Clone)]
pub struct DropEvent {
    pub files: Vec<LocalFile>,
    pub x: f64,
    pub y: f64,
    pub target: DropTarget,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragOverEvent {
    pub has_files: bool,
}

#[derive(Debug, Clone)]
pub enum ClipboardItem {
    File(LocalFile),
    Text(String),
    Html(String),
}

#[derive(Debug, Clone, Default)]
pub struct PasteEvent {
    pub items: Vec<ClipboardItem>,
}

impl PasteEvent {
    /// First pasted image file, if any.
    pub fn image(&self) -> Option<&LocalFile> {
        self.items.iter().find_map(|item| match item {
            ClipboardItem::File(file) if file.is_image() => Some(file),
            _ => None,
        })
    }
}

/// What the host should do with the native event after the editor saw it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventResponse {
    pub const IGNORED: EventResponse = EventResponse {
        prevent_default: false,
        stop_propagation: false,
    };
    pub const PREVENT: EventResponse = EventResponse {
        prevent_default: true,
        stop_propagation: false,
    };
    pub const STOP: EventResponse = EventResponse {
        prevent_default: false,
        stop_propagation: true,
    };
    pub const CONSUMED: EventResponse = EventResponse {
        prevent_default: true,
        stop_propagation: true,
    };

    pub fn is_handled(&self) -> bool {
        self.prevent_default || self.stop_propagation
    }
}
