pub mod commands;
pub mod engine;
pub mod error;
pub mod input;
pub mod intercept;
pub mod node_view;
pub mod notify;
pub mod session;
pub mod shortcuts;
pub mod sync;
pub mod toolbar;

pub use commands::EditorCommand;
pub use engine::{Engine, EngineHandle, FocusTarget, Replacement, SessionToken};
pub use error::EditorError;
pub use intercept::{InputInterceptor, InsertTarget, InsertTask, Interception, PositionResolver};
pub use node_view::ImageNodeView;
pub use notify::{Notice, NoticeLevel, Notifier};
pub use session::{EditorSession, EditorVariant};
pub use sync::{EchoGuard, SyncOutcome};
pub use toolbar::{AssistTask, ButtonState, Toolbar};
