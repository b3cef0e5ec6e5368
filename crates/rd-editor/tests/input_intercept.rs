//! Drop, paste, and picker flows end to end against a fake upload service.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rd_assets::*;
use rd_editor::input::{ClipboardItem, DragOverEvent, DropEvent, DropTarget, EventResponse, PasteEvent};
use rd_editor::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const UPLOADED: &str = "https://reports.example.com/uploads/screenshots/shot.png";

struct FakeTransport {
    calls: Rc<Cell<usize>>,
    reply: HttpResponse,
}

#[async_trait(?Send)]
impl HttpTransport for FakeTransport {
    async fn post_multipart(
        &self,
        _url: &Url,
        _field: &str,
        _file: &LocalFile,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.reply.clone())
    }

    async fn post_json(
        &self,
        _url: &Url,
        _body: &serde_json::Value,
        _bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        unreachable!("uploads never post json")
    }
}

#[derive(Default)]
struct FixedResolver {
    pos: Cell<Option<usize>>,
    calls: Cell<usize>,
}

impl PositionResolver for FixedResolver {
    fn resolve_position(&self, _x: f64, _y: f64) -> Option<usize> {
        self.calls.set(self.calls.get() + 1);
        self.pos.get()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

struct Harness {
    session: EditorSession,
    interceptor: InputInterceptor,
    uploads: Rc<Cell<usize>>,
    resolver: Rc<FixedResolver>,
    notifier: Rc<RecordingNotifier>,
    emitted: Rc<RefCell<Vec<String>>>,
}

fn harness_with(content: &str, variant: EditorVariant, status: u16) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let session = EditorSession::open(content, true, variant);
    let uploads = Rc::new(Cell::new(0));
    let transport = FakeTransport {
        calls: uploads.clone(),
        reply: HttpResponse::new(status, r#"{"url":"/uploads/screenshots/shot.png"}"#),
    };
    let config = AssetConfig::default().with_base_url("https://reports.example.com");
    let uploader: Rc<dyn AssetUploader> = Rc::new(UploadClient::new(config, transport));
    let resolver = Rc::new(FixedResolver::default());
    let notifier = Rc::new(RecordingNotifier::default());
    let interceptor = session.interceptor(uploader, resolver.clone(), notifier.clone());
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    session.on_update(move |c| sink.borrow_mut().push(c.to_string()));
    Harness {
        session,
        interceptor,
        uploads,
        resolver,
        notifier,
        emitted,
    }
}

fn harness(content: &str) -> Harness {
    harness_with(content, EditorVariant::Standard, 200)
}

fn png(size: usize) -> LocalFile {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.resize(size, 0);
    LocalFile::new("shot.png", "image/png", bytes)
}

fn figure() -> String {
    format!(
        r#"<figure data-type="image" data-align="center" data-width="75%"><img src="{UPLOADED}" alt="shot" width="75%"></figure>"#
    )
}

fn drop_at(files: Vec<LocalFile>, target: DropTarget) -> DropEvent {
    DropEvent {
        files,
        x: 120.0,
        y: 48.0,
        target,
    }
}

#[test]
fn dragover_with_files_prevents_default() {
    let h = harness("<p>a</p>");
    assert_eq!(
        h.interceptor.drag_over(&DragOverEvent { has_files: true }),
        EventResponse::PREVENT
    );
    assert_eq!(
        h.interceptor.drag_over(&DragOverEvent { has_files: false }),
        EventResponse::IGNORED
    );
}

#[tokio::test]
async fn drop_resolves_position_when_upload_completes() {
    let h = harness("<p>alpha</p><p>omega</p>");
    let interception = h.interceptor.drop(drop_at(vec![png(1024)], DropTarget::Content));
    assert_eq!(interception.response, EventResponse::CONSUMED);
    let task = interception.task.unwrap();

    // The user keeps typing while the upload is in flight.
    h.session.handle().with_mut(|e| {
        e.set_selection(0, 0);
        e.insert_text("X");
    });
    assert_eq!(h.resolver.calls.get(), 0);
    // "Xalpha" 0..6, "omega" 7..12
    h.resolver.pos.set(Some(6));

    let id = task.run().await.unwrap().unwrap();
    assert_eq!(h.resolver.calls.get(), 1);
    assert_eq!(h.uploads.get(), 1);
    assert_eq!(
        h.session.get_content(),
        format!("<p>Xalpha</p>{}<p>omega</p>", figure())
    );
    assert_eq!(h.session.handle().with(|e| e.document().start_of(id)), Some(7));
    assert_eq!(h.emitted.borrow().len(), 2);
}

#[tokio::test]
async fn unresolvable_drop_appends() {
    let h = harness("<p>alpha</p><p>omega</p>");
    let task = h
        .interceptor
        .drop(drop_at(vec![png(1024)], DropTarget::Content))
        .task
        .unwrap();
    task.run().await.unwrap();
    assert_eq!(
        h.session.get_content(),
        format!("<p>alpha</p><p>omega</p>{}", figure())
    );
}

#[tokio::test]
async fn drop_zone_targets_the_end() {
    let h = harness("<p>alpha</p>");
    h.resolver.pos.set(Some(0));
    let task = h
        .interceptor
        .drop(drop_at(vec![png(1024)], DropTarget::DropZone))
        .task
        .unwrap();
    task.run().await.unwrap();
    assert_eq!(h.resolver.calls.get(), 0);
    assert_eq!(h.session.get_content(), format!("<p>alpha</p>{}", figure()));
}

#[test]
fn non_image_drop_is_left_to_the_host() {
    let h = harness("<p>a</p>");
    let text = LocalFile::new("notes.txt", "text/plain", b"hello".to_vec());
    let interception = h.interceptor.drop(drop_at(vec![text], DropTarget::Content));
    assert_eq!(interception.response, EventResponse::IGNORED);
    assert!(interception.task.is_none());
}

#[tokio::test]
async fn paste_replaces_the_selection() {
    let h = harness("<p>keep</p><p>swap</p>");
    h.session.handle().with_mut(|e| e.set_selection(5, 9));
    let event = PasteEvent {
        items: vec![
            ClipboardItem::Text("ignored".into()),
            ClipboardItem::File(png(2048)),
        ],
    };
    let interception = h.interceptor.paste(&event);
    assert_eq!(interception.response, EventResponse::PREVENT);
    interception.task.unwrap().run().await.unwrap();
    assert_eq!(
        h.session.get_content(),
        format!("<p>keep</p>{}<p></p>", figure())
    );
    assert_eq!(h.emitted.borrow().len(), 1);
}

#[test]
fn text_paste_is_not_intercepted() {
    let h = harness("<p>a</p>");
    let event = PasteEvent {
        items: vec![ClipboardItem::Text("plain".into())],
    };
    let interception = h.interceptor.paste(&event);
    assert_eq!(interception.response, EventResponse::IGNORED);
    assert!(interception.task.is_none());
}

#[tokio::test]
async fn stale_session_discards_the_upload() {
    let h = harness("<p>alpha</p>");
    let task = h
        .interceptor
        .drop(drop_at(vec![png(1024)], DropTarget::Content))
        .task
        .unwrap();
    assert_eq!(h.session.receive_external("<p>another finding</p>"), SyncOutcome::Reset);

    assert_eq!(task.run().await, Ok(None));
    assert_eq!(h.uploads.get(), 1);
    assert_eq!(h.session.get_content(), "<p>another finding</p>");
    assert!(h.emitted.borrow().is_empty());
    assert!(h.notifier.notices.borrow().is_empty());
}

#[tokio::test]
async fn closed_session_discards_the_upload() {
    let h = harness("<p>alpha</p>");
    let task = h.interceptor.pick_file(png(1024)).unwrap();
    h.session.close();
    assert_eq!(task.run().await, Ok(None));
    assert_eq!(h.session.get_content(), "<p>alpha</p>");
}

#[tokio::test]
async fn failed_upload_for_a_closed_session_is_silent() {
    let h = harness_with("<p>alpha</p>", EditorVariant::Standard, 500);
    let task = h.interceptor.pick_file(png(1024)).unwrap();
    h.session.close();
    assert_eq!(task.run().await, Ok(None));
    assert_eq!(h.uploads.get(), 1);
    assert!(h.notifier.notices.borrow().is_empty());
}

#[tokio::test]
async fn failed_upload_after_a_reset_is_silent() {
    let h = harness("<p>alpha</p>");
    let task = h.interceptor.pick_file(png(6 * 1024 * 1024)).unwrap();
    assert_eq!(h.session.receive_external("<p>beta</p>"), SyncOutcome::Reset);
    assert_eq!(task.run().await, Ok(None));
    assert_eq!(h.uploads.get(), 0);
    assert!(h.notifier.notices.borrow().is_empty());
    assert_eq!(h.session.get_content(), "<p>beta</p>");
}

#[tokio::test]
async fn evidence_picker_appends_at_the_end() {
    let h = harness_with("<p>first</p><p>second</p>", EditorVariant::Evidence, 200);
    h.session.handle().with_mut(|e| e.set_selection(0, 0));
    let task = h.interceptor.pick_file(png(1024)).unwrap();
    assert_eq!(task.target(), InsertTarget::End);
    task.run().await.unwrap();
    assert_eq!(
        h.session.get_content(),
        format!("<p>first</p><p>second</p>{}", figure())
    );
}

#[tokio::test]
async fn standard_picker_inserts_at_the_caret() {
    let h = harness("<p>abcd</p>");
    h.session.handle().with_mut(|e| e.set_selection(2, 2));
    h.interceptor.pick_file(png(1024)).unwrap().run().await.unwrap();
    assert_eq!(
        h.session.get_content(),
        format!("<p>ab</p>{}<p>cd</p>", figure())
    );
}

#[tokio::test]
async fn oversized_file_never_reaches_the_network() {
    let h = harness("<p>alpha</p>");
    let task = h.interceptor.pick_file(png(6 * 1024 * 1024)).unwrap();
    let err = task.run().await.unwrap_err();
    assert_eq!(
        err,
        EditorError::Upload(UploadError::FileTooLarge {
            size: 6 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        })
    );
    assert_eq!(h.uploads.get(), 0);
    assert_eq!(h.session.get_content(), "<p>alpha</p>");
    let notices = h.notifier.notices.borrow();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn mislabelled_file_is_unsupported() {
    let h = harness("<p>alpha</p>");
    let fake = LocalFile::new("shot.png", "image/png", b"<svg onload=alert(1)>".to_vec());
    let err = h.interceptor.pick_file(fake).unwrap().run().await.unwrap_err();
    assert_eq!(
        err,
        EditorError::Upload(UploadError::UnsupportedType {
            mime: "image/png".into()
        })
    );
    assert_eq!(h.uploads.get(), 0);
}

#[tokio::test]
async fn server_failure_leaves_document_alone() {
    let h = harness_with("<p>alpha</p>", EditorVariant::Standard, 500);
    let err = h.interceptor.pick_file(png(1024)).unwrap().run().await.unwrap_err();
    assert!(matches!(
        err,
        EditorError::Upload(UploadError::UploadFailed { status: Some(500), .. })
    ));
    assert_eq!(h.uploads.get(), 1);
    assert_eq!(h.session.get_content(), "<p>alpha</p>");
    assert!(!h.session.is_dirty());
    assert_eq!(h.notifier.notices.borrow().len(), 1);
}

#[test]
fn read_only_editor_ignores_drops() {
    let session = EditorSession::open("<p>a</p>", false, EditorVariant::Standard);
    let transport = FakeTransport {
        calls: Rc::new(Cell::new(0)),
        reply: HttpResponse::new(200, "{}"),
    };
    let uploader: Rc<dyn AssetUploader> =
        Rc::new(UploadClient::new(AssetConfig::default(), transport));
    let interceptor = session.interceptor(
        uploader,
        Rc::new(FixedResolver::default()),
        Rc::new(RecordingNotifier::default()),
    );
    let interception = interceptor.drop(drop_at(vec![png(10)], DropTarget::Content));
    assert_eq!(interception.response, EventResponse::IGNORED);
    assert!(interceptor.pick_file(png(10)).is_none());
}
