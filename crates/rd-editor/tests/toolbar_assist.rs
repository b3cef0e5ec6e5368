//! AI-assist over the selection against a scripted generator.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rd_assets::{AssistKind, GenerateError, Generation, GenerationRequest, TextGenerator};
use rd_editor::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Returns one canned reply. `during` runs while the request is "in
/// flight", standing in for whatever the user does meanwhile.
struct ScriptedGenerator {
    calls: Cell<usize>,
    requests: RefCell<Vec<GenerationRequest>>,
    reply: Result<Generation, GenerateError>,
    during: Box<dyn Fn()>,
}

impl ScriptedGenerator {
    fn replying(result: &str) -> Self {
        Self {
            calls: Cell::new(0),
            requests: RefCell::new(Vec::new()),
            reply: Ok(Generation {
                result: result.to_string(),
                credits_used: 1,
                remaining_credits: 41,
            }),
            during: Box::new(|| {}),
        }
    }

    fn failing(err: GenerateError) -> Self {
        Self {
            reply: Err(err),
            ..Self::replying("")
        }
    }

    fn meanwhile(mut self, f: impl Fn() + 'static) -> Self {
        self.during = Box::new(f);
        self
    }
}

#[async_trait(?Send)]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError> {
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());
        (self.during)();
        self.reply.clone()
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

fn open(content: &str, from: usize, to: usize) -> EngineHandle {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = Engine::initialize(content, true);
    engine.set_selection(from, to);
    EngineHandle::new(engine)
}

#[test]
fn empty_selection_fails_without_calling_the_service() {
    let engine = open("<p>teh finding</p>", 2, 2);
    let generator = Rc::new(ScriptedGenerator::replying("unused"));
    let notifier = Rc::new(RecordingNotifier::default());
    let err = AssistTask::capture(
        &engine,
        generator.clone(),
        notifier.clone(),
        AssistKind::FixGrammar,
    )
    .err();
    assert_eq!(err, Some(EditorError::NoSelection));
    assert_eq!(generator.calls.get(), 0);
    assert_eq!(engine.with(Engine::get_content), "<p>teh finding</p>");
    assert_eq!(notifier.notices.borrow().len(), 1);
}

#[tokio::test]
async fn result_replaces_the_captured_range() {
    let engine = open("<p>teh finding is bad</p>", 0, 3);
    let generator = Rc::new(ScriptedGenerator::replying("The"));
    let notifier = Rc::new(RecordingNotifier::default());
    let task = AssistTask::capture(
        &engine,
        generator.clone(),
        notifier.clone(),
        AssistKind::FixGrammar,
    )
    .unwrap();
    assert_eq!(task.text(), "teh");

    assert_eq!(task.run().await, Ok(true));
    assert_eq!(engine.with(Engine::get_content), "<p>The finding is bad</p>");
    assert_eq!(
        generator.requests.borrow()[0],
        GenerationRequest::new(AssistKind::FixGrammar, "teh")
    );
    let notices = notifier.notices.borrow();
    assert_eq!(notices[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn moved_text_is_found_through_the_current_selection() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let during = engine.clone();
    let generator = Rc::new(ScriptedGenerator::replying("the").meanwhile(move || {
        during.with_mut(|e| {
            e.set_selection(0, 0);
            e.insert_text("> ");
            e.set_selection(2, 5);
        });
    }));
    let task = AssistTask::capture(
        &engine,
        generator,
        Rc::new(RecordingNotifier::default()),
        AssistKind::Rewrite,
    )
    .unwrap();
    assert_eq!(task.run().await, Ok(true));
    assert_eq!(engine.with(Engine::get_content), "<p>&gt; the finding</p>");
}

#[tokio::test]
async fn result_is_discarded_when_the_text_is_gone() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let during = engine.clone();
    let generator = Rc::new(ScriptedGenerator::replying("the").meanwhile(move || {
        during.with_mut(|e| {
            e.select_all();
            e.insert_text("rewritten by hand");
        });
    }));
    let task = AssistTask::capture(
        &engine,
        generator,
        Rc::new(RecordingNotifier::default()),
        AssistKind::Rewrite,
    )
    .unwrap();
    assert_eq!(task.run().await, Ok(false));
    assert_eq!(engine.with(Engine::get_content), "<p>rewritten by hand</p>");
}

#[tokio::test]
async fn result_is_discarded_after_an_external_reset() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let during = engine.clone();
    let generator = Rc::new(ScriptedGenerator::replying("the").meanwhile(move || {
        during.with_mut(|e| {
            e.receive_external("<p>teh other finding</p>");
        });
    }));
    let task = AssistTask::capture(
        &engine,
        generator,
        Rc::new(RecordingNotifier::default()),
        AssistKind::FixGrammar,
    )
    .unwrap();
    assert_eq!(task.run().await, Ok(false));
    assert_eq!(engine.with(Engine::get_content), "<p>teh other finding</p>");
}

#[tokio::test]
async fn failure_after_an_external_reset_is_silent() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let during = engine.clone();
    let failure = GenerateError::Failed {
        status: Some(503),
        body: "overloaded".into(),
    };
    let generator = Rc::new(ScriptedGenerator::failing(failure).meanwhile(move || {
        during.with_mut(|e| {
            e.receive_external("<p>teh other finding</p>");
        });
    }));
    let notifier = Rc::new(RecordingNotifier::default());
    let task = AssistTask::capture(&engine, generator, notifier.clone(), AssistKind::Rewrite).unwrap();
    assert_eq!(task.run().await, Ok(false));
    assert!(notifier.notices.borrow().is_empty());
}

#[tokio::test]
async fn payment_required_is_its_own_error() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let generator = Rc::new(ScriptedGenerator::failing(GenerateError::InsufficientCredits {
        detail: "Not enough credits".into(),
    }));
    let notifier = Rc::new(RecordingNotifier::default());
    let task = AssistTask::capture(&engine, generator, notifier.clone(), AssistKind::Expand).unwrap();
    assert_eq!(
        task.run().await,
        Err(EditorError::InsufficientCredits {
            detail: "Not enough credits".into()
        })
    );
    assert_eq!(engine.with(Engine::get_content), "<p>teh finding</p>");
    let notices = notifier.notices.borrow();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "insufficient credits: Not enough credits");
}

#[tokio::test]
async fn other_failures_are_generation_errors() {
    let engine = open("<p>teh finding</p>", 0, 3);
    let failure = GenerateError::Failed {
        status: Some(503),
        body: "overloaded".into(),
    };
    let generator = Rc::new(ScriptedGenerator::failing(failure.clone()));
    let task = AssistTask::capture(
        &engine,
        generator,
        Rc::new(RecordingNotifier::default()),
        AssistKind::FixGrammar,
    )
    .unwrap();
    assert_eq!(task.run().await, Err(EditorError::Generation(failure)));
    assert_eq!(engine.with(Engine::get_content), "<p>teh finding</p>");
}

#[test]
fn toolbar_click_applies_and_mouse_down_keeps_selection() {
    let engine = open("<p>evidence</p>", 0, 8);
    assert!(Toolbar::mouse_down().prevent_default);
    assert!(Toolbar::click(&engine, &EditorCommand::Italic));
    assert_eq!(engine.with(Engine::get_content), "<p><em>evidence</em></p>");
    let italic = engine.with(|e| {
        Toolbar::buttons(e)
            .into_iter()
            .find(|b| b.command == EditorCommand::Italic)
    });
    assert!(italic.unwrap().active);
}
