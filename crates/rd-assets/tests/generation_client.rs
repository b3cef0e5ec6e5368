//! Generation client status mapping against a fake transport.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rd_assets::*;
use reqwest::Url;
use serde_json::{Value, json};
use std::cell::RefCell;

struct FakeTransport {
    reply: HttpResponse,
    seen: RefCell<Vec<(Value, Option<String>)>>,
}

impl FakeTransport {
    fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: HttpResponse::new(status, body),
            seen: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl HttpTransport for FakeTransport {
    async fn post_multipart(
        &self,
        _url: &Url,
        _field: &str,
        _file: &LocalFile,
    ) -> Result<HttpResponse, TransportError> {
        unreachable!("generation never uploads")
    }

    async fn post_json(
        &self,
        _url: &Url,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        self.seen
            .borrow_mut()
            .push((body.clone(), bearer.map(str::to_string)));
        Ok(self.reply.clone())
    }
}

fn client(transport: FakeTransport) -> GenerationClient<FakeTransport> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = AssetConfig {
        api_token: Some("secret".into()),
        ..AssetConfig::default()
    };
    GenerationClient::new(config, transport)
}

#[tokio::test]
async fn success_parses_credits() {
    let client = client(FakeTransport::replying(
        200,
        r#"{"result":"The bug.","credits_used":1,"remaining_credits":41}"#,
    ));
    let request = GenerationRequest::new(AssistKind::FixGrammar, "teh bug.");
    let generation = client.generate(&request).await.unwrap();
    assert_eq!(
        generation,
        Generation {
            result: "The bug.".into(),
            credits_used: 1,
            remaining_credits: 41,
        }
    );
    let seen = client.transport().seen.borrow();
    assert_eq!(seen[0].0, json!({"type": "fix_grammar", "text": "teh bug."}));
    assert_eq!(seen[0].1.as_deref(), Some("secret"));
}

#[tokio::test]
async fn payment_required_is_insufficient_credits() {
    let client = client(FakeTransport::replying(
        402,
        r#"{"detail":"Monthly AI credits exhausted"}"#,
    ));
    let err = client
        .generate(&GenerationRequest::new(AssistKind::Expand, "x"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerateError::InsufficientCredits {
            detail: "Monthly AI credits exhausted".into()
        }
    );
}

#[tokio::test]
async fn other_failures_are_generic() {
    let client = client(FakeTransport::replying(503, "overloaded"));
    let err = client
        .generate(&GenerationRequest::new(AssistKind::Rewrite, "x"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerateError::Failed {
            status: Some(503),
            body: "overloaded".into()
        }
    );
}
