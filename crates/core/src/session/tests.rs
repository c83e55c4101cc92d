use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use groq_chat_model::ModelMessage;
use groq_chat_test_model::{PresetResponse, TestModelProvider};
use tokio::time::timeout;

use super::*;
use crate::config::ModelChoice;
use crate::render::Frame;
use crate::transcript::{Role, SEEDED_GREETING};

#[derive(Default)]
struct NullTarget;

impl RenderTarget for NullTarget {
    fn show(&mut self, _frame: Frame<'_>) {}
}

async fn send(session: &mut Session, text: &str) -> TurnOutcome {
    let mut target = NullTarget::default();
    timeout(Duration::from_millis(500), session.send(text, &mut target))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_simple_turn() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments([
        "Hi, ",
        "what can I do for you?",
    ]));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    let outcome = send(&mut session, "Hello").await;
    assert_eq!(
        outcome,
        TurnOutcome::Completed("Hi, what can I do for you?".to_owned())
    );
    assert_eq!(session.state(), SessionState::Idle);

    let messages = session.transcript().all();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], Message::user("Hello"));
    assert_eq!(messages[2], Message::assistant("Hi, what can I do for you?"));
}

#[tokio::test]
async fn test_transcript_grows_by_pairs() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["one"]));
    provider.add_response(PresetResponse::unavailable());
    provider.add_response(PresetResponse::with_fragments(["th", "ree"]));
    provider.add_response(PresetResponse::with_fragments(["fo"]).interrupted());
    provider.add_response(PresetResponse::with_fragments([""]));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    for n in 1..=5 {
        send(&mut session, &format!("question {n}")).await;
        assert_eq!(session.transcript().len(), 1 + 2 * n);
        assert_eq!(session.state(), SessionState::Idle);
    }

    let roles: Vec<_> = session
        .transcript()
        .all()
        .iter()
        .map(Message::role)
        .collect();
    assert_eq!(roles[0], Role::Assistant);
    for pair in roles[1..].chunks(2) {
        assert_eq!(pair, [Role::User, Role::Assistant]);
    }
}

#[tokio::test]
async fn test_provider_unavailable() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::unavailable());

    let errors = Arc::new(Mutex::new(Vec::new()));
    let mut session = SessionBuilder::with_model_provider(provider)
        .on_error({
            let errors = Arc::clone(&errors);
            move |err| errors.lock().unwrap().push(err.clone())
        })
        .build();

    let outcome = send(&mut session, "Hello").await;
    let TurnOutcome::Failed(err) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.transcript().last(), &Message::assistant(FALLBACK_TEXT));

    // The error is reported, not swallowed.
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::ProviderUnavailable);
}

#[tokio::test]
async fn test_stream_interrupted_discards_partial() {
    let mut provider = TestModelProvider::default();
    provider.add_response(
        PresetResponse::with_fragments(["The answer ", "is"]).interrupted(),
    );
    let mut session = SessionBuilder::with_model_provider(provider).build();

    let mut turn = session.submit("Hello").unwrap();
    let result =
        render::render(&mut turn.fragments, &mut NullTarget::default()).await;
    let err = result.clone().unwrap_err();
    assert_eq!(err.partial, "The answer is");
    assert_eq!(err.error.kind(), ErrorKind::StreamInterrupted);

    let outcome = session.finish(turn.id(), result).unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert_eq!(session.transcript().last(), &Message::assistant(FALLBACK_TEXT));
}

#[tokio::test]
async fn test_empty_input_rejected() {
    let provider = TestModelProvider::default();
    let mut session =
        SessionBuilder::with_model_provider(provider.clone()).build();

    for text in ["", " ", "\n\t  \n"] {
        assert_eq!(session.submit(text).unwrap_err(), Rejected::EmptyInput);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.transcript(), &Transcript::new());
    }
    assert!(provider.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_submit_while_awaiting_rejected() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["Sure."]));
    provider.add_response(PresetResponse::with_fragments(["Again."]));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    let mut turn = session.submit("first").unwrap();
    assert_eq!(session.state(), SessionState::AwaitingResponse);
    assert_eq!(session.transcript().len(), 2);

    assert_eq!(session.submit("second").unwrap_err(), Rejected::Busy);
    assert_eq!(session.reset().unwrap_err(), Rejected::Busy);
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript().last(), &Message::user("first"));

    let result =
        render::render(&mut turn.fragments, &mut NullTarget::default()).await;
    session.finish(turn.id(), result).unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.transcript().len(), 3);

    // Accepted again once idle.
    send(&mut session, "second").await;
    assert_eq!(session.transcript().len(), 5);
}

#[tokio::test]
async fn test_reset() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["a"]));
    provider.add_response(PresetResponse::with_fragments(["b"]));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    session.reset().unwrap();
    assert_eq!(
        session.transcript().all(),
        [Message::assistant(SEEDED_GREETING)]
    );

    send(&mut session, "x").await;
    send(&mut session, "y").await;
    assert_eq!(session.transcript().len(), 5);

    session.reset().unwrap();
    assert_eq!(session.transcript(), &Transcript::new());
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_export_in_any_state() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["Pong"]));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    let mut turn = session.submit("Ping").unwrap();
    let exported = session.export();
    assert_eq!(
        exported,
        format!("ASSISTANT: {SEEDED_GREETING}\n\nUSER: Ping\n")
    );
    assert_eq!(session.transcript().len(), 2);

    let result =
        render::render(&mut turn.fragments, &mut NullTarget::default()).await;
    session.finish(turn.id(), result);
    let exported = session.export();
    let blocks: Vec<_> = exported.trim_end().split("\n\n").collect();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2], "ASSISTANT: Pong");
}

#[tokio::test]
async fn test_cancel() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["slow"]));
    provider.add_response(PresetResponse::with_fragments(["fast"]));
    provider.set_delay(Duration::from_millis(50));
    let mut session = SessionBuilder::with_model_provider(provider).build();

    assert!(!session.cancel());

    let mut turn = session.submit("take your time").unwrap();
    let id = turn.id();
    let result = timeout(
        Duration::from_millis(5),
        render::render(&mut turn.fragments, &mut NullTarget::default()),
    )
    .await;
    assert!(result.is_err());
    drop(turn);

    assert!(session.cancel());
    assert_eq!(session.state(), SessionState::Idle);
    // No partial assistant message.
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript().last(), &Message::user("take your time"));

    // A late outcome of the cancelled turn is ignored.
    assert!(session.finish(id, Ok("late".to_owned())).is_none());
    assert_eq!(session.transcript().len(), 2);

    let outcome = send(&mut session, "hurry").await;
    assert_eq!(outcome, TurnOutcome::Completed("fast".to_owned()));
}

#[tokio::test]
async fn test_unconfigured() {
    let errors = Arc::new(AtomicUsize::new(0));
    let mut session = Session::builder()
        .with_completion_client(Err(
            Error::configuration().with_reason("GROQ_API_KEY is empty")
        ))
        .on_error({
            let errors = Arc::clone(&errors);
            move |err| {
                assert_eq!(err.kind(), ErrorKind::Configuration);
                errors.fetch_add(1, Ordering::Relaxed);
            }
        })
        .build();
    assert_eq!(errors.load(Ordering::Relaxed), 1);
    assert_eq!(
        session.configuration_error().map(Error::kind),
        Some(ErrorKind::Configuration)
    );

    for _ in 0..3 {
        let rejected = session.submit("Hello").unwrap_err();
        assert_eq!(rejected, Rejected::Unconfigured);
    }
    assert_eq!(session.transcript().len(), 1);
    // Reported once, at build time.
    assert_eq!(errors.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_transcript_changed_notifications() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["Hey"]));

    let lengths = Arc::new(Mutex::new(Vec::new()));
    let mut session = SessionBuilder::with_model_provider(provider)
        .on_transcript_changed({
            let lengths = Arc::clone(&lengths);
            move |transcript| lengths.lock().unwrap().push(transcript.len())
        })
        .build();

    send(&mut session, "Hi").await;
    session.reset().unwrap();
    let _ = session.submit("   ");

    assert_eq!(*lengths.lock().unwrap(), [2, 3, 1]);
}

#[tokio::test]
async fn test_request_carries_transcript_and_config() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["4"]));
    provider.add_response(PresetResponse::with_fragments(["8"]));
    let config =
        GenerationConfig::new(ModelChoice::Balanced3B, 0.1, 200).unwrap();
    let mut session = SessionBuilder::with_model_provider(provider.clone())
        .with_config(config)
        .build();

    send(&mut session, "2+2?").await;
    session.set_config(config.with_max_tokens(2000).unwrap());
    send(&mut session, "4+4?").await;

    let requests = provider.recorded_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "llama-3.2-3b-preview");
    assert_eq!(requests[0].params.max_tokens, 200);
    assert_eq!(requests[1].params.max_tokens, 2000);
    assert_eq!(requests[1].params.temperature, 0.1);
    assert_eq!(
        requests[1].messages,
        vec![
            ModelMessage::Assistant(SEEDED_GREETING.to_owned()),
            ModelMessage::User("2+2?".to_owned()),
            ModelMessage::Assistant("4".to_owned()),
            ModelMessage::User("4+4?".to_owned()),
        ]
    );
}
