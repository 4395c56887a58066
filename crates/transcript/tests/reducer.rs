use chat_types::{AgentId, Role};
use pretty_assertions::assert_eq;
use transcript::{reduce, Transcript, TranscriptEvent};

fn a1() -> Option<AgentId> {
    Some(AgentId::new("A1"))
}

fn submitted(text: &str) -> Transcript {
    reduce(Transcript::new(), TranscriptEvent::user_submitted(text, a1()))
}

#[test]
fn fragments_concatenate_in_receipt_order() {
    let fragments = ["The", " quick", " ", "brown", " fox", " the", " the", "!"];
    let mut transcript = submitted("tell me");

    for fragment in fragments {
        transcript = reduce(transcript, TranscriptEvent::fragment(fragment, a1()));
    }

    assert_eq!(transcript.len(), 2);
    let assistant = transcript.last().expect("assistant message");
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.content, fragments.concat());
    assert!(assistant.open);
}

#[test]
fn stream_completed_is_idempotent() {
    let transcript = reduce(submitted("hello"), TranscriptEvent::fragment("Hi", a1()));

    let once = reduce(transcript, TranscriptEvent::StreamCompleted);
    let twice = reduce(once.clone(), TranscriptEvent::StreamCompleted);

    assert_eq!(once, twice);
    assert!(once.open_message().is_none());
}

#[test]
fn stream_completed_without_open_message_changes_nothing() {
    let empty = reduce(Transcript::new(), TranscriptEvent::StreamCompleted);
    assert_eq!(empty, Transcript::new());
}

#[test]
fn stream_errored_closes_partial_message_and_appends_system_message() {
    let transcript = reduce(submitted("hello"), TranscriptEvent::fragment("Hal", a1()));
    let transcript = reduce(transcript, TranscriptEvent::stream_errored("upstream reset"));

    let messages = transcript.messages();
    assert_eq!(messages.len(), 3);

    let assistant = &messages[1];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.content, "Hal");
    assert!(!assistant.open);

    let system = &messages[2];
    assert_eq!(system.role, Role::System);
    assert_eq!(system.content, "upstream reset");
    assert!(!system.open);
}

#[test]
fn closed_message_is_never_reopened() {
    let transcript = reduce(submitted("hello"), TranscriptEvent::fragment("Hi", a1()));
    let transcript = reduce(transcript, TranscriptEvent::StreamCompleted);
    let transcript = reduce(transcript, TranscriptEvent::fragment(" again", a1()));

    let messages = transcript.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "Hi");
    assert!(!messages[1].open);
    assert_eq!(messages[2].content, " again");
    assert!(messages[2].open);
}

#[test]
fn hello_scenario_produces_closed_reply() {
    let transcript = submitted("hello");

    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "hello"));
    assert_eq!((messages[1].role, messages[1].content.as_str()), (Role::Assistant, ""));
    assert!(messages[1].open);

    let transcript = reduce(transcript, TranscriptEvent::fragment("Hi", a1()));
    let transcript = reduce(transcript, TranscriptEvent::fragment(" there", a1()));
    assert_eq!(transcript.last().map(|m| m.content.as_str()), Some("Hi there"));

    let transcript = reduce(transcript, TranscriptEvent::StreamCompleted);
    let assistant = transcript.last().expect("assistant message");
    assert_eq!(assistant.content, "Hi there");
    assert!(!assistant.open);
    assert_eq!(assistant.agent_id, a1());
}
