//! Chat controller state machine.
//!
//! All UI events go through [`ChatController::dispatch`], which applies the
//! transition and returns the side effects the caller must perform. The
//! controller never does I/O itself.

use chrono::{DateTime, Local};

use super::failure::ChatFailure;
use crate::rag::{CourseAnalytics, QueryResponse, Source};

pub const WELCOME_MESSAGE: &str = "Welcome to the Course Materials Assistant! I can help you with questions about courses, lessons and specific content. What would you like to know?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingResponse,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub sources: Vec<Source>,
    pub is_error: bool,
    pub at: DateTime<Local>,
}

impl ChatMessage {
    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            sources: Vec::new(),
            is_error: false,
            at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseSidebar {
    Loading,
    Loaded(CourseAnalytics),
    Unavailable,
}

/// Identifies one submitted query; outcomes carry it back so answers to
/// abandoned queries can be told apart from the current one.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Submit(String),
    ResponseReceived {
        request: RequestId,
        response: QueryResponse,
    },
    RequestFailed {
        request: RequestId,
        failure: ChatFailure,
    },
    NewChat,
    CoursesLoaded(CourseAnalytics),
    CoursesFailed(ChatFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendQuery {
        request: RequestId,
        query: String,
        session_id: Option<String>,
    },
    ClearSession {
        session_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct ChatController {
    state: ChatState,
    session_id: Option<String>,
    transcript: Vec<ChatMessage>,
    courses: CourseSidebar,
    /// The query whose outcome the transcript is waiting for.
    in_flight: Option<RequestId>,
    next_request: RequestId,
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatController {
    pub fn new() -> Self {
        Self {
            state: ChatState::Idle,
            session_id: None,
            transcript: vec![ChatMessage::new(Sender::Assistant, WELCOME_MESSAGE)],
            courses: CourseSidebar::Loading,
            in_flight: None,
            next_request: 1,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn courses(&self) -> &CourseSidebar {
        &self.courses
    }

    /// Input is disabled exactly while a query is in flight.
    pub fn input_enabled(&self) -> bool {
        self.state != ChatState::AwaitingResponse
    }

    pub fn dispatch(&mut self, event: ChatEvent) -> Vec<Effect> {
        match event {
            ChatEvent::Submit(query) => {
                let query = query.trim();
                if query.is_empty() || !self.input_enabled() {
                    return Vec::new();
                }
                let request = self.next_request;
                self.next_request += 1;
                self.in_flight = Some(request);
                self.transcript.push(ChatMessage::new(Sender::User, query));
                self.state = ChatState::AwaitingResponse;
                vec![Effect::SendQuery {
                    request,
                    query: query.to_string(),
                    session_id: self.session_id.clone(),
                }]
            }
            ChatEvent::ResponseReceived { request, response } => {
                if self.in_flight != Some(request) {
                    // Answer to a query abandoned by NewChat; its session is
                    // orphaned server-side unless it is the one in use.
                    if self.session_id.as_deref() == Some(response.session_id.as_str()) {
                        return Vec::new();
                    }
                    return vec![Effect::ClearSession {
                        session_id: response.session_id,
                    }];
                }
                self.in_flight = None;
                self.session_id = Some(response.session_id);
                let mut message = ChatMessage::new(Sender::Assistant, response.answer);
                message.sources = response.sources;
                self.transcript.push(message);
                self.state = ChatState::Idle;
                Vec::new()
            }
            ChatEvent::RequestFailed { request, failure } => {
                if self.in_flight != Some(request) {
                    return Vec::new();
                }
                self.in_flight = None;
                tracing::warn!("Query failed: {}", failure);
                let mut message = ChatMessage::new(Sender::Assistant, failure.user_message());
                message.is_error = true;
                self.transcript.push(message);
                self.state = ChatState::Error;
                Vec::new()
            }
            ChatEvent::NewChat => {
                let effects = self
                    .session_id
                    .take()
                    .map(|session_id| Effect::ClearSession { session_id })
                    .into_iter()
                    .collect();
                self.transcript = vec![ChatMessage::new(Sender::Assistant, WELCOME_MESSAGE)];
                self.in_flight = None;
                self.state = ChatState::Idle;
                effects
            }
            ChatEvent::CoursesLoaded(stats) => {
                self.courses = CourseSidebar::Loaded(stats);
                Vec::new()
            }
            ChatEvent::CoursesFailed(failure) => {
                tracing::warn!("Course stats unavailable: {}", failure);
                self.courses = CourseSidebar::Unavailable;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(request: RequestId, answer: &str, session: &str) -> ChatEvent {
        ChatEvent::ResponseReceived {
            request,
            response: QueryResponse {
                answer: answer.to_string(),
                sources: vec![Source::new("Course A - Lesson 1", Some("https://a/1".into()))],
                session_id: session.to_string(),
            },
        }
    }

    fn sent_request(effects: &[Effect]) -> RequestId {
        match effects {
            [Effect::SendQuery { request, .. }] => *request,
            other => panic!("expected a single SendQuery, got {other:?}"),
        }
    }

    #[test]
    fn submit_disables_input_and_sends_query() {
        let mut chat = ChatController::new();
        let effects = chat.dispatch(ChatEvent::Submit("  What is RAG?  ".into()));

        assert_eq!(
            effects,
            vec![Effect::SendQuery {
                request: 1,
                query: "What is RAG?".into(),
                session_id: None
            }]
        );
        assert_eq!(chat.state(), ChatState::AwaitingResponse);
        assert!(!chat.input_enabled());
        assert_eq!(chat.transcript().last().unwrap().sender, Sender::User);
    }

    #[test]
    fn blank_and_overlapping_submits_are_ignored() {
        let mut chat = ChatController::new();
        assert!(chat.dispatch(ChatEvent::Submit("   ".into())).is_empty());
        assert_eq!(chat.state(), ChatState::Idle);

        chat.dispatch(ChatEvent::Submit("first".into()));
        assert!(chat.dispatch(ChatEvent::Submit("second".into())).is_empty());
        assert_eq!(chat.transcript().len(), 2);
    }

    #[test]
    fn response_stores_session_and_reuses_it() {
        let mut chat = ChatController::new();
        let first = sent_request(&chat.dispatch(ChatEvent::Submit("q1".into())));
        chat.dispatch(answered(first, "a1", "s-1"));

        assert_eq!(chat.state(), ChatState::Idle);
        assert_eq!(chat.session_id(), Some("s-1"));
        let last = chat.transcript().last().unwrap();
        assert_eq!(last.content, "a1");
        assert_eq!(last.sources.len(), 1);

        let effects = chat.dispatch(ChatEvent::Submit("q2".into()));
        assert_eq!(
            effects,
            vec![Effect::SendQuery {
                request: first + 1,
                query: "q2".into(),
                session_id: Some("s-1".into())
            }]
        );
    }

    #[test]
    fn failure_renders_message_and_reenables_input() {
        let mut chat = ChatController::new();
        let request = sent_request(&chat.dispatch(ChatEvent::Submit("q".into())));
        chat.dispatch(ChatEvent::RequestFailed {
            request,
            failure: ChatFailure::Http {
                status: 429,
                detail: None,
            },
        });

        assert_eq!(chat.state(), ChatState::Error);
        assert!(chat.input_enabled());
        let last = chat.transcript().last().unwrap();
        assert!(last.is_error);
        assert!(last.content.contains("wait a moment"));

        assert_eq!(chat.dispatch(ChatEvent::Submit("retry".into())).len(), 1);
    }

    #[test]
    fn new_chat_without_session_is_a_noop() {
        let mut chat = ChatController::new();
        assert!(chat.dispatch(ChatEvent::NewChat).is_empty());
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript()[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn new_chat_clears_session_and_drops_stale_response() {
        let mut chat = ChatController::new();
        let first = sent_request(&chat.dispatch(ChatEvent::Submit("q1".into())));
        chat.dispatch(answered(first, "a1", "s-1"));
        let second = sent_request(&chat.dispatch(ChatEvent::Submit("q2".into())));

        let effects = chat.dispatch(ChatEvent::NewChat);
        assert_eq!(
            effects,
            vec![Effect::ClearSession {
                session_id: "s-1".into()
            }]
        );
        assert_eq!(chat.session_id(), None);
        assert_eq!(chat.state(), ChatState::Idle);

        let effects = chat.dispatch(answered(second, "late", "s-1"));
        assert_eq!(
            effects,
            vec![Effect::ClearSession {
                session_id: "s-1".into()
            }]
        );
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.session_id(), None);
    }

    #[test]
    fn answer_to_abandoned_query_does_not_replace_current_one() {
        let mut chat = ChatController::new();
        let abandoned = sent_request(&chat.dispatch(ChatEvent::Submit("q1".into())));
        chat.dispatch(ChatEvent::NewChat);
        let current = sent_request(&chat.dispatch(ChatEvent::Submit("q2".into())));
        assert_ne!(abandoned, current);

        chat.dispatch(answered(abandoned, "answer to q1", "old-session"));
        assert_eq!(chat.state(), ChatState::AwaitingResponse);
        assert!(!chat.input_enabled());
        assert_eq!(chat.session_id(), None);
        assert!(chat.dispatch(ChatEvent::Submit("q3".into())).is_empty());

        chat.dispatch(ChatEvent::RequestFailed {
            request: abandoned,
            failure: ChatFailure::Network("late".into()),
        });
        assert_eq!(chat.state(), ChatState::AwaitingResponse);

        chat.dispatch(answered(current, "answer to q2", "new-session"));
        let contents: Vec<&str> = chat
            .transcript()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec![WELCOME_MESSAGE, "q2", "answer to q2"]);
        assert_eq!(chat.session_id(), Some("new-session"));
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[test]
    fn course_sidebar_tracks_stats() {
        let mut chat = ChatController::new();
        assert_eq!(chat.courses(), &CourseSidebar::Loading);

        let stats = CourseAnalytics {
            total_courses: 1,
            course_titles: vec!["Course A".into()],
        };
        chat.dispatch(ChatEvent::CoursesLoaded(stats.clone()));
        assert_eq!(chat.courses(), &CourseSidebar::Loaded(stats));

        chat.dispatch(ChatEvent::CoursesFailed(ChatFailure::Network("down".into())));
        assert_eq!(chat.courses(), &CourseSidebar::Unavailable);
    }
}
