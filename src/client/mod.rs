//! Chat client: the controller state machine, its HTTP transport and a
//! plain-text renderer used by the `course-chat` binary.

mod api;
mod controller;
mod failure;

pub use api::{parse_query_response, ApiClient};
pub use controller::{
    ChatController, ChatEvent, ChatMessage, ChatState, CourseSidebar, Effect, RequestId, Sender,
    WELCOME_MESSAGE,
};
pub use failure::ChatFailure;

/// Performs one effect and returns the event describing its outcome.
pub async fn perform(api: &ApiClient, effect: Effect) -> Option<ChatEvent> {
    match effect {
        Effect::SendQuery {
            request,
            query,
            session_id,
        } => Some(match api.query(&query, session_id.as_deref()).await {
            Ok(response) => ChatEvent::ResponseReceived { request, response },
            Err(failure) => ChatEvent::RequestFailed { request, failure },
        }),
        Effect::ClearSession { session_id } => {
            if let Err(failure) = api.clear_session(&session_id).await {
                tracing::warn!("Failed to clear session {}: {}", session_id, failure);
            }
            None
        }
    }
}

/// Dispatches `event` and keeps performing effects until the controller settles.
pub async fn drive(controller: &mut ChatController, api: &ApiClient, event: ChatEvent) {
    let mut pending = controller.dispatch(event);
    while let Some(effect) = pending.pop() {
        if let Some(next) = perform(api, effect).await {
            pending.extend(controller.dispatch(next));
        }
    }
}

pub async fn load_courses(controller: &mut ChatController, api: &ApiClient) {
    let event = match api.courses().await {
        Ok(stats) => ChatEvent::CoursesLoaded(stats),
        Err(failure) => ChatEvent::CoursesFailed(failure),
    };
    controller.dispatch(event);
}

pub fn render_message(message: &ChatMessage) -> String {
    let who = match (message.sender, message.is_error) {
        (Sender::User, _) => "You",
        (Sender::Assistant, false) => "Assistant",
        (Sender::Assistant, true) => "Assistant (error)",
    };
    let mut out = format!("[{}] {}:\n{}", message.at.format("%H:%M"), who, message.content);

    if !message.sources.is_empty() {
        out.push_str("\n\nSources:");
        for source in &message.sources {
            match source.link() {
                Some(link) => out.push_str(&format!("\n  - {} <{}>", source.text(), link)),
                None => out.push_str(&format!("\n  - {}", source.text())),
            }
        }
    }
    out
}

pub fn render_courses(sidebar: &CourseSidebar) -> String {
    match sidebar {
        CourseSidebar::Loading => "Loading courses...".to_string(),
        CourseSidebar::Unavailable => "Failed to load courses".to_string(),
        CourseSidebar::Loaded(stats) if stats.course_titles.is_empty() => {
            "Courses: 0\n  No courses available".to_string()
        }
        CourseSidebar::Loaded(stats) => {
            let mut out = format!("Courses: {}", stats.total_courses);
            for title in &stats.course_titles {
                out.push_str(&format!("\n  - {}", title));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{CourseAnalytics, QueryResponse, Source};

    #[test]
    fn renders_sources_with_links() {
        let mut chat = ChatController::new();
        chat.dispatch(ChatEvent::Submit("q".into()));
        chat.dispatch(ChatEvent::ResponseReceived {
            request: 1,
            response: QueryResponse {
                answer: "**Bold** answer".into(),
                sources: vec![
                    Source::new("Course A - Lesson 1", Some("https://a/1".into())),
                    Source::Plain("Course B".into()),
                ],
                session_id: "s".into(),
            },
        });

        let rendered = render_message(chat.transcript().last().unwrap());
        assert!(rendered.contains("Assistant:\n**Bold** answer"));
        assert!(rendered.contains("  - Course A - Lesson 1 <https://a/1>"));
        assert!(rendered.ends_with("  - Course B"));
    }

    #[test]
    fn renders_course_sidebar_states() {
        assert_eq!(render_courses(&CourseSidebar::Loading), "Loading courses...");
        let stats = CourseAnalytics {
            total_courses: 2,
            course_titles: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            render_courses(&CourseSidebar::Loaded(stats)),
            "Courses: 2\n  - A\n  - B"
        );
    }
}
