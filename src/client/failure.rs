use thiserror::Error;

/// Everything that can go wrong between submitting a question and
/// rendering its answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Http { status: u16, detail: Option<String> },
    #[error("malformed response: {0}")]
    MalformedJson(String),
    #[error("response missing field `{0}`")]
    MissingField(&'static str),
}

impl ChatFailure {
    /// Text shown in the transcript. Kept in sync with `frontend/script.js`.
    pub fn user_message(&self) -> String {
        match self {
            ChatFailure::Network(_) => {
                "Unable to reach the server. Please check your connection and try again.".to_string()
            }
            ChatFailure::Http { status, .. } => match status {
                400 => "Your question could not be processed. Please rephrase it and try again."
                    .to_string(),
                402 => "The AI service has run out of credits. Please contact the administrator."
                    .to_string(),
                404 => "The course assistant service was not found. Please check the server address."
                    .to_string(),
                429 => "Too many requests. Please wait a moment before asking again.".to_string(),
                500 => "The server ran into an error while answering. Please try again later."
                    .to_string(),
                other => format!(
                    "Unexpected server response (HTTP {}). Please try again.",
                    other
                ),
            },
            ChatFailure::MalformedJson(_) => {
                "The server sent a response that could not be read. Please try again.".to_string()
            }
            ChatFailure::MissingField(_) => {
                "The server response was incomplete. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> ChatFailure {
        ChatFailure::Http {
            status,
            detail: None,
        }
    }

    #[test]
    fn each_status_has_a_distinct_message() {
        let messages: Vec<String> = [400, 402, 404, 429, 500, 503]
            .into_iter()
            .map(|s| http(s).user_message())
            .collect();

        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(messages[3].contains("wait a moment"));
        assert!(messages[5].contains("HTTP 503"));
    }

    #[test]
    fn network_failure_mentions_connectivity() {
        let msg = ChatFailure::Network("connection refused".into()).user_message();
        assert!(msg.contains("connection"));
        assert_ne!(msg, http(500).user_message());
    }

    #[test]
    fn display_includes_detail() {
        let failure = ChatFailure::Http {
            status: 402,
            detail: Some("credit balance is too low".into()),
        };
        assert_eq!(failure.to_string(), "HTTP 402: credit balance is too low");
    }
}
