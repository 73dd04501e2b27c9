//! In-memory conversation history keyed by session id.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
    /// Exchanges (user + assistant pairs) retained per session.
    max_history: usize,
}

impl SessionManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(id.clone(), Vec::new());
        tracing::debug!("Created session {}", id);
        id
    }

    /// Appends one exchange, creating the session if it is unknown.
    pub async fn add_exchange(&self, session_id: &str, query: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn {
            role: TurnRole::User,
            content: query.to_string(),
        });
        turns.push(Turn {
            role: TurnRole::Assistant,
            content: answer.to_string(),
        });

        let keep = self.max_history * 2;
        if turns.len() > keep {
            let excess = turns.len() - keep;
            turns.drain(..excess);
        }
    }

    /// Prior turns formatted as `User: ..` / `Assistant: ..` lines, if any.
    pub async fn get_conversation_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        let turns = sessions.get(session_id)?;
        if turns.is_empty() {
            return None;
        }
        Some(
            turns
                .iter()
                .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    pub async fn turns(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forgets the session. Unknown ids are a no-op; returns whether one existed.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
