//! Bounded tool-calling loop over an `LlmProvider`.

use std::sync::Arc;

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::{ContentBlock, Message, MessageRequest, ToolChoice};
use crate::core::config::settings::LlmSettings;
use crate::rag::Source;
use crate::tools::ToolManager;

const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in course materials and educational content, with tools for course information.

Tool usage:
- You can make up to {max_rounds} rounds of tool calls to gather information
- Content search tool: search INSIDE lessons for specific topics, concepts, explanations or details
- Course outline tool: lesson lists, course structure, titles, or WHAT exists in a course
- Plan the information you need up front and synthesize all tool results into accurate, fact-based answers
- If tools yield no results, say so clearly without offering alternatives

Tool selection:
- \"What is lesson X about?\", \"How many lessons?\", \"Course outline?\" -> outline tool
- \"Search for [topic] in course\", \"Explain [concept] from lesson\" -> content search tool

Response protocol:
- General knowledge questions: answer from existing knowledge without tools
- Course content questions: search first, then use more tools if needed
- Outline questions: return the complete course title, course link (if available) and every lesson number and title
- No meta-commentary: do not describe your reasoning, the tools, or the search results

Answers must be brief and focused, educational, clear, and use examples when they help understanding.
Provide only the direct answer to what was asked.";

const FINAL_ROUND_GUIDANCE: &str =
    "Tool calling rounds are complete. Provide your final answer based on all available information.";

const RESULT_PREVIEW_CHARS: usize = 200;

/// Final answer text plus the citations gathered by tool calls in this request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub sources: Vec<Source>,
}

pub struct AiGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_tool_rounds: usize,
}

impl AiGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            max_tool_rounds: settings.max_tool_rounds,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&ToolManager>,
    ) -> Result<GeneratedAnswer, LlmError> {
        let base_system = self.base_system(history);
        let tools = tools.filter(|manager| !manager.is_empty());
        let definitions = tools.map(ToolManager::definitions).unwrap_or_default();

        let mut messages = vec![Message::user_text(query)];
        let mut sources: Vec<Source> = Vec::new();

        if tools.is_some() {
            for round in 1..=self.max_tool_rounds {
                let request = MessageRequest {
                    model: self.model.clone(),
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                    system: Some(format!("{}\n{}", base_system, self.round_guidance(round))),
                    messages: messages.clone(),
                    tools: definitions.clone(),
                    tool_choice: Some(ToolChoice::Auto),
                };
                let response = self.provider.create_message(&request).await?;

                let Some(manager) = tools.filter(|_| response.wants_tools()) else {
                    return Ok(GeneratedAnswer {
                        text: answer_text(&response.text())?,
                        sources,
                    });
                };

                let mut results = Vec::new();
                for block in &response.content {
                    let ContentBlock::ToolUse { id, name, input } = block else {
                        continue;
                    };
                    tracing::info!(round, tool = %name, input = %input, "Tool call");

                    match manager.execute(name, input).await {
                        Ok(output) => {
                            tracing::debug!(
                                round,
                                tool = %name,
                                "Tool result: {}",
                                preview(&output.text)
                            );
                            for source in output.sources {
                                if !sources.contains(&source) {
                                    sources.push(source);
                                }
                            }
                            results.push(ContentBlock::ToolResult {
                                tool_use_id: id.clone(),
                                content: output.text,
                                is_error: false,
                            });
                        }
                        Err(err) => {
                            let message = format!("Tool {} failed: {}", name, err);
                            tracing::warn!(round, "{}", message);
                            return Ok(GeneratedAnswer {
                                text: format!("Unable to complete search: {}", message),
                                sources,
                            });
                        }
                    }
                }

                messages.push(Message::assistant(response.content));
                messages.push(Message::tool_results(results));
            }
        }

        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: Some(format!("{}\n\n{}", base_system, FINAL_ROUND_GUIDANCE)),
            messages,
            tools: Vec::new(),
            tool_choice: None,
        };
        let response = self.provider.create_message(&request).await?;

        Ok(GeneratedAnswer {
            text: answer_text(&response.text())?,
            sources,
        })
    }

    fn base_system(&self, history: Option<&str>) -> String {
        let prompt = SYSTEM_PROMPT.replace("{max_rounds}", &self.max_tool_rounds.to_string());
        match history.map(str::trim).filter(|h| !h.is_empty()) {
            Some(history) => format!("{}\n\nPrevious conversation:\n{}", prompt, history),
            None => prompt,
        }
    }

    fn round_guidance(&self, round: usize) -> String {
        if round >= self.max_tool_rounds {
            if round == 1 {
                "This is your only opportunity to use tools. Gather everything you need to answer the question.".to_string()
            } else {
                "This is your final opportunity to use tools. Based on previous results, determine if additional information is needed to complete your answer.".to_string()
            }
        } else if round == 1 {
            "This is your first opportunity to use tools. Consider what information you need to fully answer the user's question and gather initial data.".to_string()
        } else {
            format!(
                "This is tool round {} of {}. Refine or extend the information gathered so far.",
                round, self.max_tool_rounds
            )
        }
    }
}

fn answer_text(text: &str) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse(
            "No text content in response".to_string(),
        ));
    }
    Ok(text.to_string())
}

fn preview(text: &str) -> String {
    if text.chars().count() > RESULT_PREVIEW_CHARS {
        let head: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
