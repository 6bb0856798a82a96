use log::{ debug, error, info };
use std::sync::Arc;

use crate::bot::Persona;
use crate::error::ChatError;
use crate::llm::chat::{ ChatClient, TextStream };
use crate::llm::{ GenerationConfig, HistoryEntry };
use crate::models::chat::{ ChatMessage, Role };

/// History and active query as they will be submitted upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChat {
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

/// Builds the upstream history for `messages`.
///
/// The active query is the last user message; it is returned separately and
/// never appears in the history. The history always opens with the two
/// persona priming turns, followed by each earlier user message and, when the
/// very next transcript entry is an assistant reply, that reply.
pub fn build_history(persona: &Persona, messages: &[ChatMessage]) -> Result<PreparedChat, ChatError> {
    let active = messages
        .iter()
        .rposition(|m| m.role == Role::User)
        .ok_or(ChatError::NoUserMessage)?;

    let mut history = vec![
        HistoryEntry::user(persona.acknowledgement_request()),
        HistoryEntry::model(persona.system_prompt())
    ];

    if messages.len() > 1 {
        for (idx, msg) in messages.iter().enumerate() {
            if msg.role != Role::User || idx == active {
                continue;
            }
            history.push(HistoryEntry::user(msg.content.clone()));
            if let Some(reply) = messages.get(idx + 1).filter(|m| m.role == Role::Assistant) {
                history.push(HistoryEntry::model(reply.content.clone()));
            }
        }
    }

    Ok(PreparedChat {
        history,
        message: messages[active].content.clone(),
    })
}

#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    persona: Arc<Persona>,
    generation: GenerationConfig,
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        persona: Arc<Persona>,
        generation: GenerationConfig
    ) -> Self {
        Self { chat_client, persona, generation }
    }

    /// Forwards the transcript upstream and hands back the reply stream.
    ///
    /// The domain classifier runs on the active query and is logged, but the
    /// request goes out either way; the persona text does the restricting.
    pub async fn handle_chat(&self, messages: &[ChatMessage]) -> Result<TextStream, ChatError> {
        let prepared = build_history(&self.persona, messages)?;
        let in_domain = self.persona.is_in_domain(&prepared.message);

        info!(
            "Chat request: {} transcript messages, {} history entries, in domain: {}",
            messages.len(),
            prepared.history.len(),
            in_domain
        );
        debug!("Active query: {}", prepared.message);
        debug!("Assembled history: {:?}", prepared.history);

        self.chat_client
            .stream_chat(&prepared.history, &prepared.message, &self.generation).await
            .map_err(|e| {
                error!("Upstream chat error (model {}): {}", self.chat_client.get_model(), e);
                ChatError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotVariant;
    use crate::llm::{ HistoryRole, LlmError };
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    fn msg(id: &str, role: Role, content: &str) -> ChatMessage {
        ChatMessage { id: id.to_string(), role, content: content.to_string() }
    }

    fn legal() -> Persona {
        Persona::for_variant(BotVariant::Legal)
    }

    #[test]
    fn greeting_plus_question_gives_only_priming_history() {
        let messages = vec![
            msg("0", Role::Assistant, "Hello!"),
            msg("1", Role::User, "What are my rights as a tenant?")
        ];
        let prepared = build_history(&legal(), &messages).unwrap();

        assert_eq!(prepared.history.len(), 2);
        assert_eq!(prepared.history[0].role, HistoryRole::User);
        assert_eq!(prepared.history[0].parts, vec![legal().acknowledgement_request()]);
        assert_eq!(prepared.history[1].role, HistoryRole::Model);
        assert_eq!(prepared.history[1].parts, vec![legal().system_prompt()]);
        assert_eq!(prepared.message, "What are my rights as a tenant?");
    }

    #[test]
    fn answered_turns_are_paired_in_order() {
        let messages = vec![
            msg("0", Role::Assistant, "Hello!"),
            msg("1", Role::User, "q1"),
            msg("2", Role::Assistant, "a1"),
            msg("3", Role::User, "q2"),
            msg("4", Role::Assistant, "a2"),
            msg("5", Role::User, "q3")
        ];
        let prepared = build_history(&legal(), &messages).unwrap();

        let tail: Vec<(HistoryRole, &str)> = prepared.history[2..]
            .iter()
            .map(|e| (e.role, e.parts[0].as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (HistoryRole::User, "q1"),
                (HistoryRole::Model, "a1"),
                (HistoryRole::User, "q2"),
                (HistoryRole::Model, "a2")
            ]
        );
        assert_eq!(prepared.message, "q3");
    }

    #[test]
    fn unanswered_turn_contributes_no_model_entry() {
        let messages = vec![
            msg("0", Role::Assistant, "Hello!"),
            msg("1", Role::User, "q1"),
            msg("2", Role::User, "q2")
        ];
        let prepared = build_history(&legal(), &messages).unwrap();

        assert_eq!(prepared.history.len(), 3);
        assert_eq!(prepared.history[2], HistoryEntry::user("q1"));
        assert_eq!(prepared.message, "q2");
    }

    #[test]
    fn active_query_is_never_in_history() {
        let messages = vec![msg("1", Role::User, "only question")];
        let prepared = build_history(&legal(), &messages).unwrap();

        assert_eq!(prepared.history.len(), 2);
        assert!(prepared.history.iter().all(|e| e.parts[0] != "only question"));
    }

    #[test]
    fn transcript_without_user_message_is_rejected() {
        let messages = vec![msg("1", Role::Assistant, "hi")];
        let err = build_history(&legal(), &messages).unwrap_err();
        assert!(matches!(err, ChatError::NoUserMessage));

        assert!(matches!(build_history(&legal(), &[]), Err(ChatError::NoUserMessage)));
    }

    struct RecordingClient {
        calls: Mutex<Vec<PreparedChat>>,
        outcome: fn() -> Result<Vec<&'static str>, LlmError>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn stream_chat(
            &self,
            history: &[HistoryEntry],
            message: &str,
            _generation: &GenerationConfig
        ) -> Result<TextStream, LlmError> {
            self.calls.lock().unwrap().push(PreparedChat {
                history: history.to_vec(),
                message: message.to_string(),
            });
            let parts = (self.outcome)()?;
            Ok(Box::pin(futures::stream::iter(parts.into_iter().map(|p| Ok(p.to_string())))))
        }

        fn get_model(&self) -> String {
            "recording".to_string()
        }
    }

    fn agent(outcome: fn() -> Result<Vec<&'static str>, LlmError>) -> (ChatAgent, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient { calls: Mutex::new(Vec::new()), outcome });
        let agent = ChatAgent::new(
            client.clone(),
            Arc::new(legal()),
            GenerationConfig::default()
        );
        (agent, client)
    }

    #[tokio::test]
    async fn out_of_domain_query_is_still_forwarded() {
        let (agent, client) = agent(|| Ok(vec!["Sorry", ", no."]));
        let messages = vec![msg("1", Role::User, "Best pizza in town?")];

        let stream = agent.handle_chat(&messages).await.unwrap();
        let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

        assert_eq!(parts.concat(), "Sorry, no.");
        assert_eq!(client.calls.lock().unwrap()[0].message, "Best pizza in town?");
    }

    #[tokio::test]
    async fn upstream_rate_limit_is_classified() {
        let (agent, _client) = agent(||
            Err(LlmError::Status {
                status: 429,
                message: r#"{"retryDelay":"17s"}"#.to_string(),
            })
        );
        let messages = vec![msg("1", Role::User, "tenant rights?")];

        let err = agent.handle_chat(&messages).await.err().unwrap();
        assert!(matches!(err, ChatError::RateLimited { retry_after: 17 }));
    }

    #[tokio::test]
    async fn missing_user_message_never_reaches_upstream() {
        let (agent, client) = agent(|| Ok(vec![]));
        let messages = vec![msg("1", Role::Assistant, "hi")];

        assert!(matches!(agent.handle_chat(&messages).await, Err(ChatError::NoUserMessage)));
        assert!(client.calls.lock().unwrap().is_empty());
    }
}
