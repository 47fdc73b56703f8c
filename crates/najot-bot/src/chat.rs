//! One question/answer turn of the chat widget.
//!
//! Pipeline failures never tear the session down: they are rendered as the
//! assistant's reply and the conversation continues.

use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use crate::{
    knowledge_base::KnowledgeBase,
    llm_worker::LLMWorker,
    memory::Message,
    metrics,
    shared_state::{with_session, with_session_mut, SessionData, UnifiedAppState},
};

/// Shown instead of the chat when no credential has been entered.
pub const MISSING_API_KEY_WARNING: &str = "Iltimos, OpenAI API kalitni kiriting.";

#[derive(Debug)]
pub enum ChatOutcome {
    Replied {
        reply: String,
        thread_id: String,
        messages: Vec<Message>,
    },
    MissingApiKey,
    EmptyMessage,
}

pub async fn send_message(
    state: &UnifiedAppState,
    session: &Arc<RwLock<SessionData>>,
    content: &str,
) -> anyhow::Result<ChatOutcome> {
    if content.trim().is_empty() {
        return Ok(ChatOutcome::EmptyMessage);
    }

    let Some(api_key) = with_session(session, |data| data.api_key.clone())? else {
        warn!("Message rejected: no API key for this session");
        return Ok(ChatOutcome::MissingApiKey);
    };

    let (thread_id, cached_kb) = with_session_mut(session, |data| {
        data.messages.push(Message::user(content));
        (data.thread_id.clone(), data.knowledge_base.clone())
    })?;

    let reply = match cached_kb {
        Some(kb) => generate(&kb, content).await,
        None => {
            let built = async {
                let llm = Arc::new(LLMWorker::new(&state.config, api_key.clone())?);
                KnowledgeBase::build(&state.config, llm).await
            }
            .await;

            match built {
                Ok(kb) => {
                    let kb = Arc::new(kb);
                    with_session_mut(session, |data| {
                        if data.api_key.as_ref() == Some(&api_key) {
                            data.knowledge_base = Some(kb.clone());
                        }
                    })?;
                    generate(&kb, content).await
                }
                Err(e) => {
                    error!("Knowledge base initialization failed: {:#}", e);
                    format!(
                        "Error initializing vector store: {:#}\n\nError generating response: knowledge base is unavailable",
                        e
                    )
                }
            }
        }
    };

    let messages = with_session_mut(session, |data| {
        if data.thread_id == thread_id {
            data.messages.push(Message::assistant(reply.clone()));
        } else {
            info!("Chat {} was closed before its reply arrived; reply not recorded", thread_id);
        }
        data.messages.clone()
    })?;

    metrics::inc_answered_question();
    Ok(ChatOutcome::Replied { reply, thread_id, messages })
}

async fn generate(kb: &KnowledgeBase, question: &str) -> String {
    match kb.answer(question).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Response generation failed: {:#}", e);
            format!("Error generating response: {:#}", e)
        }
    }
}
