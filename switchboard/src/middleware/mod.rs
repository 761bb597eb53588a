//! Middleware: request mutation around every model call.
//!
//! A middleware wraps the call with [`Middleware::around_model_call`] (the
//! around pattern: mutate the request, call `next`, optionally inspect the
//! response) or just implements [`Middleware::before_model`] when only the
//! request matters. A [`MiddlewareChain`] composes middlewares left to right:
//! the first layer is outermost and sees the raw response last.
//!
//! The engine mandates the order for its built-ins around both supervisor and
//! specialist calls:
//!
//! 1. [`DatetimeContext`] — fresh temporal block appended to the system message.
//! 2. [`ToolInstructions`] — knowledge usage instructions + inventory prepended.
//! 3. registered extras, in registration order
//! 4. [`Summarization`] — history compression past the token threshold.
//! 5. [`PromptDebug`] — request/response logging when debug is on.
//!
//! See [`build_chain`].

mod datetime;
mod prompt_debug;
mod summarize;
mod tool_instructions;

pub use datetime::{DatetimeContext, DatetimeMode, DATETIME_END, DATETIME_START};
pub use prompt_debug::PromptDebug;
pub use summarize::{Summarization, SUMMARY_MARKER};
pub use tool_instructions::ToolInstructions;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::knowledge::KnowledgeStore;
use crate::llm::{LlmError, MessageChunk, ModelClient, ModelRequest, ModelResponse};
use crate::prompts::EnginePrompts;
use crate::settings::Settings;
use crate::tools::ToolSpec;

/// Continuation to the next layer (innermost: the model client itself).
pub type NextCall<'a> =
    Box<dyn FnOnce(ModelRequest) -> BoxFuture<'a, Result<ModelResponse, LlmError>> + Send + 'a>;

/// One request-mutation hook.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Mutates the request before the model sees it. Default no-op.
    fn before_model(&self, _request: &mut ModelRequest) {}

    /// Wraps the model call. Default: apply `before_model`, then continue.
    async fn around_model_call(
        &self,
        mut request: ModelRequest,
        next: NextCall<'_>,
    ) -> Result<ModelResponse, LlmError> {
        self.before_model(&mut request);
        next(request).await
    }
}

/// Ordered middleware stack applied around one agent's model calls.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self { layers }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs the chain and the final client call.
    pub async fn run(
        &self,
        client: &dyn ModelClient,
        request: ModelRequest,
    ) -> Result<ModelResponse, LlmError> {
        drive(&self.layers, client, None, request).await
    }

    /// Streaming variant: the innermost call forwards tokens to `chunk_tx`.
    pub async fn run_stream(
        &self,
        client: &dyn ModelClient,
        request: ModelRequest,
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<ModelResponse, LlmError> {
        drive(&self.layers, client, chunk_tx, request).await
    }
}

fn drive<'a>(
    layers: &'a [Arc<dyn Middleware>],
    client: &'a dyn ModelClient,
    chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    request: ModelRequest,
) -> BoxFuture<'a, Result<ModelResponse, LlmError>> {
    Box::pin(async move {
        match layers.split_first() {
            None => match chunk_tx {
                Some(tx) => client.invoke_stream(&request, Some(tx)).await,
                None => client.invoke(&request).await,
            },
            Some((outer, rest)) => {
                outer
                    .around_model_call(
                        request,
                        Box::new(move |r| drive(rest, client, chunk_tx, r)),
                    )
                    .await
            }
        }
    })
}

/// Builds the engine-mandated chain for one agent.
///
/// `extras` run between the inventory injection and summarization, in the
/// order given. `knowledge` feeds the inventory; pass `None` for agents
/// without knowledge directories.
pub fn build_chain(
    settings: &Settings,
    prompts: &EnginePrompts,
    mode: DatetimeMode,
    tools: &[ToolSpec],
    knowledge: Option<&KnowledgeStore>,
    extras: Vec<Arc<dyn Middleware>>,
    summarize_client: Arc<dyn ModelClient>,
) -> MiddlewareChain {
    let mut layers: Vec<Arc<dyn Middleware>> = Vec::new();

    let datetime = match mode {
        DatetimeMode::Full => {
            DatetimeContext::full(prompts.datetime_phrase_guide().to_string())
        }
        DatetimeMode::Minimal => DatetimeContext::minimal(),
    };
    layers.push(Arc::new(datetime));

    if let Some(store) = knowledge {
        if let Some(instructions) = ToolInstructions::for_tools(tools, store) {
            layers.push(Arc::new(instructions));
        }
    }

    layers.extend(extras);

    if settings.summarization_enabled {
        layers.push(Arc::new(Summarization::new(
            summarize_client,
            prompts.summarize_prompt().to_string(),
            settings.summarization_trigger_tokens,
            settings.summarization_keep_messages,
        )));
    }

    if settings.debug {
        layers.push(Arc::new(PromptDebug::new(
            settings.debug_prompt_max_length,
            settings.debug_show_response,
        )));
    }

    MiddlewareChain::new(layers)
}
