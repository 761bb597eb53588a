//! # Switchboard
//!
//! A multi-agent chatbot orchestration engine. Each user turn flows through a
//! fixed two-node workflow — a **supervisor** agent that routes the query by
//! calling registered **specialist** agents as tools, then a **formatter**
//! that turns the supervisor's raw findings into the user-facing reply.
//!
//! ## Design
//!
//! - **Agents as data**: an [`Agent`] is a name, a capabilities string, and a
//!   tool list. The capabilities text doubles as the agent's base prompt and
//!   the supervisor's routing cue — one string, no drift.
//! - **Middleware around every model call**: datetime injection, knowledge
//!   inventory pre-injection, history summarization, and prompt debugging
//!   compose in a mandated order around supervisor and specialist calls
//!   ([`middleware`]).
//! - **Isolated recursion, nested timeouts**: every agent invocation gets a
//!   fresh step counter; deadlines nest
//!   `llm_request ⊆ specialist ⊆ supervisor`, with an independent formatter
//!   bound ([`agent`], [`graph`]).
//! - **Recoverable failures**: tool errors become `ERROR:` strings the model
//!   can read; specialist timeouts become strings the supervisor can react
//!   to; only turn-level failures surface to the user, translated
//!   ([`graph::TurnError`]).
//! - **Progressive disclosure**: only top-level knowledge documents are
//!   advertised in the prompt; subdirectory documents stay reachable via
//!   `read_skill`/`read_fact` paths ([`knowledge`]).
//!
//! ## Main modules
//!
//! - [`engine`]: [`Engine`] — wires settings, registry, client, prompts.
//! - [`graph`]: [`ChatbotState`], [`GraphExecutor`] — the per-turn workflow.
//! - [`agent`]: [`Agent`], [`AgentRuntime`], [`SpecialistTool`].
//! - [`middleware`]: [`Middleware`], chain, and the four built-ins.
//! - [`knowledge`]: [`KnowledgeStore`] and the reader tools.
//! - [`llm`]: [`ModelClient`], [`ChatCompletions`], [`MockLlm`].
//! - [`settings`]: [`Settings`] with layered sources and fail-closed checks.
//! - [`progress`]: [`ProgressSink`] events streamed to clients.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use switchboard::{
//!     Agent, AgentRegistry, ChatCompletions, Engine, FunctionTool, Settings,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let settings = Settings::default();
//! let registry = Arc::new(AgentRegistry::new());
//! registry
//!     .register(
//!         Agent::new(
//!             "weather",
//!             "answers weather questions for any city",
//!             vec![Arc::new(FunctionTool::new(
//!                 "get_weather",
//!                 "Current weather for a city.",
//!                 serde_json::json!({
//!                     "type": "object",
//!                     "properties": {"city": {"type": "string"}},
//!                     "required": ["city"]
//!                 }),
//!                 |_args| async move { Ok("Sunny, 22°C".to_string()) },
//!             ))],
//!         ),
//!         false,
//!     )
//!     .unwrap();
//!
//! let client = Arc::new(ChatCompletions::new(
//!     settings.llm_base_url.clone(),
//!     settings.api_key.clone(),
//! ));
//! let prompts = switchboard::prompts::load_or_default(None);
//! let engine = Engine::new(settings, prompts, registry, client).unwrap();
//!
//! let state = engine
//!     .run_query(Vec::new(), "What's the weather in Tokyo?", None)
//!     .await;
//! println!("{}", state.chatbot_response);
//! # }
//! ```

pub mod agent;
pub mod engine;
pub mod formatter;
pub mod graph;
pub mod knowledge;
pub mod llm;
pub mod message;
pub mod middleware;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod settings;
pub mod supervisor;
pub mod tools;
pub mod url_security;

pub use agent::{Agent, AgentOutcome, AgentRuntime, PreparedAgent, RunError, SpecialistTool};
pub use engine::Engine;
pub use formatter::{Formatter, FormatterBuilder};
pub use graph::{ChatbotState, GraphExecutor, Next, Node, TurnError, WorkflowStep};
pub use knowledge::{InventoryEntry, KnowledgeCategory, KnowledgeStore};
pub use llm::{
    ChatCompletions, LlmError, LlmUsage, MessageChunk, MockLlm, ModelClient, ModelRequest,
    ModelResponse,
};
pub use message::{ContentPart, Message, MessageContent, ToolCall};
pub use middleware::{
    build_chain, DatetimeContext, DatetimeMode, Middleware, MiddlewareChain, PromptDebug,
    Summarization, ToolInstructions, SUMMARY_MARKER,
};
pub use progress::{ProgressEvent, ProgressSink};
pub use prompts::EnginePrompts;
pub use registry::{AgentRegistry, RegistryError};
pub use settings::{ConfigurationError, ReasoningEffort, Settings, UrlSecuritySettings};
pub use supervisor::{SupervisorBuilder, SUPERVISOR_NAME};
pub use tools::{FunctionTool, Tool, ToolError, ToolSpec};
pub use url_security::UrlSecurityPolicy;
