//! Engine: the explicitly-wired top of the process.
//!
//! Owns the settings, prompt set, model client, agent registry, URL policy,
//! and any extra middlewares, and assembles a fresh supervisor → formatter
//! executor for every turn (registration may change between turns; specialist
//! wrappers carry the turn's progress sink). Everything is constructor
//! injection — no hidden globals inside the engine core.

use std::sync::Arc;

use crate::agent::{Agent, AgentRuntime, PreparedAgent, SpecialistTool};
use crate::formatter::FormatterBuilder;
use crate::graph::{ChatbotState, GraphExecutor};
use crate::llm::ModelClient;
use crate::middleware::{build_chain, DatetimeMode, Middleware, MiddlewareChain, PromptDebug};
use crate::progress::ProgressSink;
use crate::prompts::EnginePrompts;
use crate::registry::AgentRegistry;
use crate::settings::Settings;
use crate::supervisor::SupervisorBuilder;
use crate::tools::Tool;
use crate::url_security::UrlSecurityPolicy;

pub struct Engine {
    settings: Settings,
    prompts: EnginePrompts,
    registry: Arc<AgentRegistry>,
    client: Arc<dyn ModelClient>,
    url_policy: UrlSecurityPolicy,
    extra_middlewares: Vec<Arc<dyn Middleware>>,
    formatter_overrides: FormatterBuilder,
}

impl Engine {
    /// Builds an engine. Fails only when the URL security section cannot be
    /// compiled (malformed CIDR entries are configuration errors).
    pub fn new(
        settings: Settings,
        prompts: EnginePrompts,
        registry: Arc<AgentRegistry>,
        client: Arc<dyn ModelClient>,
    ) -> Result<Self, String> {
        let url_policy = UrlSecurityPolicy::from_settings(&settings.url_security)?;
        let formatter_overrides = FormatterBuilder::from_prompts(&prompts);
        Ok(Self {
            settings,
            prompts,
            registry,
            client,
            url_policy,
            extra_middlewares: Vec::new(),
            formatter_overrides,
        })
    }

    /// Registers an additional middleware; it runs between the built-in
    /// injection middlewares and summarization, in registration order, around
    /// both supervisor and specialist calls.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.extra_middlewares.push(middleware);
        self
    }

    /// Replaces the formatter section set (TONE / FORMAT / EXTRA overrides).
    pub fn with_formatter(mut self, builder: FormatterBuilder) -> Self {
        self.formatter_overrides = builder;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn url_policy(&self) -> &UrlSecurityPolicy {
        &self.url_policy
    }

    fn chain_for(
        &self,
        mode: DatetimeMode,
        tools: &[Arc<dyn Tool>],
        knowledge: Option<&crate::knowledge::KnowledgeStore>,
    ) -> MiddlewareChain {
        let specs: Vec<_> = tools.iter().map(|t| t.spec()).collect();
        build_chain(
            &self.settings,
            &self.prompts,
            mode,
            &specs,
            knowledge,
            self.extra_middlewares.clone(),
            Arc::clone(&self.client),
        )
    }

    /// One wrapper tool for one registered specialist, bound to this turn's
    /// progress sink.
    fn specialist_tool(&self, agent: &Arc<Agent>, sink: Option<&ProgressSink>) -> Arc<dyn Tool> {
        let prepared = Arc::new(PreparedAgent {
            name: agent.name.clone(),
            system_prompt: format!(
                "{}\n\n{}",
                agent.capabilities.trim_end(),
                self.prompts.planning()
            ),
            tools: agent.tools.clone(),
        });
        let chain = self.chain_for(
            DatetimeMode::Minimal,
            &agent.tools,
            agent.knowledge.as_deref(),
        );
        let mut runtime = AgentRuntime::new(Arc::clone(&self.client), chain, &self.settings)
            .with_recursion_limit(self.settings.recursion_limit_for(&agent.name));
        if let Some(sink) = sink {
            runtime = runtime.with_progress(sink.clone());
        }
        Arc::new(SpecialistTool::new(
            prepared,
            Arc::new(runtime),
            self.settings.specialist_timeout(),
        ))
    }

    /// Assembles the two-node executor for one turn.
    fn executor(&self, sink: Option<&ProgressSink>) -> GraphExecutor {
        let supervisor_builder = SupervisorBuilder::new(&self.prompts);
        let supervisor =
            supervisor_builder.build(&self.registry, |agent| self.specialist_tool(agent, sink));

        let supervisor_chain =
            self.chain_for(DatetimeMode::Full, &supervisor.tools, None);
        let mut supervisor_runtime =
            AgentRuntime::new(Arc::clone(&self.client), supervisor_chain, &self.settings);
        if let Some(sink) = sink {
            supervisor_runtime = supervisor_runtime.with_progress(sink.clone());
        }

        // The formatter runs without tools or injection middleware; prompt
        // debugging still applies when enabled.
        let formatter_chain = if self.settings.debug {
            MiddlewareChain::new(vec![Arc::new(PromptDebug::new(
                self.settings.debug_prompt_max_length,
                self.settings.debug_show_response,
            ))])
        } else {
            MiddlewareChain::default()
        };
        let formatter = self.formatter_overrides.clone().build(
            Arc::clone(&self.client),
            formatter_chain,
            &self.settings,
        );

        GraphExecutor::new(
            supervisor,
            supervisor_runtime,
            self.settings.supervisor_timeout(),
            formatter,
        )
    }

    /// Runs one turn. Turns for one session must be driven sequentially; the
    /// sink is scoped to this turn and receives `Final` or `Error` last.
    pub async fn run_turn(
        &self,
        state: ChatbotState,
        sink: Option<&ProgressSink>,
    ) -> ChatbotState {
        self.executor(sink).run_turn(state, sink).await
    }

    /// Convenience: run one turn from prior history and a new query.
    pub async fn run_query(
        &self,
        history: Vec<crate::message::Message>,
        query: &str,
        sink: Option<&ProgressSink>,
    ) -> ChatbotState {
        self.run_turn(ChatbotState::for_turn(history, query), sink)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::prompts;

    fn engine(client: Arc<MockLlm>) -> Engine {
        Engine::new(
            Settings::default(),
            prompts::load_or_default(Some(std::path::Path::new("/nonexistent-prompt-dir"))),
            Arc::new(AgentRegistry::new()),
            client,
        )
        .unwrap()
    }

    /// **Scenario**: with an empty registry the engine still answers — the
    /// supervisor runs with no tools and the formatter shapes the reply.
    #[tokio::test]
    async fn empty_registry_single_agent_chat() {
        let client = Arc::new(MockLlm::new(vec![
            crate::llm::ModelResponse {
                content: "supervisor raw answer".into(),
                ..Default::default()
            },
            crate::llm::ModelResponse {
                content: "Hello! How can I help?".into(),
                ..Default::default()
            },
        ]));
        let engine = engine(client.clone());
        let state = engine.run_query(Vec::new(), "Hello.", None).await;
        assert_eq!(state.workflow_step, crate::graph::WorkflowStep::Complete);
        assert_eq!(state.chatbot_response, "Hello! How can I help?");
        // user + assistant appended exactly once each
        assert_eq!(state.messages.len(), 2);
        // supervisor call then formatter call
        assert_eq!(client.call_count(), 2);
        // supervisor saw zero tools
        assert!(client.recorded()[0].tool_names.is_empty());
    }

    #[test]
    fn bad_url_security_settings_fail_engine_construction() {
        let mut settings = Settings::default();
        settings.url_security.enabled = true;
        settings.url_security.allow_ips = vec!["300.0.0.0/8".to_string()];
        let result = Engine::new(
            settings,
            prompts::load_or_default(Some(std::path::Path::new("/nonexistent-prompt-dir"))),
            Arc::new(AgentRegistry::new()),
            Arc::new(MockLlm::with_text("x")),
        );
        assert!(result.is_err());
    }
}
