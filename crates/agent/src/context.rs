//! Startup wiring shared by every run.
//!
//! `AgentContext` is built once per process and handed to the gateway and
//! CLI behind an `Arc`. Initialization never fails outright: each problem
//! is recorded as an issue, and the agent is only assembled when the
//! repository, the model provider and the system instruction are all
//! available.

use std::sync::Arc;

use gitscribe_config::AppConfig;
use gitscribe_core::event::EventBus;
use gitscribe_core::provider::Provider;
use gitscribe_core::tool::ToolRegistry;
use gitscribe_repository::{ConnectionInfo, RepositoryClient};
use tracing::{error, info, warn};

use crate::instructions::SystemInstruction;
use crate::loop_runner::AgentLoop;

pub struct AgentContext {
    config: AppConfig,
    connection: Option<ConnectionInfo>,
    tools: Arc<ToolRegistry>,
    provider: Option<Arc<dyn Provider>>,
    agent: Option<Arc<AgentLoop>>,
    event_bus: Arc<EventBus>,
    issues: Vec<String>,
}

impl AgentContext {
    /// Connect to the repository and the model provider named in `config`.
    pub async fn initialize(config: AppConfig) -> Self {
        let mut issues = Vec::new();

        let (client, connection) = match RepositoryClient::connect(&config.repository).await {
            Ok((client, info)) => {
                if !info.branch_exists {
                    warn!(branch = %info.branch, "Configured branch does not exist yet");
                }
                (Some(client), Some(info))
            }
            Err(e) => {
                error!(error = %e, "Repository client failed to initialize; tools disabled");
                issues.push(format!("Repository unavailable: {e}"));
                (None, None)
            }
        };

        let provider = match gitscribe_providers::build_from_config(&config) {
            Ok(router) => {
                let provider = router.default();
                if provider.is_none() {
                    issues.push(format!(
                        "Model provider '{}' is not registered",
                        config.default_provider
                    ));
                }
                provider
            }
            Err(e) => {
                error!(error = %e, "Model provider failed to initialize");
                issues.push(format!("Model unavailable: {e}"));
                None
            }
        };

        let mut context = Self::assemble(config, client, provider, issues);
        context.connection = connection;
        context
    }

    /// Build a context from already-constructed collaborators.
    ///
    /// `None` for either part is recorded as an issue, as in [`initialize`](Self::initialize).
    pub fn from_parts(
        config: AppConfig,
        client: Option<RepositoryClient>,
        provider: Option<Arc<dyn Provider>>,
    ) -> Self {
        let mut issues = Vec::new();
        if client.is_none() {
            issues.push("Repository unavailable: no repository client".into());
        }
        if provider.is_none() {
            issues.push("Model unavailable: no provider".into());
        }
        Self::assemble(config, client, provider, issues)
    }

    fn assemble(
        config: AppConfig,
        client: Option<RepositoryClient>,
        provider: Option<Arc<dyn Provider>>,
        mut issues: Vec<String>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());

        let tools = Arc::new(match client {
            Some(client) => {
                let registry = gitscribe_tools::repository_registry(client);
                info!(count = registry.len(), "Repository tools registered");
                registry
            }
            None => ToolRegistry::new(),
        });

        let instruction = match SystemInstruction::from_config(&config) {
            Ok(instruction) => Some(instruction),
            Err(e) => {
                error!(error = %e, "System instruction could not be built");
                issues.push(format!("Instruction unavailable: {e}"));
                None
            }
        };

        let agent = match (&provider, instruction) {
            (Some(provider), Some(instruction)) if !tools.is_empty() => Some(Arc::new(
                AgentLoop::new(provider.clone(), tools.clone(), instruction)
                    .with_model(config.model())
                    .with_temperature(config.default_temperature)
                    .with_max_tokens(config.default_max_tokens)
                    .with_max_steps(config.agent.max_steps)
                    .with_preview_chars(config.agent.preview_chars)
                    .with_event_bus(event_bus.clone()),
            )),
            _ => None,
        };

        Self {
            config,
            connection: None,
            tools,
            provider,
            agent,
            event_bus,
            issues,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Who we connected as, when the repository came from [`initialize`](Self::initialize).
    pub fn connection(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref()
    }

    /// The tool catalog; empty when the repository is unavailable.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn repository_enabled(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn model_ready(&self) -> bool {
        self.provider.is_some()
    }

    /// The model provider, when one could be built.
    pub fn provider(&self) -> Option<Arc<dyn Provider>> {
        self.provider.clone()
    }

    /// The agent, when everything it needs initialized.
    pub fn agent(&self) -> Option<Arc<AgentLoop>> {
        self.agent.clone()
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn is_healthy(&self) -> bool {
        self.agent.is_some() && self.issues.is_empty()
    }

    /// Explanation returned to callers when no agent is available.
    pub fn unavailable_reason(&self) -> String {
        if self.issues.is_empty() {
            "Agent not initialized.".into()
        } else {
            format!("Agent not initialized: {}", self.issues.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;
    use gitscribe_repository::MemoryBackend;

    fn provider() -> Option<Arc<dyn Provider>> {
        Some(Arc::new(SequentialMockProvider::single_text("hi")))
    }

    fn client() -> RepositoryClient {
        RepositoryClient::new(Arc::new(MemoryBackend::new("acme/formulas", "main")))
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.repository.name = Some("acme/formulas".into());
        config
    }

    #[test]
    fn complete_parts_build_agent() {
        let ctx = AgentContext::from_parts(config(), Some(client()), provider());

        assert!(ctx.is_healthy());
        assert!(ctx.repository_enabled());
        assert!(ctx.model_ready());
        let agent = ctx.agent().unwrap();
        assert_eq!(agent.tools().len(), 4);
        assert_eq!(agent.max_steps(), 25);
        assert_eq!(agent.model(), "gemini-1.5-flash-latest");
    }

    #[test]
    fn provider_section_model_reaches_agent() {
        let mut config = config();
        config.providers.insert(
            "gemini".into(),
            gitscribe_config::ProviderConfig {
                default_model: Some("gemini-1.5-pro".into()),
                ..Default::default()
            },
        );
        let ctx = AgentContext::from_parts(config, Some(client()), provider());
        assert_eq!(ctx.agent().unwrap().model(), "gemini-1.5-pro");
    }

    #[test]
    fn missing_repository_disables_tools_and_agent() {
        let ctx = AgentContext::from_parts(config(), None, provider());

        assert!(!ctx.repository_enabled());
        assert!(ctx.model_ready());
        assert!(ctx.agent().is_none());
        assert!(ctx.unavailable_reason().contains("Repository unavailable"));
    }

    #[test]
    fn missing_provider_reported() {
        let ctx = AgentContext::from_parts(config(), Some(client()), None);
        assert!(ctx.repository_enabled());
        assert!(!ctx.model_ready());
        assert!(!ctx.is_healthy());
        assert_eq!(ctx.issues(), ["Model unavailable: no provider".to_string()]);
    }

    #[test]
    fn bad_instruction_path_is_an_issue() {
        let mut config = config();
        config.agent.instructions_path = Some("/nonexistent/prompt.md".into());
        let ctx = AgentContext::from_parts(config, Some(client()), provider());

        assert!(ctx.agent().is_none());
        assert!(ctx.issues()[0].starts_with("Instruction unavailable"));
    }

    #[tokio::test]
    async fn initialize_without_credentials_degrades() {
        let ctx = AgentContext::initialize(AppConfig::default()).await;
        assert!(!ctx.repository_enabled());
        assert!(!ctx.model_ready());
        assert!(ctx.agent().is_none());
        assert_eq!(ctx.issues().len(), 2);
        assert!(ctx.connection().is_none());
    }
}
