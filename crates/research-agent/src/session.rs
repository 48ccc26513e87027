use research_agent_core::graph::Error;
use research_agent_core::{
    GraphEvent, ResearchGraph, ResearchGraphBuilder, ResearchReport,
};
use research_agent_mock_model::MockModelProvider;
use research_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::config::{AppConfig, ConfigError};
use crate::search::{SearchBackend, SearchProvider};
use crate::tools::WebSearchTool;

type TranscriptCallback = Box<dyn Fn(&str) + Send + Sync>;
type EventCallback = Box<dyn Fn(&GraphEvent) + Send + Sync>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    config: AppConfig,
    on_transcript: Option<TranscriptCallback>,
    on_event: Option<EventCallback>,
}

impl SessionBuilder {
    /// Creates a session builder from a configuration.
    #[inline]
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            on_transcript: None,
            on_event: None,
        }
    }

    /// Attaches a callback receiving the model's text as it streams in.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Attaches a callback receiving graph progress.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&GraphEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Builds a new session.
    ///
    /// Picks the OpenAI provider when an API key is configured and the mock
    /// model otherwise.
    pub fn build(self) -> Result<Session, ConfigError> {
        let config = self.config;
        config.validate()?;
        let backend = SearchBackend::from_config(&config)?;
        let search_provider = backend.provider();

        let mut builder = match &config.openai_api_key {
            Some(api_key) => {
                let mut openai_config = OpenAIConfigBuilder::with_api_key(api_key)
                    .with_model(&config.model)
                    .with_temperature(config.temperature);
                if let Some(base_url) = &config.openai_base_url {
                    openai_config = openai_config.with_base_url(base_url);
                }
                info!("using model `{}`", config.model);
                ResearchGraphBuilder::with_model_provider(OpenAIProvider::new(
                    openai_config.build(),
                ))
            }
            None => {
                info!("no valid OpenAI API key found, using the mock model");
                ResearchGraphBuilder::with_model_provider(
                    MockModelProvider::research_preset(),
                )
            }
        };
        info!("using the `{search_provider}` search provider");

        builder = builder
            .with_tool(WebSearchTool::new(backend))
            .with_max_search_iterations(config.max_search_iterations);
        if let Some(prompt) = &config.system_prompt {
            builder = builder.with_system_prompt(prompt);
        }
        if let Some(on_transcript) = self.on_transcript {
            builder = builder.on_transcript(move |delta| on_transcript(delta));
        }
        if let Some(on_event) = self.on_event {
            builder = builder.on_event(move |event| on_event(event));
        }

        Ok(Session {
            graph: builder.build(),
            mock_model: config.openai_api_key.is_none(),
            search_provider,
        })
    }
}

/// A configured research agent, ready to take queries one at a time.
pub struct Session {
    graph: ResearchGraph,
    mock_model: bool,
    search_provider: SearchProvider,
}

impl Session {
    /// Researches `query` and returns the report.
    pub async fn research(&self, query: &str) -> Result<ResearchReport, Error> {
        let state = self.graph.invoke(query).await?;
        Ok(ResearchReport::from_state(&state))
    }

    /// Returns `true` if answers come from the mock model.
    #[inline]
    pub fn uses_mock_model(&self) -> bool {
        self.mock_model
    }

    /// Returns the search provider answering `web_search` calls.
    #[inline]
    pub fn search_provider(&self) -> SearchProvider {
        self.search_provider
    }
}
