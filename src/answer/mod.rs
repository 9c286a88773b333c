//! Grounded answer generation over retrieved transcript context.

mod ollama;
mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAIGenerator;

use crate::config::{GenerationSettings, Prompts};
use crate::error::{KildeError, Result};
use crate::retrieval::{Citation, Retriever};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Returned when retrieval finds nothing; the model is not consulted.
pub const NO_RELEVANT_CONTENT: &str =
    "I couldn't find any relevant content in the course videos for this question.";

/// Trait for text generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for a system instruction and a user prompt.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// Create the generator named in the settings. `model` overrides the configured model.
pub fn create_generator(
    settings: &GenerationSettings,
    model: Option<&str>,
) -> Result<Arc<dyn Generator>> {
    let model = model.unwrap_or(&settings.model);
    match settings.provider.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(
            &settings.base_url,
            model,
            settings.temperature,
        )?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(model, settings.temperature)?)),
        other => Err(KildeError::Config(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

/// An answer together with the citations it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Answers questions by retrieving context and prompting a generator.
pub struct AnswerEngine {
    retriever: Arc<Retriever>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    course_name: String,
}

impl AnswerEngine {
    pub fn new(retriever: Arc<Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            prompts: Prompts::default(),
            course_name: "course".to_string(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_course_name(mut self, course_name: &str) -> Self {
        self.course_name = course_name.to_string();
        self
    }

    /// Ask a single question and get an answer with citations.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let retrieval = self.retriever.retrieve(question).await?;

        if retrieval.is_empty() {
            info!("No relevant content for question");
            return Ok(Answer {
                answer: NO_RELEVANT_CONTENT.to_string(),
                citations: Vec::new(),
            });
        }

        let mut vars = HashMap::new();
        vars.insert("course".to_string(), self.course_name.clone());
        vars.insert("question".to_string(), question.trim().to_string());
        vars.insert("context".to_string(), retrieval.context.clone());
        vars.insert("sources".to_string(), format_sources(&retrieval.citations));

        let system = self
            .prompts
            .render_with_custom(&self.prompts.answer.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.answer.user, &vars);

        let answer = self.generator.generate(&system, &user).await?;
        debug!(
            "Generated answer grounded on {} citations",
            retrieval.citations.len()
        );

        Ok(Answer {
            answer,
            citations: retrieval.citations,
        })
    }
}

/// One `source @ start-end` line per citation.
fn format_sources(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| format!("- {} @ {}-{}", c.source, c.start_label, c.end_label))
        .collect::<Vec<_>>()
        .join("\n")
}
