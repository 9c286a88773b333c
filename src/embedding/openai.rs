//! OpenAI embeddings (`text-embedding-3-*`), the hosted alternative to Ollama.

use super::Embedder;
use crate::error::{KildeError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per API request. The API rejects larger arrays.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Embedder backed by the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// `text-embedding-3-small` at its native 1536 dimensions.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 1536)
    }

    /// Any `text-embedding-3` model, truncated to `dimensions`.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| KildeError::Embedding(format!("Invalid embedding request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| KildeError::OpenAI(format!("Embedding API error: {}", e)))?;

        if response.data.len() != inputs.len() {
            return Err(KildeError::Embedding(format!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                response.data.len()
            )));
        }

        // The API may answer out of order; `index` refers to the input position.
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KildeError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for inputs in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            embeddings.extend(self.request(inputs).await?);
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_follow_config() {
        assert_eq!(OpenAIEmbedder::new().unwrap().dimensions(), 1536);
        assert_eq!(
            OpenAIEmbedder::with_config("text-embedding-3-large", 3072)
                .unwrap()
                .dimensions(),
            3072
        );
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let embedder = OpenAIEmbedder::new().unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
