//! LLM provider configuration

use super::{GeminiService, LlmError, LlmService, LoggingService};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VERTEX_REGION: &str = "us-central1";

/// How requests to Gemini are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiAuth {
    /// Direct Gemini API with an API key
    ApiKey(String),
    /// Vertex AI with an OAuth access token
    Vertex {
        project: String,
        region: String,
        access_token: String,
    },
    /// Proxy that injects credentials itself
    Gateway(String),
}

/// Configuration for the reasoning model
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub google_cloud_project: Option<String>,
    pub google_cloud_region: Option<String>,
    pub google_access_token: Option<String>,
    /// Gateway base URL (e.g., `http://169.254.169.254/gateway/llm`)
    pub gateway: Option<String>,
    pub model: Option<String>,
    /// Per-request HTTP timeout
    pub http_timeout: Option<Duration>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            google_cloud_project: non_empty_var("GOOGLE_CLOUD_PROJECT"),
            google_cloud_region: non_empty_var("GOOGLE_CLOUD_REGION"),
            google_access_token: non_empty_var("GOOGLE_ACCESS_TOKEN"),
            gateway: non_empty_var("LLM_GATEWAY"),
            model: non_empty_var("GEMINI_MODEL"),
            http_timeout: None,
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    /// Pick the authentication mode. Gateway wins, then API key, then Vertex.
    pub fn auth(&self) -> Option<GeminiAuth> {
        if let Some(gateway) = &self.gateway {
            return Some(GeminiAuth::Gateway(gateway.clone()));
        }
        if let Some(key) = &self.gemini_api_key {
            return Some(GeminiAuth::ApiKey(key.clone()));
        }
        match (&self.google_cloud_project, &self.google_access_token) {
            (Some(project), Some(token)) => Some(GeminiAuth::Vertex {
                project: project.clone(),
                region: self
                    .google_cloud_region
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VERTEX_REGION.to_string()),
                access_token: token.clone(),
            }),
            _ => None,
        }
    }

    /// Build the configured service, wrapped with request logging
    pub fn build_service(&self) -> Result<Arc<dyn LlmService>, LlmError> {
        let auth = self.auth().ok_or_else(|| {
            LlmError::auth("No Gemini credentials configured. Set GEMINI_API_KEY, LLM_GATEWAY, or GOOGLE_CLOUD_PROJECT with GOOGLE_ACCESS_TOKEN.")
        })?;
        let service = GeminiService::new(auth, self.model(), self.http_timeout)?;
        Ok(Arc::new(LoggingService::new(Arc::new(service))))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
