/// Connection settings for an OpenAI-compatible endpoint (OpenAI, Groq, Cerebras...)
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    /// Base URL including the API version, e.g. `https://api.groq.com/openai/v1`
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}
