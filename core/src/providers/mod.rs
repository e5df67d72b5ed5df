pub mod factory;
pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;
mod utils;

pub use factory::create_provider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
