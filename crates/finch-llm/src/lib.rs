pub mod mock;
pub mod openai;
pub mod wire;

pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
