pub mod openai;
pub mod scripted;

pub use openai::{OpenAiChatModel, OpenAiConfig};
pub use scripted::ScriptedModel;
