pub mod backend;
pub mod parser;
pub mod prompts;
pub mod retry;

#[cfg(feature = "gemini")]
pub mod client;
#[cfg(feature = "gemini")]
pub mod types;

pub use backend::*;
pub use parser::*;
pub use prompts::*;
pub use retry::*;

#[cfg(feature = "gemini")]
pub use client::*;
