//! # docchat-llm
//!
//! Answer generation for the docchat RAG pipeline. The [`AnswerGenerator`]
//! trait is the seam between the retrieval service and whatever produces
//! text; the shipped implementation talks to a llama.cpp-style completion
//! server running locally, keeping the inference engine an external
//! collaborator rather than a linked dependency.
//!
//! ```no_run
//! use docchat_llm::{AnswerGenerator, LlamaServerConfig, LlamaServerGenerator};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let generator = LlamaServerGenerator::new(LlamaServerConfig::default())?;
//! let answer = generator.generate("QUESTION: What is Rust?\n\nANSWER:", 256).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! [`fetch::ensure_model_file`] covers the other half of running locally:
//! idempotent streaming download of a GGUF weights file for the server to
//! load.

pub mod error;
pub mod fetch;
pub mod generator;
pub mod llama_server;

pub use error::{GenerateError, Result};
pub use fetch::ensure_model_file;
pub use generator::AnswerGenerator;
pub use llama_server::{LlamaServerConfig, LlamaServerGenerator};
