//! Building blocks behind the stages.
//!
//! ```text
//! input ──▶ (bytes) ──▶ llm ──▶ render ──▶ encode ──▶ provider
//!                        │
//!                        └──▶ postprocess (Markdown cleanup, JSON payload)
//! ```
//!
//! 1. [`input`]  reads a document and classifies read failures
//! 2. [`llm`]    the provider-backed [`crate::extract::ExtractionBackend`]
//! 3. [`render`] rasterises PDF pages for the OCR call (`spawn_blocking`)
//! 4. [`encode`] PNG + base64 for the multimodal request body
//! 5. [`postprocess`] deterministic cleanup of model replies

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
