//! Structured extraction: the one place model replies enter the pipeline.
//!
//! ```text
//!   Classifier ──▶ StructuredClient ──▶ dyn ExtractionBackend ──▶ provider
//!                   │  JSON Schema of StageReply<T> (schemars)
//!                   │  payload extraction + serde validation
//!                   ▼  StageRecord::validate
//!                 Extracted<StageReply<T>>
//! ```
//!
//! [`ExtractionBackend`] is the transport seam: [`crate::pipeline::llm::LlmBackend`]
//! talks to a real provider, tests plug in scripted doubles. Nothing the
//! backend returns is trusted until [`StructuredClient`] has validated it
//! against the requested record type.

use crate::checkpoint::Stage;
use crate::error::ClassifyError;
use crate::output::TokenUsage;
use crate::pipeline::postprocess::{clean_markdown, extract_json};
use crate::schema::StageReply;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One piece of the user turn.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    /// Raw document bytes; the backend decides how to present them.
    Document { name: String, bytes: Arc<Vec<u8>> },
}

/// Shape the reply must take.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free text (OCR Markdown).
    Text,
    /// A JSON object conforming to `schema`.
    Json {
        schema_name: String,
        schema: serde_json::Value,
    },
}

/// A single model call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub stage: Stage,
    /// System instruction for the stage.
    pub instruction: String,
    pub parts: Vec<ContentPart>,
    pub format: ResponseFormat,
}

/// Unvalidated model reply.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Transport to a generative model.
///
/// Implementations own timeouts and retries; a returned error means the
/// call is given up on.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: ExtractionRequest) -> Result<RawResponse, ClassifyError>;
}

/// A record type a structured stage can produce.
pub trait StageRecord: Serialize + DeserializeOwned + JsonSchema + Clone + Send + Sync + 'static {
    /// Invariants the type system does not capture.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A validated value plus what it cost.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    pub value: T,
    pub usage: TokenUsage,
}

/// Schema-enforcing front of an [`ExtractionBackend`].
#[derive(Clone)]
pub struct StructuredClient {
    backend: Arc<dyn ExtractionBackend>,
}

impl StructuredClient {
    pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Free-text call for the OCR stage. Returns cleaned Markdown.
    pub async fn transcribe(
        &self,
        instruction: &str,
        parts: Vec<ContentPart>,
    ) -> Result<Extracted<String>, ClassifyError> {
        let request = ExtractionRequest {
            stage: Stage::Ocr,
            instruction: instruction.to_string(),
            parts,
            format: ResponseFormat::Text,
        };
        let response = self.backend.generate(request).await?;

        let markdown = clean_markdown(&response.content);
        if markdown.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse { stage: Stage::Ocr });
        }
        debug!("OCR produced {} bytes of Markdown", markdown.len());

        Ok(Extracted {
            value: markdown,
            usage: response.usage,
        })
    }

    /// Structured call: the reply must be a `T` or an [`crate::schema::ErrorOutput`].
    pub async fn invoke<T: StageRecord>(
        &self,
        stage: Stage,
        instruction: &str,
        parts: Vec<ContentPart>,
    ) -> Result<Extracted<StageReply<T>>, ClassifyError> {
        let schema = schemars::schema_for!(StageReply<T>);
        let schema = serde_json::to_value(&schema)
            .map_err(|e| ClassifyError::Internal(format!("schema serialisation failed: {e}")))?;

        let request = ExtractionRequest {
            stage,
            instruction: instruction.to_string(),
            parts,
            format: ResponseFormat::Json {
                schema_name: T::schema_name(),
                schema,
            },
        };
        let response = self.backend.generate(request).await?;
        if response.content.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse { stage });
        }

        let value = parse_reply::<T>(&response.content)?;
        Ok(Extracted {
            value,
            usage: response.usage,
        })
    }
}

/// Validate a reply text as `StageReply<T>`.
///
/// Also used to re-validate checkpoint payloads, which are stored in the
/// same shape.
pub fn parse_reply<T: StageRecord>(text: &str) -> Result<StageReply<T>, ClassifyError> {
    let schema = T::schema_name();
    let json = extract_json(text).ok_or_else(|| ClassifyError::SchemaValidation {
        schema: schema.clone(),
        detail: "reply contains no JSON object".into(),
    })?;

    let reply: StageReply<T> = match serde_json::from_str(json) {
        Ok(reply) => reply,
        Err(untagged) => {
            // The untagged error only says "no variant matched"; the record's
            // own error names the offending field.
            let detail = match serde_json::from_str::<T>(json) {
                Err(e) => e.to_string(),
                Ok(_) => untagged.to_string(),
            };
            return Err(ClassifyError::SchemaValidation { schema, detail });
        }
    };

    match &reply {
        StageReply::Record(record) => record
            .validate()
            .map_err(|detail| ClassifyError::SchemaValidation { schema, detail })?,
        StageReply::Rejected(err) if err.erro.trim().is_empty() => {
            return Err(ClassifyError::SchemaValidation {
                schema,
                detail: "error reply has an empty `erro`".into(),
            });
        }
        StageReply::Rejected(_) => {}
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DocumentGroup, TriageOutput};
    use std::sync::Mutex;

    /// Returns canned replies and records what it was asked.
    struct Canned {
        reply: String,
        seen: Mutex<Vec<ExtractionRequest>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExtractionBackend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, request: ExtractionRequest) -> Result<RawResponse, ClassifyError> {
            self.seen.lock().unwrap().push(request);
            Ok(RawResponse {
                content: self.reply.clone(),
                usage: TokenUsage::new(12, 3),
            })
        }
    }

    const TRIAGE: &str = r#"{
        "localizacao_ficheiro": "in/a.pdf",
        "grupo_documento": "DOCUMENTOS_RH",
        "numero_documento": "FR-02",
        "data_emissao": "2024-02-29",
        "notas_triagem": "Folha de remuneração."
    }"#;

    #[tokio::test]
    async fn invoke_sends_schema_and_validates() {
        let backend = Arc::new(Canned::new(&format!("```json\n{TRIAGE}\n```")));
        let client = StructuredClient::new(backend.clone());

        let out = client
            .invoke::<TriageOutput>(Stage::Triage, "classifica", vec![ContentPart::Text("x".into())])
            .await
            .unwrap();

        match out.value {
            StageReply::Record(t) => assert_eq!(t.grupo_documento, DocumentGroup::DocumentosRh),
            other => panic!("expected record, got {other:?}"),
        }
        assert_eq!(out.usage, TokenUsage::new(12, 3));

        let seen = backend.seen.lock().unwrap();
        match &seen[0].format {
            ResponseFormat::Json { schema_name, schema } => {
                assert_eq!(schema_name, "TriageOutput");
                let text = schema.to_string();
                assert!(text.contains("grupo_documento"));
                assert!(text.contains("erro"));
            }
            ResponseFormat::Text => panic!("expected a JSON format"),
        }
    }

    #[tokio::test]
    async fn invoke_reports_offending_field() {
        let bad = TRIAGE.replace("\"grupo_documento\": \"DOCUMENTOS_RH\",", "");
        let client = StructuredClient::new(Arc::new(Canned::new(&bad)));

        let err = client
            .invoke::<TriageOutput>(Stage::Triage, "classifica", vec![])
            .await
            .unwrap_err();
        match err {
            ClassifyError::SchemaValidation { schema, detail } => {
                assert_eq!(schema, "TriageOutput");
                assert!(detail.contains("grupo_documento"), "got: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invoke_passes_business_rejection_through() {
        let refusal = r#"{"localizacao_ficheiro": "in/a.pdf", "erro": "Documento ilegível"}"#;
        let client = StructuredClient::new(Arc::new(Canned::new(refusal)));

        let out = client
            .invoke::<TriageOutput>(Stage::Triage, "classifica", vec![])
            .await
            .unwrap();
        assert!(matches!(out.value, StageReply::Rejected(ref e) if e.erro == "Documento ilegível"));
    }

    #[tokio::test]
    async fn transcribe_rejects_empty_output() {
        let client = StructuredClient::new(Arc::new(Canned::new("  \n ")));
        let err = client.transcribe("ocr", vec![]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResponse { stage: Stage::Ocr }));
    }

    #[tokio::test]
    async fn transcribe_strips_markdown_fence() {
        let client = StructuredClient::new(Arc::new(Canned::new("```markdown\n# Factura\n```")));
        let out = client.transcribe("ocr", vec![]).await.unwrap();
        assert_eq!(out.value.trim(), "# Factura");
    }

    #[test]
    fn prose_without_json_is_rejected() {
        let err = parse_reply::<TriageOutput>("Não consigo ajudar.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }

    #[test]
    fn empty_error_reply_is_rejected() {
        let err = parse_reply::<TriageOutput>(r#"{"localizacao_ficheiro": "a", "erro": ""}"#);
        assert!(matches!(err, Err(ClassifyError::SchemaValidation { .. })));
    }
}
