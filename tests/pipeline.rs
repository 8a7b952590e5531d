//! Pipeline integration tests against a scripted backend.
//!
//! No network and no pdfium: the scripted backend answers each stage from
//! canned replies and counts its calls, so the tests can check exactly
//! which stages reached the model.

use async_trait::async_trait;
use edgequake_docclass::checkpoint::{CheckpointStore, FsCheckpointStore, Stage};
use edgequake_docclass::extract::ContentPart;
use edgequake_docclass::schema::SpecialistDocument;
use edgequake_docclass::{
    classify_batch, classify_stream, write_results, CheckpointError, Classification, Classifier,
    ClassifierConfig, ClassifyError, DocumentGroup, DocumentId, ExtractionBackend,
    ExtractionRequest, RawResponse, TokenUsage,
};
use futures::StreamExt;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Scripted backend ─────────────────────────────────────────────────────────

type Reply = Box<dyn Fn(Stage, &str) -> Result<String, ClassifyError> + Send + Sync>;

struct Scripted {
    reply: Reply,
    ocr: AtomicUsize,
    triage: AtomicUsize,
    specialist: AtomicUsize,
}

impl Scripted {
    fn new(reply: impl Fn(Stage, &str) -> Result<String, ClassifyError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            ocr: AtomicUsize::new(0),
            triage: AtomicUsize::new(0),
            specialist: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> (usize, usize, usize) {
        (
            self.ocr.load(Ordering::SeqCst),
            self.triage.load(Ordering::SeqCst),
            self.specialist.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl ExtractionBackend for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ExtractionRequest) -> Result<RawResponse, ClassifyError> {
        let counter = match request.stage {
            Stage::Ocr => &self.ocr,
            Stage::Triage => &self.triage,
            Stage::Specialist => &self.specialist,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let text: Vec<&str> = request
            .parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Document { .. } => None,
            })
            .collect();

        let content = (self.reply)(request.stage, &text.join("\n"))?;
        Ok(RawResponse {
            content,
            usage: TokenUsage::new(100, 20),
        })
    }
}

// ── Canned replies ───────────────────────────────────────────────────────────

fn invoice_triage(location: &str) -> String {
    json!({
        "localizacao_ficheiro": location,
        "grupo_documento": "DOCUMENTOS_COMERCIAIS",
        "numero_documento": "FT 2024/001",
        "data_emissao": "2024-03-01",
        "notas_triagem": "Factura emitida pela Fornecedor Y a Empresa X."
    })
    .to_string()
}

fn invoice_specialist(location: &str) -> String {
    json!({
        "localizacao_ficheiro": location,
        "grupo_documento": "DOCUMENTOS_COMERCIAIS",
        "numero_documento": "FT 2024/001",
        "data_emissao": "2024-03-01",
        "notas_triagem": "Factura emitida pela Fornecedor Y a Empresa X.",
        "notas_classificacao": "Factura simples, sem indicação de pagamento.",
        "tipo_documento": "FACTURA",
        "metadados_documento": {
            "nif_emitente": "5000000001",
            "nome_emitente": "Fornecedor Y, SA",
            "nif_cliente": "5417000000",
            "nome_cliente": "Empresa X, Lda",
            "meio_pagamento": "Transferência",
            "moeda": "AOA",
            "total_sem_iva": 100000.0,
            "iva": 14000.0,
            "total": 114000.0,
            "observacoes": ""
        }
    })
    .to_string()
}

fn other_triage(location: &str) -> String {
    json!({
        "localizacao_ficheiro": location,
        "grupo_documento": "OUTROS_DOCUMENTOS",
        "numero_documento": "CT-7",
        "data_emissao": "2024-05-10",
        "notas_triagem": "Carta comercial sem enquadramento nas categorias."
    })
    .to_string()
}

/// The same invoice for every document. The location is left blank so the
/// pipeline fills in the real path.
fn invoice_script(stage: Stage, _text: &str) -> Result<String, ClassifyError> {
    Ok(match stage {
        Stage::Ocr => "# FACTURA FT 2024/001\n\nTotal: 114 000,00 AOA\n".to_string(),
        Stage::Triage => invoice_triage(""),
        Stage::Specialist => invoice_specialist(""),
    })
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn write_pdf(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("%PDF-1.7\n{body}\n%%EOF\n")).unwrap();
    path
}

fn classifier(backend: Arc<Scripted>, checkpoints: &Path) -> Classifier {
    Classifier::new(
        backend,
        Arc::new(FsCheckpointStore::new(checkpoints)),
        ClassifierConfig::builder().concurrency(2).build().unwrap(),
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invoice_runs_all_stages_then_resumes_without_calls() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "invoice one");

    let backend = Scripted::new(invoice_script);
    let classifier = classifier(Arc::clone(&backend), scratch.path());

    let first = classifier.classify_report(0, &path).await;
    assert_eq!(backend.calls(), (1, 1, 1));
    assert_eq!(first.stats.llm_calls, 3);
    assert_eq!(first.stats.checkpoint_hits, 0);
    assert_eq!(first.stats.usage, TokenUsage::new(300, 60));

    let record = match &first.classification {
        Classification::Invoice(record) => record,
        other => panic!("expected an invoice, got {other:?}"),
    };
    assert_eq!(record.documento.tipo_documento(), "FACTURA");
    assert_eq!(record.numero_documento, "FT 2024/001");
    assert_eq!(first.classification.label(), "DOCUMENTOS_COMERCIAIS/FACTURA");

    // Second run over the same bytes: everything from checkpoints.
    let second = classifier.classify_report(0, &path).await;
    assert_eq!(backend.calls(), (1, 1, 1));
    assert_eq!(second.stats.llm_calls, 0);
    assert_eq!(second.stats.checkpoint_hits, 3);
    assert_eq!(second.classification, first.classification);
}

#[tokio::test]
async fn renamed_copy_resumes_from_the_same_checkpoints() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let original = write_pdf(docs.path(), "invoice_001.pdf", "same bytes");
    let copy = write_pdf(docs.path(), "copy_of_invoice.pdf", "same bytes");

    // The model echoes a path of its own; the input path must win.
    let backend = Scripted::new(|stage, text| match stage {
        Stage::Triage => Ok(invoice_triage("scans/elsewhere.pdf")),
        Stage::Specialist => Ok(invoice_specialist("scans/elsewhere.pdf")),
        Stage::Ocr => invoice_script(stage, text),
    });
    let classifier = classifier(Arc::clone(&backend), scratch.path());

    let first = classifier.classify(&original).await;
    let result = classifier.classify(&copy).await;
    assert!(!result.is_error());
    assert_eq!(backend.calls(), (1, 1, 1));

    let echoed = |result: &Classification| match result {
        Classification::Invoice(record) => record.localizacao_ficheiro.clone(),
        other => panic!("expected an invoice, got {other:?}"),
    };
    assert_eq!(echoed(&first), original.display().to_string());
    assert_eq!(echoed(&result), copy.display().to_string());
}

#[tokio::test]
async fn missing_specialist_checkpoint_costs_one_call() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "stage three only");

    let backend = Scripted::new(invoice_script);
    let classifier = classifier(Arc::clone(&backend), scratch.path());
    let first = classifier.classify(&path).await;
    assert_eq!(backend.calls(), (1, 1, 1));

    let id = DocumentId::from_bytes(&std::fs::read(&path).unwrap());
    let store = FsCheckpointStore::new(scratch.path());
    std::fs::remove_file(store.path_for(&id, Stage::Specialist)).unwrap();

    let second = classifier.classify_report(0, &path).await;
    assert_eq!(backend.calls(), (1, 1, 2));
    assert_eq!(second.stats.llm_calls, 1);
    assert_eq!(second.stats.checkpoint_hits, 2);
    assert_eq!(second.classification, first);
    assert!(store.path_for(&id, Stage::Specialist).exists());
}

#[tokio::test]
async fn other_documents_stop_after_triage() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "letter.pdf", "a letter");
    let location = path.display().to_string();

    let backend = Scripted::new(move |stage, _| {
        Ok(match stage {
            Stage::Ocr => "Exmos. Senhores,\n\nCarta CT-7.\n".to_string(),
            Stage::Triage => other_triage(&location),
            Stage::Specialist => unreachable!("no specialist for OUTROS_DOCUMENTOS"),
        })
    });
    let result = classifier(Arc::clone(&backend), scratch.path())
        .classify(&path)
        .await;

    assert_eq!(backend.calls(), (1, 1, 0));
    match &result {
        Classification::Triage(triage) => {
            assert_eq!(triage.grupo_documento, DocumentGroup::OutrosDocumentos);
            assert!(triage.conteudo.is_empty());
        }
        other => panic!("expected a triage record, got {other:?}"),
    }
    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("conteudo").is_none());
    assert_eq!(value["grupo_documento"], "OUTROS_DOCUMENTOS");
}

#[tokio::test]
async fn ocr_text_is_carried_into_the_specialist_call() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "carry");

    let backend = Scripted::new(|stage, text| {
        if stage == Stage::Specialist {
            // The triage record in the prompt holds the transcription.
            assert!(text.contains("FACTURA FT 2024/001"), "prompt: {text}");
        }
        invoice_script(stage, text)
    });
    let result = classifier(backend, scratch.path()).classify(&path).await;
    assert!(!result.is_error(), "{result:?}");
}

#[tokio::test]
async fn missing_file_in_batch_yields_one_error() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let a = write_pdf(docs.path(), "a.pdf", "a");
    let missing = docs.path().join("missing.pdf");
    let b = write_pdf(docs.path(), "b.pdf", "b");

    let backend = Scripted::new(invoice_script);
    let classifier = classifier(Arc::clone(&backend), scratch.path());
    let output = classify_batch(&classifier, [&a, &missing, &b]).await;

    assert_eq!(output.reports.len(), 3);
    assert_eq!(output.stats.total_documents, 3);
    assert_eq!(output.stats.succeeded, 2);
    assert_eq!(output.stats.failed, 1);

    // Input order is restored.
    let paths: Vec<&PathBuf> = output.reports.iter().map(|r| &r.path).collect();
    assert_eq!(paths, vec![&a, &missing, &b]);

    let err = output.reports[1].classification.as_error().unwrap();
    assert_eq!(err.localizacao_ficheiro, missing.display().to_string());
    assert!(err.erro.contains("File not found"), "got: {}", err.erro);
    assert_eq!(backend.calls(), (2, 2, 2));
}

#[tokio::test]
async fn non_pdf_bytes_are_rejected_before_any_call() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = docs.path().join("fake.pdf");
    std::fs::write(&path, "just some text").unwrap();

    let backend = Scripted::new(invoice_script);
    let result = classifier(Arc::clone(&backend), scratch.path())
        .classify(&path)
        .await;

    assert!(result.is_error());
    assert_eq!(backend.calls(), (0, 0, 0));
}

#[tokio::test]
async fn triage_rejection_is_returned_and_not_checkpointed() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "blurry.pdf", "blurry");

    let backend = Scripted::new(|stage, _| {
        Ok(match stage {
            Stage::Ocr => "ilegível".to_string(),
            Stage::Triage => json!({
                "localizacao_ficheiro": "",
                "erro": "Documento ilegível, impossível identificar o número."
            })
            .to_string(),
            Stage::Specialist => unreachable!(),
        })
    });
    let classifier = classifier(Arc::clone(&backend), scratch.path());

    let result = classifier.classify(&path).await;
    let err = result.as_error().unwrap();
    assert_eq!(err.erro, "Documento ilegível, impossível identificar o número.");
    assert_eq!(err.localizacao_ficheiro, path.display().to_string());

    // OCR resumes; triage is asked again.
    classifier.classify(&path).await;
    assert_eq!(backend.calls(), (1, 2, 0));
}

#[tokio::test]
async fn invalid_specialist_reply_keeps_triage_context() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "bad specialist");

    let backend = Scripted::new(|stage, text| match stage {
        Stage::Specialist => Ok(json!({"tipo_documento": "FACTURA"}).to_string()),
        _ => invoice_script(stage, text),
    });
    let result = classifier(backend, scratch.path()).classify(&path).await;

    let err = result.as_error().expect("error record");
    assert_eq!(err.grupo_documento.as_deref(), Some("DOCUMENTOS_COMERCIAIS"));
    assert_eq!(
        err.notas_triagem.as_deref(),
        Some("Factura emitida pela Fornecedor Y a Empresa X.")
    );
}

#[tokio::test]
async fn specialist_echoing_another_group_is_an_error() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "wrong group");

    let backend = Scripted::new(|stage, text| match stage {
        Stage::Specialist => {
            let mut v: serde_json::Value =
                serde_json::from_str(&invoice_specialist("x.pdf")).unwrap();
            v["grupo_documento"] = json!("DOCUMENTOS_FISCAIS");
            Ok(v.to_string())
        }
        _ => invoice_script(stage, text),
    });
    let result = classifier(backend, scratch.path()).classify(&path).await;
    assert!(result.is_error(), "{result:?}");
}

#[tokio::test]
async fn corrupt_checkpoint_is_recomputed() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "corrupt me");

    let backend = Scripted::new(invoice_script);
    let classifier = classifier(Arc::clone(&backend), scratch.path());
    classifier.classify(&path).await;

    let id = DocumentId::from_bytes(&std::fs::read(&path).unwrap());
    let store = FsCheckpointStore::new(scratch.path());
    std::fs::write(store.path_for(&id, Stage::Triage), "{ not json").unwrap();

    let result = classifier.classify(&path).await;
    assert!(!result.is_error(), "{result:?}");
    assert_eq!(backend.calls(), (1, 2, 1));

    // The recomputed record replaced the corrupt one.
    let payload = std::fs::read_to_string(store.path_for(&id, Stage::Triage)).unwrap();
    assert!(payload.contains("FT 2024/001"));
}

/// Every load and save fails.
struct BrokenStore;

#[async_trait]
impl CheckpointStore for BrokenStore {
    async fn has(&self, _id: &DocumentId, _stage: Stage) -> bool {
        false
    }

    async fn load(&self, _id: &DocumentId, _stage: Stage) -> Result<Option<String>, CheckpointError> {
        Err(CheckpointError::Task("disk on fire".into()))
    }

    async fn save(&self, _id: &DocumentId, _stage: Stage, _payload: &str) -> Result<(), CheckpointError> {
        Err(CheckpointError::Task("disk on fire".into()))
    }
}

#[tokio::test]
async fn checkpoint_failures_never_fail_a_document() {
    let docs = tempfile::tempdir().unwrap();
    let path = write_pdf(docs.path(), "invoice_001.pdf", "broken store");

    let backend = Scripted::new(invoice_script);
    let classifier = Classifier::new(
        Arc::clone(&backend) as Arc<dyn ExtractionBackend>,
        Arc::new(BrokenStore),
        ClassifierConfig::default(),
    );

    let result = classifier.classify(&path).await;
    assert!(!result.is_error(), "{result:?}");
    classifier.classify(&path).await;
    assert_eq!(backend.calls(), (2, 2, 2));

    // Same record as with a working store.
    let scratch = tempfile::tempdir().unwrap();
    let working = classify_with_store(&path, FsCheckpointStore::new(scratch.path())).await;
    assert_eq!(result, working);
}

async fn classify_with_store(path: &Path, store: impl CheckpointStore + 'static) -> Classification {
    Classifier::new(
        Scripted::new(invoice_script),
        Arc::new(store),
        ClassifierConfig::default(),
    )
    .classify(path)
    .await
}

#[tokio::test]
async fn stream_yields_every_document() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..5)
        .map(|i| write_pdf(docs.path(), &format!("doc_{i}.pdf"), &format!("doc {i}")))
        .collect();

    let backend = Scripted::new(invoice_script);
    let classifier = classifier(backend, scratch.path());

    let mut indices: Vec<usize> = classify_stream(&classifier, &paths)
        .map(|report| report.index)
        .collect()
        .await;
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn batch_results_file_holds_one_record_per_input() {
    let docs = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let a = write_pdf(docs.path(), "invoice_001.pdf", "a");
    let missing = docs.path().join("gone.pdf");

    let classifier = classifier(Scripted::new(invoice_script), scratch.path());
    let output = classify_batch(&classifier, [&a, &missing]).await;

    let out = docs.path().join("results.json");
    write_results(&out, &output.reports).await.unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["tipo_documento"], "FACTURA");
    assert_eq!(items[0]["metadados_documento"]["total"], 114000.0);
    assert!(items[1]["erro"].is_string());
    assert_eq!(items[1]["localizacao_ficheiro"], missing.display().to_string());
}
