//! Stage output records.
//!
//! Every structured stage reply is validated into one of these types before
//! it is used or checkpointed. Field names and enum wire values are the
//! European-Portuguese names the prompts and downstream consumers expect
//! (`grupo_documento`, `DOCUMENTOS_BANCARIOS`, …).
//!
//! ## Shapes
//!
//! ```text
//! TriageOutput            common header + notas_triagem + conteudo (OCR text)
//! SpecialistOutput<D>     common header + notas_classificacao
//!                           + D: tipo_documento ⇒ metadados_documento
//! ErrorOutput             localizacao_ficheiro + erro (+ known context)
//! ```
//!
//! Each category's `D` is a closed sum type adjacently tagged by
//! `tipo_documento`, so the discriminator decides which field set
//! `metadados_documento` must carry. Field sets shared by several
//! document types are composed with `#[serde(flatten)]`.

pub mod banking;
pub mod customs;
pub mod freight;
pub mod hr;
pub mod invoice;
pub mod taxes;

use crate::extract::StageRecord;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use banking::BankingDocument;
pub use customs::CustomsDocument;
pub use freight::FreightDocument;
pub use hr::HrDocument;
pub use invoice::InvoiceDocument;
pub use taxes::TaxesDocument;

/// Coarse business category assigned by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentGroup {
    /// Invoices, credit/debit notes, receipts.
    DocumentosComerciais,
    /// Customs declarations and settlement notes.
    DocumentosAduaneiros,
    /// Air waybills, bills of lading.
    DocumentosFrete,
    /// Tax assessments and payment slips.
    DocumentosFiscais,
    /// Statements and transfer/payment receipts.
    DocumentosBancarios,
    /// Payroll sheets.
    DocumentosRh,
    /// Anything else. Has no specialist stage.
    OutrosDocumentos,
}

impl DocumentGroup {
    /// Every category, in declaration order.
    pub const ALL: [DocumentGroup; 7] = [
        DocumentGroup::DocumentosComerciais,
        DocumentGroup::DocumentosAduaneiros,
        DocumentGroup::DocumentosFrete,
        DocumentGroup::DocumentosFiscais,
        DocumentGroup::DocumentosBancarios,
        DocumentGroup::DocumentosRh,
        DocumentGroup::OutrosDocumentos,
    ];

    /// Wire value, e.g. `"DOCUMENTOS_COMERCIAIS"`.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentGroup::DocumentosComerciais => "DOCUMENTOS_COMERCIAIS",
            DocumentGroup::DocumentosAduaneiros => "DOCUMENTOS_ADUANEIROS",
            DocumentGroup::DocumentosFrete => "DOCUMENTOS_FRETE",
            DocumentGroup::DocumentosFiscais => "DOCUMENTOS_FISCAIS",
            DocumentGroup::DocumentosBancarios => "DOCUMENTOS_BANCARIOS",
            DocumentGroup::DocumentosRh => "DOCUMENTOS_RH",
            DocumentGroup::OutrosDocumentos => "OUTROS_DOCUMENTOS",
        }
    }
}

impl fmt::Display for DocumentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Triage ───────────────────────────────────────────────────────────────

/// Output of the triage stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriageOutput {
    /// Original location of the file.
    pub localizacao_ficheiro: String,
    /// Category the document was assigned to.
    pub grupo_documento: DocumentGroup,
    /// Code uniquely identifying the document.
    pub numero_documento: String,
    /// Issue or reference date (yyyy-MM-dd).
    pub data_emissao: String,
    /// Issue time (HH:mm), when printed on the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hora_emissao: Option<String>,
    /// Free-text justification of the category (European Portuguese).
    pub notas_triagem: String,
    /// Markdown transcription carried forward to the specialist stage.
    /// Stripped from final results.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conteudo: String,
}

impl TriageOutput {
    /// The record as a final result: identical, minus the carried text.
    pub fn without_content(&self) -> TriageOutput {
        TriageOutput {
            conteudo: String::new(),
            ..self.clone()
        }
    }
}

impl StageRecord for TriageOutput {
    fn validate(&self) -> Result<(), String> {
        if self.numero_documento.trim().is_empty() {
            return Err("`numero_documento` is empty".into());
        }
        if self.data_emissao.trim().is_empty() {
            return Err("`data_emissao` is empty".into());
        }
        Ok(())
    }
}

// ── Specialist ───────────────────────────────────────────────────────────

/// A category's closed set of document types and their metadata.
pub trait SpecialistDocument:
    Serialize + DeserializeOwned + JsonSchema + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
    /// The triage category this document family belongs to.
    const GROUP: DocumentGroup;

    /// Wire value of the `tipo_documento` discriminator.
    fn tipo_documento(&self) -> &'static str;
}

/// Output of a specialist stage for category documents `D`.
///
/// The header fields echo the triage record; `documento` contributes the
/// `tipo_documento` / `metadados_documento` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(bound(deserialize = "D: SpecialistDocument"))]
pub struct SpecialistOutput<D: SpecialistDocument> {
    pub localizacao_ficheiro: String,
    pub grupo_documento: DocumentGroup,
    pub numero_documento: String,
    pub data_emissao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hora_emissao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas_triagem: Option<String>,
    /// Detailed justification of the final classification.
    pub notas_classificacao: String,
    #[serde(flatten)]
    pub documento: D,
}

impl<D: SpecialistDocument> StageRecord for SpecialistOutput<D> {
    fn validate(&self) -> Result<(), String> {
        if self.grupo_documento != D::GROUP {
            return Err(format!(
                "`grupo_documento` is {} but the record describes {} documents",
                self.grupo_documento,
                D::GROUP
            ));
        }
        Ok(())
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// The uniform failure record.
///
/// Returned when any stage fails, and also the shape a model uses to
/// decline a classification it cannot perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorOutput {
    /// Echo of the input file location.
    pub localizacao_ficheiro: String,
    /// Description of the error.
    pub erro: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grupo_documento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas_triagem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas_classificacao: Option<String>,
}

impl ErrorOutput {
    pub fn new(path: impl AsRef<Path>, erro: impl Into<String>) -> Self {
        Self {
            localizacao_ficheiro: path.as_ref().display().to_string(),
            erro: erro.into(),
            grupo_documento: None,
            notas_triagem: None,
            notas_classificacao: None,
        }
    }

    /// Attach what triage already established about the document.
    pub fn with_triage(mut self, triage: &TriageOutput) -> Self {
        self.grupo_documento = Some(triage.grupo_documento.to_string());
        self.notas_triagem = Some(triage.notas_triagem.clone());
        self
    }
}

// ── Replies ──────────────────────────────────────────────────────────────

/// What a structured stage may answer: the requested record, or a
/// business-level refusal in the [`ErrorOutput`] shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StageReply<T> {
    Record(T),
    Rejected(ErrorOutput),
}

// ── Final result ─────────────────────────────────────────────────────────

/// Final result of classifying one document.
///
/// Serialises as the bare record (no wrapper), so an aggregated JSON
/// array holds one plain object per input document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Classification {
    Banking(SpecialistOutput<BankingDocument>),
    Customs(SpecialistOutput<CustomsDocument>),
    Freight(SpecialistOutput<FreightDocument>),
    Hr(SpecialistOutput<HrDocument>),
    Invoice(SpecialistOutput<InvoiceDocument>),
    Taxes(SpecialistOutput<TaxesDocument>),
    /// Triage-only terminal result (no specialist for the category).
    Triage(TriageOutput),
    Error(ErrorOutput),
}

impl Classification {
    pub fn is_error(&self) -> bool {
        matches!(self, Classification::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorOutput> {
        match self {
            Classification::Error(e) => Some(e),
            _ => None,
        }
    }

    /// The category, when one was established.
    pub fn group(&self) -> Option<DocumentGroup> {
        match self {
            Classification::Banking(o) => Some(o.grupo_documento),
            Classification::Customs(o) => Some(o.grupo_documento),
            Classification::Freight(o) => Some(o.grupo_documento),
            Classification::Hr(o) => Some(o.grupo_documento),
            Classification::Invoice(o) => Some(o.grupo_documento),
            Classification::Taxes(o) => Some(o.grupo_documento),
            Classification::Triage(o) => Some(o.grupo_documento),
            Classification::Error(_) => None,
        }
    }

    /// The specialist document type, when a specialist stage ran.
    pub fn tipo_documento(&self) -> Option<&'static str> {
        match self {
            Classification::Banking(o) => Some(o.documento.tipo_documento()),
            Classification::Customs(o) => Some(o.documento.tipo_documento()),
            Classification::Freight(o) => Some(o.documento.tipo_documento()),
            Classification::Hr(o) => Some(o.documento.tipo_documento()),
            Classification::Invoice(o) => Some(o.documento.tipo_documento()),
            Classification::Taxes(o) => Some(o.documento.tipo_documento()),
            Classification::Triage(_) | Classification::Error(_) => None,
        }
    }

    /// Short human-readable label, e.g. `DOCUMENTOS_COMERCIAIS/FACTURA`.
    pub fn label(&self) -> String {
        match (self.group(), self.tipo_documento()) {
            (Some(g), Some(t)) => format!("{g}/{t}"),
            (Some(g), None) => g.to_string(),
            _ => "ERROR".to_string(),
        }
    }
}
