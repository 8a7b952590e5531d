//! Customs documents: single administrative documents, value and
//! settlement notes, receipts, clearance notes.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Importer/issuer fields printed on most customs documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComunsAduaneiro {
    #[serde(default)]
    pub nif_importador: Option<String>,
    #[serde(default)]
    pub nome_importador: Option<String>,
    #[serde(default)]
    pub entidade_emissora: Option<String>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosDocumentoUnicoProvisorio {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    pub numero_licenca: String,
    pub data_licenciamento: String,
    #[serde(default)]
    pub valor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosDocumentoUnico {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    /// Customs registration reference.
    pub referencia_registo: String,
    pub origem_mercadoria: String,
    pub total_facturado: f64,
    pub manifesto: String,
    #[serde(default)]
    pub moeda: Option<String>,
    #[serde(default)]
    pub numero_licenca: Option<String>,
    #[serde(default)]
    pub taxa_cambio: Option<f64>,
}

/// Value note. Carries no importer block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaValor {
    #[serde(default)]
    pub entidade_emissora: Option<String>,
    #[serde(default)]
    pub observacoes: Option<String>,
    pub referencia_registo: String,
    pub valor_factura: f64,
    pub valor_aduaneiro: f64,
    pub frete_externo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaLiquidacaoAduaneira {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    pub referencia_registo: String,
    pub prazo_limite_pagamento: String,
    pub total_a_pagar: f64,
    /// Single state collection reference.
    pub rupe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosReciboAduaneiro {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    pub referencia_registo: String,
    pub numero_recibo: String,
    pub valor_total_liquidado: f64,
    pub rupe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaDesalfandegamento {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    pub referencia_registo: String,
    pub data_desalfandegamento: String,
    #[serde(default)]
    pub referencia_liquidacao: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosOutroDocumentoAduaneiro {
    #[serde(flatten)]
    pub comuns: MetadadosComunsAduaneiro,
    pub tipo_documento_especifico: String,
}

/// Closed set of customs document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum CustomsDocument {
    DocumentoUnicoProvisorio(MetadadosDocumentoUnicoProvisorio),
    DocumentoUnico(MetadadosDocumentoUnico),
    NotaValor(MetadadosNotaValor),
    NotaLiquidacao(MetadadosNotaLiquidacaoAduaneira),
    Recibo(MetadadosReciboAduaneiro),
    NotaDesalfandegamento(MetadadosNotaDesalfandegamento),
    OutroDocumentoAduaneiro(MetadadosOutroDocumentoAduaneiro),
}

impl SpecialistDocument for CustomsDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosAduaneiros;

    fn tipo_documento(&self) -> &'static str {
        match self {
            CustomsDocument::DocumentoUnicoProvisorio(_) => "DOCUMENTO_UNICO_PROVISORIO",
            CustomsDocument::DocumentoUnico(_) => "DOCUMENTO_UNICO",
            CustomsDocument::NotaValor(_) => "NOTA_VALOR",
            CustomsDocument::NotaLiquidacao(_) => "NOTA_LIQUIDACAO",
            CustomsDocument::Recibo(_) => "RECIBO",
            CustomsDocument::NotaDesalfandegamento(_) => "NOTA_DESALFANDEGAMENTO",
            CustomsDocument::OutroDocumentoAduaneiro(_) => "OUTRO_DOCUMENTO_ADUANEIRO",
        }
    }
}
