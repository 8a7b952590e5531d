//! Tax documents: assessment notes, social-security slips, payment receipts.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tax a document refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Imposto {
    ImpostoRendimentoTrabalhoGrupoA,
    ImpostoRendimentoTrabalhoGrupoB,
    /// Wire value carries the tax authority's historical spelling.
    #[serde(rename = "IMPOSTO_INDUTRIAL")]
    ImpostoIndustrial,
    ImpostoIndustrialRetencaoFonte,
    ImpostoValorAcrescentado,
    ImpostoSelo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComunsFiscal {
    pub nif_contribuinte: String,
    pub nome_contribuinte: String,
    pub entidade_emissora: String,
    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaLiquidacaoFiscal {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFiscal,
    pub documento_associado: String,
    pub data_limite_pagamento: String,
    pub valor_total: f64,
    #[serde(default)]
    pub periodo_tributacao_mes: Option<i64>,
    pub referencia_pagamento: String,
    pub periodo_tributacao_ano: i64,
    pub imposto: Imposto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosGuiaPagamentoInss {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFiscal,
    pub inscricao_inss: String,
    #[serde(default)]
    pub data_limite_pagamento: Option<String>,
    #[serde(default)]
    pub valor_total: Option<f64>,
    pub referencia_pagamento: String,
    #[serde(default)]
    pub periodo_tributacao_mes: Option<i64>,
    pub periodo_tributacao_ano: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosReciboPagamento {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFiscal,
    pub documento_associado: String,
    pub data_limite_pagamento: String,
    pub valor_total: f64,
    #[serde(default)]
    pub mes: Option<i64>,
    pub ano: i64,
    pub imposto: Imposto,
    #[serde(default)]
    pub data_pagamento: Option<String>,
    pub referencia_pagamento: String,
    pub forma_pagamento: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComprovativoLiquidacao {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFiscal,
    pub valor_total: f64,
    #[serde(default)]
    pub mes: Option<i64>,
    pub ano: i64,
    pub imposto: Imposto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosOutroDocumentoFiscal {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFiscal,
    #[serde(default)]
    pub tipo_documento_especifico: Option<String>,
}

/// Closed set of tax document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum TaxesDocument {
    NotaLiquidacao(MetadadosNotaLiquidacaoFiscal),
    GuiaPagamentoInss(MetadadosGuiaPagamentoInss),
    ReciboPagamento(MetadadosReciboPagamento),
    ComprovativoLiquidacao(MetadadosComprovativoLiquidacao),
    OutroDocumentoFiscal(MetadadosOutroDocumentoFiscal),
}

impl SpecialistDocument for TaxesDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosFiscais;

    fn tipo_documento(&self) -> &'static str {
        match self {
            TaxesDocument::NotaLiquidacao(_) => "NOTA_LIQUIDACAO",
            TaxesDocument::GuiaPagamentoInss(_) => "GUIA_PAGAMENTO_INSS",
            TaxesDocument::ReciboPagamento(_) => "RECIBO_PAGAMENTO",
            TaxesDocument::ComprovativoLiquidacao(_) => "COMPROVATIVO_LIQUIDACAO",
            TaxesDocument::OutroDocumentoFiscal(_) => "OUTRO_DOCUMENTO_FISCAL",
        }
    }
}
