//! Banking documents: statements, transfer and payment receipts.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fields shared by every banking receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComunsBancario {
    /// Operation number or transaction reference.
    pub numero_operacao: String,
    /// Bank that issued the document.
    pub entidade_emissora: String,
    /// Name of the ordering party.
    pub nome_ordenante: String,
    #[serde(default)]
    pub iban_ordenante: Option<String>,
    pub numero_conta_ordenante: String,
    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosExtractoBancario {
    pub entidade_emissora: String,
    pub nome_cliente: String,
    pub numero_conta: String,
    #[serde(default)]
    pub observacoes: Option<String>,
    pub saldo_inicial: f64,
    pub saldo_final: f64,
    /// First day of the statement period (yyyy-MM-dd).
    pub periodo_referencia_inicio: String,
    /// Last day of the statement period (yyyy-MM-dd).
    pub periodo_referencia_fim: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosTransferenciaBancaria {
    #[serde(flatten)]
    pub comuns: MetadadosComunsBancario,
    pub nome_beneficiario: String,
    pub iban_beneficiario: String,
    pub montante: f64,
    /// ISO currency code, e.g. `AOA`.
    pub moeda: String,
    pub referencia_transaccao: String,
    #[serde(default)]
    pub finalidade_transferencia: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosTransferenciaAtm {
    #[serde(flatten)]
    pub comuns: MetadadosComunsBancario,
    /// ATM identifier.
    pub numero_caixa: String,
    pub montante: f64,
    pub iban_destino: String,
    #[serde(default)]
    pub referencia_transaccao: Option<String>,
    #[serde(default)]
    pub movimento_cartao: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosTransferenciaMulticaixaExpress {
    #[serde(flatten)]
    pub comuns: MetadadosComunsBancario,
    #[serde(default)]
    pub telefone_beneficiario: Option<String>,
    pub montante: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComprovativoPagamento {
    #[serde(flatten)]
    pub comuns: MetadadosComunsBancario,
    pub montante: f64,
    #[serde(default)]
    pub entidade_pagamento: Option<String>,
    pub referencia_pagamento: String,
    #[serde(default)]
    pub tipo_pagamento: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosOutroDocumentoBancario {
    #[serde(flatten)]
    pub comuns: MetadadosComunsBancario,
    /// What kind of banking document this is, in free text.
    pub tipo_documento_especifico: String,
}

/// Closed set of banking document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum BankingDocument {
    ExtractoBancario(MetadadosExtractoBancario),
    ComprovativoTransferenciaBancaria(MetadadosTransferenciaBancaria),
    ComprovativoTransferenciaAtm(MetadadosTransferenciaAtm),
    ComprovativoTransferenciaMulticaixaExpress(MetadadosTransferenciaMulticaixaExpress),
    ComprovativoPagamento(MetadadosComprovativoPagamento),
    OutroDocumentoBancario(MetadadosOutroDocumentoBancario),
}

impl SpecialistDocument for BankingDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosBancarios;

    fn tipo_documento(&self) -> &'static str {
        match self {
            BankingDocument::ExtractoBancario(_) => "EXTRACTO_BANCARIO",
            BankingDocument::ComprovativoTransferenciaBancaria(_) => {
                "COMPROVATIVO_TRANSFERENCIA_BANCARIA"
            }
            BankingDocument::ComprovativoTransferenciaAtm(_) => "COMPROVATIVO_TRANSFERENCIA_ATM",
            BankingDocument::ComprovativoTransferenciaMulticaixaExpress(_) => {
                "COMPROVATIVO_TRANSFERENCIA_MULTICAIXA_EXPRESS"
            }
            BankingDocument::ComprovativoPagamento(_) => "COMPROVATIVO_PAGAMENTO",
            BankingDocument::OutroDocumentoBancario(_) => "OUTRO_DOCUMENTO_BANCARIO",
        }
    }
}
