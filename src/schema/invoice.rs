//! Commercial documents: invoices, pro-formas, debit/credit notes, receipts.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fields every commercial document carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComunsFactura {
    /// Issuer tax number.
    pub nif_emitente: String,
    pub nome_emitente: String,
    /// Customer tax number.
    pub nif_cliente: String,
    pub nome_cliente: String,
    pub meio_pagamento: String,
    pub moeda: String,
    pub total_sem_iva: f64,
    /// VAT amount.
    pub iva: f64,
    pub total: f64,
    pub observacoes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosFacturaProForma {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFactura,
    /// Validity date of the quotation.
    pub validade: String,
}

/// Invoices covering a period rather than a single sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosFacturaPeriodo {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFactura,
    pub periodo_referencia_inicio: String,
    pub periodo_referencia_fim: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaDebito {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFactura,
    pub descricao: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosNotaCredito {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFactura,
    pub motivo: String,
    /// Number of the invoice being credited.
    pub documento_origem: String,
}

/// One settled document listed on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetalheRecibo {
    pub documento: String,
    pub facturado: f64,
    pub pago: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosRecibo {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFactura,
    pub detalhes: Vec<DetalheRecibo>,
}

/// Closed set of commercial document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum InvoiceDocument {
    FacturaProForma(MetadadosFacturaProForma),
    FacturaRecibo(MetadadosComunsFactura),
    Factura(MetadadosComunsFactura),
    FacturaGlobal(MetadadosFacturaPeriodo),
    FacturaGenerica(MetadadosFacturaPeriodo),
    NotaDebito(MetadadosNotaDebito),
    NotaCredito(MetadadosNotaCredito),
    Recibo(MetadadosRecibo),
    OutroDocumento(MetadadosComunsFactura),
}

impl SpecialistDocument for InvoiceDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosComerciais;

    fn tipo_documento(&self) -> &'static str {
        match self {
            InvoiceDocument::FacturaProForma(_) => "FACTURA_PRO_FORMA",
            InvoiceDocument::FacturaRecibo(_) => "FACTURA_RECIBO",
            InvoiceDocument::Factura(_) => "FACTURA",
            InvoiceDocument::FacturaGlobal(_) => "FACTURA_GLOBAL",
            InvoiceDocument::FacturaGenerica(_) => "FACTURA_GENERICA",
            InvoiceDocument::NotaDebito(_) => "NOTA_DEBITO",
            InvoiceDocument::NotaCredito(_) => "NOTA_CREDITO",
            InvoiceDocument::Recibo(_) => "RECIBO",
            InvoiceDocument::OutroDocumento(_) => "OUTRO_DOCUMENTO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SpecialistOutput;
    use serde_json::json;

    fn comuns() -> serde_json::Value {
        json!({
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
        })
    }

    #[test]
    fn invoice_record_parses() {
        let v = json!({
            "localizacao_ficheiro": "in/invoice_001.pdf",
            "grupo_documento": "DOCUMENTOS_COMERCIAIS",
            "numero_documento": "FT 2024/001",
            "data_emissao": "2024-03-01",
            "hora_emissao": "10:15",
            "notas_triagem": "Factura emitida a cliente.",
            "notas_classificacao": "Factura simples sem recibo.",
            "tipo_documento": "FACTURA",
            "metadados_documento": comuns()
        });
        let out: SpecialistOutput<InvoiceDocument> = serde_json::from_value(v).unwrap();
        assert_eq!(out.documento.tipo_documento(), "FACTURA");
        assert_eq!(out.hora_emissao.as_deref(), Some("10:15"));

        let back = serde_json::to_value(&out).unwrap();
        assert_eq!(back["metadados_documento"]["total"], 114000.0);
        assert_eq!(back["tipo_documento"], "FACTURA");
    }

    #[test]
    fn receipt_carries_settled_lines() {
        let mut meta = comuns();
        meta["detalhes"] = json!([
            {"documento": "FT 2024/001", "facturado": 114000.0, "pago": 114000.0},
            {"documento": "FT 2024/002", "facturado": 5000.0, "pago": 2500.0}
        ]);
        let v = json!({"tipo_documento": "RECIBO", "metadados_documento": meta});
        match serde_json::from_value::<InvoiceDocument>(v).unwrap() {
            InvoiceDocument::Recibo(m) => {
                assert_eq!(m.detalhes.len(), 2);
                assert_eq!(m.detalhes[1].pago, 2500.0);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn credit_note_requires_reason_and_origin() {
        let v = json!({"tipo_documento": "NOTA_CREDITO", "metadados_documento": comuns()});
        assert!(serde_json::from_value::<InvoiceDocument>(v).is_err());
    }
}
