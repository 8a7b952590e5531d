//! Freight documents: air waybills, bills of lading, shipment certificates.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosComunsFrete {
    /// Carrier or forwarder.
    pub fornecedor: String,
    pub nome_consignatario: String,
    pub nif_consignatario: String,
    #[serde(default)]
    pub observacoes: Option<String>,
}

/// Air waybill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosCartaDePorte {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFrete,
    pub aeroporto_origem: String,
    pub aeroporto_destino: String,
    pub numero_voo: String,
    pub nome_companhia_aerea: String,
    pub peso_bruto: f64,
    pub numero_volumes: i64,
    pub numero_viagem: String,
}

/// Bill of lading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosConhecimentoDeEmbarque {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFrete,
    pub nome_navio: String,
    pub porto_origem: String,
    pub porto_destino: String,
    pub numero_contentor: String,
    pub numero_selo: String,
    pub peso_liquido: f64,
    pub peso_bruto: f64,
    /// Volume in cubic metres.
    pub cubagem: f64,
    pub numero_viagem: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosCertificadoDeEmbarque {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFrete,
    /// AWB or BL number the certificate refers to.
    pub awb_bl: String,
    /// Single customs document number.
    pub dup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosOutroDocumentoDeFrete {
    #[serde(flatten)]
    pub comuns: MetadadosComunsFrete,
    #[serde(default)]
    pub tipo_documento_especifico: Option<String>,
}

/// Closed set of freight document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum FreightDocument {
    CartaDePorte(MetadadosCartaDePorte),
    ConhecimentoDeEmbarque(MetadadosConhecimentoDeEmbarque),
    CertificadoDeEmbarque(MetadadosCertificadoDeEmbarque),
    OutroDocumentoDeFrete(MetadadosOutroDocumentoDeFrete),
}

impl SpecialistDocument for FreightDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosFrete;

    fn tipo_documento(&self) -> &'static str {
        match self {
            FreightDocument::CartaDePorte(_) => "CARTA_DE_PORTE",
            FreightDocument::ConhecimentoDeEmbarque(_) => "CONHECIMENTO_DE_EMBARQUE",
            FreightDocument::CertificadoDeEmbarque(_) => "CERTIFICADO_DE_EMBARQUE",
            FreightDocument::OutroDocumentoDeFrete(_) => "OUTRO_DOCUMENTO_DE_FRETE",
        }
    }
}
