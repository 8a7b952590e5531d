//! Human-resources documents: payroll sheets.

use super::{DocumentGroup, SpecialistDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosFolhaRemuneracao {
    /// Reference month (yyyy-MM).
    pub mes_referencia: String,
    pub nome_contribuinte: String,
    pub nif_contribuinte: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadadosFolhaRemuneracaoInss {
    #[serde(flatten)]
    pub folha: MetadadosFolhaRemuneracao,
    /// Social-security registration number.
    pub inscricao_inss: String,
}

/// Closed set of HR document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "tipo_documento",
    content = "metadados_documento",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum HrDocument {
    FolhaRemuneracao(MetadadosFolhaRemuneracao),
    FolhaRemuneracaoInss(MetadadosFolhaRemuneracaoInss),
    /// Any other HR document; metadata is optional.
    OutroDocumento(Option<MetadadosFolhaRemuneracao>),
}

impl SpecialistDocument for HrDocument {
    const GROUP: DocumentGroup = DocumentGroup::DocumentosRh;

    fn tipo_documento(&self) -> &'static str {
        match self {
            HrDocument::FolhaRemuneracao(_) => "FOLHA_REMUNERACAO",
            HrDocument::FolhaRemuneracaoInss(_) => "FOLHA_REMUNERACAO_INSS",
            HrDocument::OutroDocumento(_) => "OUTRO_DOCUMENTO",
        }
    }
}
