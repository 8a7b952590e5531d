//! Routing from a triage category to its specialist stage.
//!
//! The table is static data: a category maps to exactly one specialist
//! (its output schema and prompt) or to none, in which case the triage
//! record is the final result.

use crate::prompts;
use crate::schema::DocumentGroup;

/// Category-specific extraction stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specialist {
    Banking,
    Customs,
    Invoice,
    Taxes,
    Freight,
    Hr,
}

/// One routing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    pub group: DocumentGroup,
    pub specialist: Specialist,
    /// Name of the instruction in the [`crate::prompts::PromptSet`].
    pub prompt_name: &'static str,
}

/// Every category that has a specialist stage.
pub static DISPATCH_TABLE: [DispatchEntry; 6] = [
    DispatchEntry {
        group: DocumentGroup::DocumentosBancarios,
        specialist: Specialist::Banking,
        prompt_name: prompts::BANKING_PROMPT_NAME,
    },
    DispatchEntry {
        group: DocumentGroup::DocumentosAduaneiros,
        specialist: Specialist::Customs,
        prompt_name: prompts::CUSTOMS_PROMPT_NAME,
    },
    DispatchEntry {
        group: DocumentGroup::DocumentosComerciais,
        specialist: Specialist::Invoice,
        prompt_name: prompts::INVOICE_PROMPT_NAME,
    },
    DispatchEntry {
        group: DocumentGroup::DocumentosFiscais,
        specialist: Specialist::Taxes,
        prompt_name: prompts::TAXES_PROMPT_NAME,
    },
    DispatchEntry {
        group: DocumentGroup::DocumentosFrete,
        specialist: Specialist::Freight,
        prompt_name: prompts::FREIGHT_PROMPT_NAME,
    },
    DispatchEntry {
        group: DocumentGroup::DocumentosRh,
        specialist: Specialist::Hr,
        prompt_name: prompts::HR_PROMPT_NAME,
    },
];

/// Find the specialist for `group`. `None` means triage is final.
pub fn lookup(group: DocumentGroup) -> Option<&'static DispatchEntry> {
    let slot = match group {
        DocumentGroup::DocumentosBancarios => 0,
        DocumentGroup::DocumentosAduaneiros => 1,
        DocumentGroup::DocumentosComerciais => 2,
        DocumentGroup::DocumentosFiscais => 3,
        DocumentGroup::DocumentosFrete => 4,
        DocumentGroup::DocumentosRh => 5,
        DocumentGroup::OutrosDocumentos => return None,
    };
    Some(&DISPATCH_TABLE[slot])
}
