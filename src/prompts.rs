//! Stage instructions sent to the model.
//!
//! Every instruction has a stable name (`ocr_prompt`, `triage_prompt`,
//! `invoice_classifier_prompt`, …). The built-in text lives here; a
//! [`PromptSet`] can replace any of them with a `{name}.md` file from an
//! override directory so wording can be tuned without rebuilding.
//!
//! Instructions are written in European Portuguese, the language of the
//! documents and of the free-text notes the records carry.

use crate::error::ClassifyError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const OCR_PROMPT_NAME: &str = "ocr_prompt";
pub const TRIAGE_PROMPT_NAME: &str = "triage_prompt";
pub const BANKING_PROMPT_NAME: &str = "banking_classifier_prompt";
pub const CUSTOMS_PROMPT_NAME: &str = "customs_classifier_prompt";
pub const FREIGHT_PROMPT_NAME: &str = "freight_classifier_prompt";
pub const HR_PROMPT_NAME: &str = "hr_classifier_prompt";
pub const INVOICE_PROMPT_NAME: &str = "invoice_classifier_prompt";
pub const TAXES_PROMPT_NAME: &str = "taxes_classifier_prompt";

/// Transcription of a scanned document into Markdown.
pub const OCR_PROMPT: &str = r#"És um especialista em transcrição de documentos empresariais digitalizados.
Converte as imagens das páginas do documento em Markdown limpo e fiel ao original.

Regras:

1. TEXTO
   - Transcreve TODO o texto, pela ordem natural de leitura
   - Mantém números, datas, montantes, NIF, IBAN e referências exactamente como aparecem
   - Não traduzas nem resumas

2. ESTRUTURA
   - Usa # para o título do documento e ## para secções
   - Converte tabelas para o formato de tabela GFM (| coluna | coluna |)
   - Preserva listas e a sua hierarquia

3. O QUE IGNORAR
   - Números de página, carimbos decorativos e linhas sem conteúdo

4. FORMATO DE SAÍDA
   - Responde APENAS com o Markdown
   - NÃO envolvas a resposta em blocos ```markdown
   - NÃO acrescentes comentários"#;

/// Coarse category assignment.
pub const TRIAGE_PROMPT: &str = r#"És um analista de documentos empresariais angolanos.
Recebes a transcrição em Markdown de um documento e a sua localização original.
Atribui o documento a UM dos grupos seguintes:

- DOCUMENTOS_COMERCIAIS: facturas, facturas pró-forma, facturas-recibo, notas de débito e de crédito, recibos de fornecedores
- DOCUMENTOS_ADUANEIROS: documento único (DU/DUP), nota de valor, nota de liquidação aduaneira, recibos e notas de desalfandegamento
- DOCUMENTOS_FRETE: cartas de porte (AWB), conhecimentos de embarque (BL), certificados de embarque
- DOCUMENTOS_FISCAIS: notas de liquidação da AGT, guias de pagamento do INSS, recibos e comprovativos de pagamento de impostos
- DOCUMENTOS_BANCARIOS: extractos bancários, comprovativos de transferência (bancária, ATM, Multicaixa Express) e de pagamento
- DOCUMENTOS_RH: folhas de remuneração e outros documentos de recursos humanos
- OUTROS_DOCUMENTOS: qualquer documento que não se enquadre nos grupos anteriores

Extrai também:
- numero_documento: o código que identifica o documento de forma única
- data_emissao: data de emissão ou de referência no formato yyyy-MM-dd
- hora_emissao: hora de emissão no formato HH:mm, apenas se constar do documento
- notas_triagem: justificação breve da escolha do grupo, em português europeu

Copia a localização original do ficheiro para localizacao_ficheiro.
Se o documento for ilegível ou não for possível classificá-lo, responde com um objecto de erro
contendo localizacao_ficheiro e erro."#;

const SPECIALIST_PREAMBLE: &str = r#"És um especialista na classificação detalhada de documentos empresariais angolanos.
Recebes o resultado da triagem em JSON, incluindo o conteúdo do documento em Markdown (campo conteudo).

Tarefas:
1. Repete localizacao_ficheiro, grupo_documento, numero_documento, data_emissao, hora_emissao e notas_triagem tal como recebidos.
2. Escolhe o tipo_documento adequado de entre os tipos listados abaixo.
3. Preenche metadados_documento com os campos exigidos para esse tipo. Montantes são números sem separadores de milhares.
4. Escreve em notas_classificacao uma justificação detalhada da classificação, em português europeu.
5. Se não for possível classificar o documento, responde com um objecto de erro contendo localizacao_ficheiro e erro."#;

/// Banking specialist.
pub const BANKING_PROMPT: &str = r#"Grupo: DOCUMENTOS_BANCARIOS

Tipos de documento:
- EXTRACTO_BANCARIO: extracto de conta com saldos inicial e final e período de referência
- COMPROVATIVO_TRANSFERENCIA_BANCARIA: transferência entre contas com IBAN do beneficiário
- COMPROVATIVO_TRANSFERENCIA_ATM: transferência efectuada numa caixa automática
- COMPROVATIVO_TRANSFERENCIA_MULTICAIXA_EXPRESS: transferência pela aplicação Multicaixa Express
- COMPROVATIVO_PAGAMENTO: pagamento de serviços ou entidades por referência
- OUTRO_DOCUMENTO_BANCARIO: outro documento bancário (indica tipo_documento_especifico)"#;

/// Customs specialist.
pub const CUSTOMS_PROMPT: &str = r#"Grupo: DOCUMENTOS_ADUANEIROS

Tipos de documento:
- DOCUMENTO_UNICO_PROVISORIO: DUP, licenciamento provisório da importação
- DOCUMENTO_UNICO: DU, declaração aduaneira definitiva
- NOTA_VALOR: nota de valor aduaneiro (valor da factura, valor aduaneiro, frete externo)
- NOTA_LIQUIDACAO: liquidação dos direitos aduaneiros com RUPE e prazo de pagamento
- RECIBO: recibo do pagamento da liquidação
- NOTA_DESALFANDEGAMENTO: autorização de saída da mercadoria
- OUTRO_DOCUMENTO_ADUANEIRO: outro documento aduaneiro (indica tipo_documento_especifico)"#;

/// Freight specialist.
pub const FREIGHT_PROMPT: &str = r#"Grupo: DOCUMENTOS_FRETE

Tipos de documento:
- CARTA_DE_PORTE: transporte aéreo (AWB), com aeroportos, voo e número de volumes
- CONHECIMENTO_DE_EMBARQUE: transporte marítimo (BL), com navio, portos, contentor e selo
- CERTIFICADO_DE_EMBARQUE: certificado que associa o AWB/BL ao DUP
- OUTRO_DOCUMENTO_DE_FRETE: outro documento de frete"#;

/// HR specialist.
pub const HR_PROMPT: &str = r#"Grupo: DOCUMENTOS_RH

Tipos de documento:
- FOLHA_REMUNERACAO: folha de remuneração mensal
- FOLHA_REMUNERACAO_INSS: folha de remuneração submetida ao INSS (indica inscricao_inss)
- OUTRO_DOCUMENTO: outro documento de recursos humanos; metadados_documento pode ser null"#;

/// Commercial documents specialist.
pub const INVOICE_PROMPT: &str = r#"Grupo: DOCUMENTOS_COMERCIAIS

Tipos de documento:
- FACTURA_PRO_FORMA: orçamento ou pró-forma com data de validade
- FACTURA_RECIBO: factura paga no acto, que serve de recibo
- FACTURA: factura simples
- FACTURA_GLOBAL: factura que agrega um período de referência
- FACTURA_GENERICA: factura genérica referente a um período
- NOTA_DEBITO: nota de débito (indica a descricao)
- NOTA_CREDITO: nota de crédito (indica motivo e documento_origem)
- RECIBO: recibo com a lista de documentos liquidados em detalhes
- OUTRO_DOCUMENTO: outro documento comercial

Em observacoes usa uma string vazia quando não houver observações."#;

/// Tax specialist.
pub const TAXES_PROMPT: &str = r#"Grupo: DOCUMENTOS_FISCAIS

Tipos de documento:
- NOTA_LIQUIDACAO: nota de liquidação de imposto emitida pela AGT
- GUIA_PAGAMENTO_INSS: guia de pagamento de contribuições ao INSS
- RECIBO_PAGAMENTO: recibo de pagamento de imposto
- COMPROVATIVO_LIQUIDACAO: comprovativo de liquidação de imposto
- OUTRO_DOCUMENTO_FISCAL: outro documento fiscal

Valores válidos para imposto:
IMPOSTO_RENDIMENTO_TRABALHO_GRUPO_A, IMPOSTO_RENDIMENTO_TRABALHO_GRUPO_B,
IMPOSTO_INDUTRIAL, IMPOSTO_INDUSTRIAL_RETENCAO_FONTE,
IMPOSTO_VALOR_ACRESCENTADO, IMPOSTO_SELO"#;

/// Named stage instructions, built-ins plus optional file overrides.
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: HashMap<String, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let specialist = |body: &str| format!("{SPECIALIST_PREAMBLE}\n\n{body}");

        let prompts = [
            (OCR_PROMPT_NAME, OCR_PROMPT.to_string()),
            (TRIAGE_PROMPT_NAME, TRIAGE_PROMPT.to_string()),
            (BANKING_PROMPT_NAME, specialist(BANKING_PROMPT)),
            (CUSTOMS_PROMPT_NAME, specialist(CUSTOMS_PROMPT)),
            (FREIGHT_PROMPT_NAME, specialist(FREIGHT_PROMPT)),
            (HR_PROMPT_NAME, specialist(HR_PROMPT)),
            (INVOICE_PROMPT_NAME, specialist(INVOICE_PROMPT)),
            (TAXES_PROMPT_NAME, specialist(TAXES_PROMPT)),
        ]
        .into_iter()
        .map(|(name, text)| (name.to_string(), text))
        .collect();

        Self { prompts }
    }
}

impl PromptSet {
    /// Built-ins, with any `{name}.md` file in `dir` replacing the
    /// instruction of the same name. Unknown file names are ignored.
    pub fn with_overrides(dir: &Path) -> Result<Self, ClassifyError> {
        let mut set = Self::default();

        let entries = std::fs::read_dir(dir).map_err(|e| {
            ClassifyError::InvalidConfig(format!(
                "cannot read prompts directory '{}': {e}",
                dir.display()
            ))
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !set.prompts.contains_key(name) {
                debug!("Ignoring unknown prompt file {}", path.display());
                continue;
            }

            let text = std::fs::read_to_string(&path).map_err(|e| {
                ClassifyError::InvalidConfig(format!(
                    "cannot read prompt '{}': {e}",
                    path.display()
                ))
            })?;
            if text.trim().is_empty() {
                return Err(ClassifyError::InvalidConfig(format!(
                    "prompt override '{}' is empty",
                    path.display()
                )));
            }
            info!("Prompt '{}' overridden from {}", name, path.display());
            set.prompts.insert(name.to_string(), text);
        }

        Ok(set)
    }

    /// Instruction text for `name`.
    pub fn get(&self, name: &str) -> Result<&str, ClassifyError> {
        self.prompts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ClassifyError::Internal(format!("unknown prompt '{name}'")))
    }
}

/// User turn of the OCR stage.
pub fn ocr_user_message(location: &str) -> String {
    format!("Converte o documento em markdown.\nLocalização original do ficheiro: {location}")
}

/// User turn of the triage stage.
pub fn triage_user_message(location: &str, markdown: &str) -> String {
    format!(
        "Localização original do ficheiro: {location}\n\nConteúdo do documento em Markdown:\n{markdown}"
    )
}

/// User turn of a specialist stage.
pub fn specialist_user_message(triage_json: &str) -> String {
    format!(
        "Classifica este documento de acordo com o resultado da triagem.\n\nResultado da triagem em JSON:\n{triage_json}"
    )
}

/// System-prompt suffix pinning the reply to a JSON Schema.
pub fn json_schema_block(schema: &str) -> String {
    format!(
        "\n\nFORMATO DE RESPOSTA\nResponde APENAS com um objecto JSON válido que cumpra o seguinte JSON Schema, sem texto adicional nem blocos ```:\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DISPATCH_TABLE;

    #[test]
    fn every_dispatched_prompt_exists() {
        let set = PromptSet::default();
        for entry in DISPATCH_TABLE.iter() {
            let text = set.get(entry.prompt_name).unwrap();
            assert!(text.contains(entry.group.as_str()), "{}", entry.prompt_name);
        }
        assert!(set.get(OCR_PROMPT_NAME).is_ok());
        assert!(set.get(TRIAGE_PROMPT_NAME).is_ok());
    }

    #[test]
    fn triage_prompt_lists_every_group() {
        for group in crate::schema::DocumentGroup::ALL {
            assert!(TRIAGE_PROMPT.contains(group.as_str()), "missing {group}");
        }
    }

    #[test]
    fn unknown_prompt_is_internal_error() {
        let set = PromptSet::default();
        assert!(matches!(
            set.get("orchestration_prompt"),
            Err(ClassifyError::Internal(_))
        ));
    }

    #[test]
    fn overrides_replace_known_names_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("triage_prompt.md"), "Triagem personalizada").unwrap();
        std::fs::write(dir.path().join("something_else.md"), "ignored").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = PromptSet::with_overrides(dir.path()).unwrap();
        assert_eq!(set.get(TRIAGE_PROMPT_NAME).unwrap(), "Triagem personalizada");
        assert_eq!(set.get(OCR_PROMPT_NAME).unwrap(), OCR_PROMPT);
        assert!(set.get("something_else").is_err());
    }

    #[test]
    fn empty_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ocr_prompt.md"), "  \n").unwrap();
        assert!(matches!(
            PromptSet::with_overrides(dir.path()),
            Err(ClassifyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_override_dir_is_config_error() {
        let err = PromptSet::with_overrides(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidConfig(_)));
    }

    #[test]
    fn user_messages_carry_location() {
        assert!(ocr_user_message("in/a.pdf").ends_with("in/a.pdf"));
        let t = triage_user_message("in/a.pdf", "# Factura");
        assert!(t.starts_with("Localização original do ficheiro: in/a.pdf"));
        assert!(t.ends_with("# Factura"));
        assert!(specialist_user_message("{}").ends_with("{}"));
    }
}
