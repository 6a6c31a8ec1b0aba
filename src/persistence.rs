//! # Persistência — Carregando Regras e Descrições do Disco
//!
//! Dois arquivos JSON alimentam a aplicação:
//!
//! | Arquivo | Formato | Carregado em |
//! |---------|---------|--------------|
//! | `rules.json` | array de registros de regra | [`RuleBase`] |
//! | `knowledge_base.json` | objeto `código → descrição` | [`KnowledgeBase`] |
//!
//! ## Tolerância
//!
//! - Arquivo **ausente** gera log em nível `error` e é tratado como vazio, de
//!   modo que o servidor ainda sobe (com um formulário vazio).
//! - Arquivo existente mas com **JSON inválido** é erro.
//! - Dentro de `rules.json`, cada registro é validado isoladamente; os
//!   malformados são pulados com aviso (ver [`RuleBase::from_values`]).
//!
//! Nada é gravado de volta: o motor não persiste estado.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::{KnowledgeBase, RuleBase};

/// Carrega e valida o arquivo de regras.
///
/// # Errors
///
/// Falha se o arquivo existe mas não pode ser lido, não é JSON ou não tem um
/// array no nível superior.
pub fn load_rule_base(path: &Path) -> Result<RuleBase> {
    if !path.exists() {
        tracing::error!(path = %path.display(), "Arquivo de regras não encontrado, iniciando com base vazia");
        return Ok(RuleBase::default());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let Value::Array(records) = value else {
        anyhow::bail!("{} must contain a JSON array of rules", path.display());
    };

    let rules = RuleBase::from_values(&records);
    tracing::info!(
        path = %path.display(),
        rules = rules.len(),
        skipped = rules.defects().len(),
        "Base de regras carregada"
    );
    Ok(rules)
}

/// Carrega o mapa código → descrição.
///
/// # Errors
///
/// Falha se o arquivo existe mas é ilegível ou não é um objeto JSON de strings.
pub fn load_knowledge_base(path: &Path) -> Result<KnowledgeBase> {
    if !path.exists() {
        tracing::error!(path = %path.display(), "Arquivo da base de conhecimento não encontrado, iniciando vazia");
        return Ok(KnowledgeBase::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let kb: KnowledgeBase = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = kb.len(), "Base de conhecimento carregada");
    Ok(kb)
}
