//! # Configuração — Ajustes via Variáveis de Ambiente
//!
//! Todo ajuste tem um padrão, então `cargo run` funciona direto com os
//! arquivos de exemplo em `data/`. Sobrescritas vêm do ambiente:
//!
//! | Variável | Padrão | Significado |
//! |----------|--------|-------------|
//! | `CF_RULES_PATH` | `data/rules.json` | arquivo da base de regras |
//! | `CF_KB_PATH` | `data/knowledge_base.json` | arquivo código → descrição |
//! | `CF_BIND_ADDR` | `0.0.0.0:3000` | endereço HTTP |
//! | `CF_SYMPTOM_PREFIX` | `G` | códigos listados no formulário de sintomas |
//! | `CF_DIAGNOSIS_PREFIX` | `M` | códigos ranqueados como diagnóstico final |
//! | `CF_DIAGNOSIS_PATTERN` | (nenhum) | regex de diagnóstico; substitui o prefixo |
//! | `CF_MAX_PASSES` | `100` | limite de passadas do laço de ponto fixo |
//! | `CF_DISCOUNT_MODE` | `false` | desconta evidência derivada pelo CF do usuário |
//!
//! A verbosidade dos logs é controlada à parte, via `RUST_LOG`.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::inference::{DiagnosisClassifier, EngineConfig, PatternClassifier, PrefixClassifier};

/// Classificador compartilhado entre requisições.
pub type SharedClassifier = Arc<dyn DiagnosisClassifier + Send + Sync>;

/// Ajustes da aplicação inteira.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub rules_path: PathBuf,
    pub kb_path: PathBuf,
    pub bind_addr: String,
    pub symptom_prefix: String,
    pub diagnosis_prefix: String,
    /// Quando presente, decide o que é diagnóstico no lugar de `diagnosis_prefix`.
    pub diagnosis_pattern: Option<String>,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("data/rules.json"),
            kb_path: PathBuf::from("data/knowledge_base.json"),
            bind_addr: "0.0.0.0:3000".to_string(),
            symptom_prefix: "G".to_string(),
            diagnosis_prefix: "M".to_string(),
            diagnosis_pattern: None,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Monta a config a partir de qualquer fonte de variáveis (o ambiente em
    /// produção, um mapa nos testes).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let engine = EngineConfig {
            max_passes: parse_or(get("CF_MAX_PASSES"), "CF_MAX_PASSES", defaults.engine.max_passes)?,
            discount_derived_by_user: match get("CF_DISCOUNT_MODE") {
                Some(raw) => parse_flag(&raw).with_context(|| {
                    format!("CF_DISCOUNT_MODE must be a boolean, got '{raw}'")
                })?,
                None => defaults.engine.discount_derived_by_user,
            },
            ..defaults.engine
        };
        engine
            .validate()
            .context("Invalid engine settings in environment")?;

        let config = Self {
            rules_path: get("CF_RULES_PATH").map_or(defaults.rules_path, PathBuf::from),
            kb_path: get("CF_KB_PATH").map_or(defaults.kb_path, PathBuf::from),
            bind_addr: get("CF_BIND_ADDR").unwrap_or(defaults.bind_addr),
            symptom_prefix: get("CF_SYMPTOM_PREFIX").unwrap_or(defaults.symptom_prefix),
            diagnosis_prefix: get("CF_DIAGNOSIS_PREFIX").unwrap_or(defaults.diagnosis_prefix),
            diagnosis_pattern: get("CF_DIAGNOSIS_PATTERN"),
            engine,
        };
        // regex inválida falha na partida, não na primeira requisição
        config.diagnosis_classifier()?;
        Ok(config)
    }

    /// Classificador de diagnósticos: regex se configurada, senão prefixo.
    pub fn diagnosis_classifier(&self) -> Result<SharedClassifier> {
        let classifier: SharedClassifier = match &self.diagnosis_pattern {
            Some(pattern) => Arc::new(
                PatternClassifier::new(pattern)
                    .with_context(|| format!("CF_DIAGNOSIS_PATTERN is not a valid regex: '{pattern}'"))?,
            ),
            None => Arc::new(PrefixClassifier::new(self.diagnosis_prefix.clone())),
        };
        Ok(classifier)
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
