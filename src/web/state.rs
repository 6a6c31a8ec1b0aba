//! # Estado da Aplicação Web
//!
//! Compartilhado por todos os handlers via o extrator `State<AppState>` do axum.
//!
//! ```text
//! AppState
//!  ├── context:    RwLock<Arc<DiagnosisContext>>   trocado inteiro no reload
//!  │                 ├── engine: InferenceEngine
//!  │                 └── kb:     KnowledgeBase
//!  ├── classifier: regex ou prefixo de diagnóstico
//!  └── config:     AppConfig                       imutável após a partida
//! ```
//!
//! Motor e descrições vivem no mesmo [`DiagnosisContext`], atrás de uma única
//! trava: uma requisição nunca vê regras novas com descrições antigas. A
//! requisição clona o `Arc` e solta a trava antes de executar, então o reload
//! não espera diagnósticos em andamento e estes terminam com a base com que
//! começaram.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;

use crate::config::{AppConfig, SharedClassifier};
use crate::core::KnowledgeBase;
use crate::inference::InferenceEngine;
use crate::persistence;

/// Motor e descrições carregados juntos, do mesmo par de arquivos.
#[derive(Debug)]
pub struct DiagnosisContext {
    pub engine: InferenceEngine,
    pub kb: KnowledgeBase,
}

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    /// Motor + descrições, trocados atomicamente por `reload`.
    pub context: Arc<RwLock<Arc<DiagnosisContext>>>,
    /// Decide quais códigos derivados são diagnósticos finais.
    pub classifier: SharedClassifier,
    pub config: Arc<AppConfig>,
}

/// Contagens informadas após um reload.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReloadSummary {
    pub rules: usize,
    pub skipped: usize,
    pub labels: usize,
}

impl AppState {
    /// Falha apenas se `CF_DIAGNOSIS_PATTERN` não compilar.
    pub fn new(engine: InferenceEngine, kb: KnowledgeBase, config: AppConfig) -> Result<Self> {
        let classifier = config.diagnosis_classifier()?;
        Ok(Self {
            context: Arc::new(RwLock::new(Arc::new(DiagnosisContext { engine, kb }))),
            classifier,
            config: Arc::new(config),
        })
    }

    /// Carrega os dois arquivos da config e constrói o motor.
    pub fn load(config: AppConfig) -> Result<Self> {
        let context = load_context(&config)?;
        Self::new(context.engine, context.kb, config)
    }

    /// Contexto de uma requisição; a trava dura só o clone do `Arc`.
    pub fn current(&self) -> Arc<DiagnosisContext> {
        self.context.read().clone()
    }

    /// Relê base de regras e base de conhecimento e troca as duas de uma vez.
    ///
    /// Em caso de falha, o contexto atual permanece.
    pub fn reload(&self) -> Result<ReloadSummary> {
        let context = load_context(&self.config)?;
        let summary = ReloadSummary {
            rules: context.engine.rules().len(),
            skipped: context.engine.rules().defects().len(),
            labels: context.kb.len(),
        };
        *self.context.write() = Arc::new(context);
        tracing::info!(
            rules = summary.rules,
            skipped = summary.skipped,
            labels = summary.labels,
            "Base de regras recarregada"
        );
        Ok(summary)
    }
}

fn load_context(config: &AppConfig) -> Result<DiagnosisContext> {
    let rules = persistence::load_rule_base(&config.rules_path)?;
    for defect in rules.defects() {
        tracing::warn!(%defect, "Regra ignorada");
    }
    let engine = InferenceEngine::new(rules, config.engine.clone())
        .context("Failed to build inference engine")?;
    let kb = persistence::load_knowledge_base(&config.kb_path)?;
    Ok(DiagnosisContext { engine, kb })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn write_version(rules_path: &Path, kb_path: &Path, rule_count: usize) {
        let rules: Vec<String> = (1..=rule_count)
            .map(|i| format!(r#"{{"id": "R{i}", "if": ["G01"], "then": "M01", "cf": 0.5}}"#))
            .collect();
        std::fs::write(rules_path, format!("[{}]", rules.join(","))).unwrap();
        std::fs::write(kb_path, format!(r#"{{"G01": "Humor deprimido", "VERSION": "{rule_count}"}}"#)).unwrap();
    }

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            rules_path: dir.join("rules.json"),
            kb_path: dir.join("kb.json"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_reload_swaps_engine_and_keeps_old_arc_alive() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_version(&config.rules_path, &config.kb_path, 1);

        let state = AppState::load(config.clone()).unwrap();
        let before = state.current();
        assert_eq!(before.engine.rules().len(), 1);

        std::fs::write(
            &config.rules_path,
            r#"[
                {"id": "R1", "if": ["G01"], "then": "M01", "cf": 0.5},
                {"id": "R2", "if": ["G02"], "then": "M01", "cf": 0.7},
                {"id": "R3", "then": "M02", "cf": 0.7}
            ]"#,
        )
        .unwrap();
        let summary = state.reload().unwrap();
        assert_eq!(
            summary,
            ReloadSummary {
                rules: 2,
                skipped: 1,
                labels: 2
            }
        );
        assert_eq!(state.current().engine.rules().len(), 2);
        assert_eq!(before.engine.rules().len(), 1);
    }

    #[test]
    fn test_reload_replaces_rules_and_labels_together() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_version(&config.rules_path, &config.kb_path, 1);
        let state = AppState::load(config.clone()).unwrap();
        let before = state.current();

        write_version(&config.rules_path, &config.kb_path, 2);
        state.reload().unwrap();
        let after = state.current();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!((before.engine.rules().len(), before.kb.label("VERSION")), (1, "1"));
        assert_eq!((after.engine.rules().len(), after.kb.label("VERSION")), (2, "2"));
    }

    /// Leitores concorrentes nunca observam regras de uma versão com descrições de outra.
    #[test]
    fn test_readers_never_see_mixed_versions_during_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_version(&config.rules_path, &config.kb_path, 1);
        let state = AppState::load(config.clone()).unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let mut observed = 0;
                        loop {
                            let context = state.current();
                            let version = context.engine.rules().len().to_string();
                            assert_eq!(context.kb.label("VERSION"), version);
                            observed += 1;
                            if done.load(Ordering::Acquire) {
                                break observed;
                            }
                        }
                    })
                })
                .collect();

            for round in 0..40 {
                write_version(&config.rules_path, &config.kb_path, 1 + round % 3);
                state.reload().unwrap();
            }
            done.store(true, Ordering::Release);

            for reader in readers {
                assert!(reader.join().unwrap() > 0);
            }
        });
    }

    #[test]
    fn test_failed_reload_keeps_current_engine() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_version(&config.rules_path, &config.kb_path, 1);
        let state = AppState::load(config.clone()).unwrap();

        std::fs::write(&config.rules_path, "not json").unwrap();
        assert!(state.reload().is_err());
        assert_eq!(state.current().engine.rules().len(), 1);
        assert_eq!(state.current().kb.label("VERSION"), "1");
    }

    #[test]
    fn test_invalid_pattern_is_rejected_on_construction() {
        let config = AppConfig {
            diagnosis_pattern: Some("M(".to_string()),
            ..AppConfig::default()
        };
        let result = AppState::new(
            InferenceEngine::with_defaults(Default::default()),
            KnowledgeBase::new(),
            config,
        );
        assert!(result.is_err());
    }
}
