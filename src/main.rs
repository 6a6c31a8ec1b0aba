#![allow(dead_code, unused_imports)]
#![allow(rustdoc::broken_intra_doc_links)]
//! # CF Diagnosis — Sistema Especialista com Fatores de Certeza
//!
//! **Ponto de entrada** do servidor de diagnóstico de transtornos mentais.
//!
//! O usuário informa o quanto tem certeza de cada sintoma observado; o motor
//! de encadeamento progressivo aplica a base de regras ponderadas até nenhum
//! fato mudar, e o servidor apresenta os diagnósticos ranqueados junto com o
//! log passo a passo de cada regra tentada.
//!
//! ## Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing (RUST_LOG, padrão info)
//!   ├── Lê AppConfig do ambiente
//!   ├── Carrega data/rules.json → RuleBase (regras malformadas ignoradas)
//!   ├── Carrega data/knowledge_base.json → descrições
//!   ├── Constrói o InferenceEngine (índice construído uma vez)
//!   └── Serve o router axum
//! ```
//!
//! ## Uso
//!
//! ```bash
//! cargo run
//! RUST_LOG=debug CF_DISCOUNT_MODE=true cargo run
//! CF_DIAGNOSIS_PATTERN='^(M|K03)' cargo run
//!
//! # humor deprimido + perda de interesse + insônia
//! curl -X POST localhost:3000/api/diagnose \
//!      -H 'content-type: application/json' \
//!      -d '{"facts": {"G01": 0.8, "G02": 0.7, "G03": 0.6}}'
//!
//! curl -X POST localhost:3000/api/diagnose/batch \
//!      -H 'content-type: application/json' \
//!      -d '{"requests": [{"facts": {"G05": 0.8, "G06": 0.7}}, {"facts": {"G08": 1.0, "G09": 0.8}}]}'
//! ```

/// `config`: ajustes vindos do ambiente.
mod config;

/// `core`: cálculo de CF, regras, fatos, memória de trabalho, descrições.
mod core;

/// `error`: defeitos de regra, erros de entrada e do motor.
mod error;

/// `inference`: índice de regras, motor de ponto fixo, trace, projeção do resultado.
mod inference;

/// `persistence`: carga da base de regras e das descrições em JSON.
mod persistence;

/// `web`: servidor axum, handlers e templates Maud.
mod web;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=debug cargo run
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🧠 CF Diagnosis — Starting...");

    let config = AppConfig::from_env()?;
    tracing::info!(
        rules = %config.rules_path.display(),
        kb = %config.kb_path.display(),
        max_passes = config.engine.max_passes,
        discount_mode = config.engine.discount_derived_by_user,
        diagnosis_pattern = config.diagnosis_pattern.as_deref().unwrap_or("-"),
        "Configuração carregada"
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::load(config)?;
    {
        let context = state.current();
        if context.engine.rules().is_empty() {
            tracing::warn!("Nenhuma regra carregada; todo diagnóstico sairá vazio");
        }
        tracing::info!(
            rules = context.engine.rules().len(),
            indexed_codes = context.engine.index().code_count(),
            labels = context.kb.len(),
            "Motor pronto"
        );
    }

    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("🚀 Server running at http://{bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
