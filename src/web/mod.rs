//! # Web Module — Páginas de Diagnóstico e API JSON
//!
//! Construído com **Axum** + **Maud**, servido por um único router.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Axum Router (este módulo)                                    │
//! │  ├── GET  /                    → formulário de sintomas      │
//! │  ├── POST /diagnose            → página de resultado         │
//! │  ├── POST /api/diagnose        → relatório JSON              │
//! │  ├── POST /api/diagnose/batch  → relatórios JSON em lote     │
//! │  ├── GET  /status              → JSON: regras, descrições    │
//! │  └── POST /rules/reload        → JSON: resumo do reload      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Static Assets (tower_http::ServeDir → /assets/)              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | estado compartilhado (`AppState`) e reload do motor |
//! | [`handlers`] | um handler axum por rota |
//! | [`templates`] | páginas Maud e renderização do trace |

pub mod handlers;
pub mod state;
pub mod templates;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use state::AppState;

/// Monta o router com todas as rotas da aplicação.
///
/// Os endpoints JSON aceitam chamadas cross-origin, para que outras
/// ferramentas enviem observações diretamente.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Páginas HTML ──────────────────────────────────────
        .route("/", get(handlers::index))
        .route("/diagnose", post(handlers::diagnose))
        // ── JSON API ──────────────────────────────────────────
        .route("/api/diagnose", post(handlers::api_diagnose))
        .route("/api/diagnose/batch", post(handlers::api_diagnose_batch))
        .route("/status", get(handlers::status))
        .route("/rules/reload", post(handlers::reload_rules))
        // ── Arquivos estáticos ────────────────────────────────
        .nest_service("/assets", ServeDir::new("assets"))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
