//! # Inference Module — Motor de Encadeamento Progressivo
//!
//! Deriva conclusões ponderadas a partir de observações ponderadas, aplicando
//! a base de regras até atingir um ponto fixo.
//!
//! | Componente | Papel |
//! |------------|-------|
//! | [`RuleIndex`] | código antecedente → regras que o referenciam |
//! | [`InferenceEngine`] | laço de ponto fixo em passadas snapshot-then-merge |
//! | [`TraceRecorder`] | uma [`TraceEntry`] por avaliação de regra |
//! | [`ResultProjector`] | diagnósticos ranqueados e achados derivados |
//!
//! ## Exemplo
//!
//! ```rust
//! let engine = InferenceEngine::with_defaults(rule_base);
//! let report = engine.run(&user_facts)?;
//! let ranked = report.project(&PrefixClassifier::new("M"));
//! ```

pub mod engine;
pub mod index;
pub mod projector;
pub mod trace;

pub use engine::{
    EngineConfig, InferenceEngine, InferenceReport, InferenceRun, RunId, RunState, UserFacts,
    DEFAULT_MAX_PASSES,
};
pub use index::RuleIndex;
pub use projector::{
    DiagnosisClassifier, PatternClassifier, PrefixClassifier, Projection, ResultProjector,
    ScoredFact,
};
pub use trace::{AntecedentValue, Outcome, TraceEntry, TraceRecorder};
