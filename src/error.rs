//! Tipos de erro do motor de diagnóstico.
//!
//! O núcleo distingue três famílias de falha:
//!
//! - [`RuleDefect`]: registro de regra malformado. Nunca é fatal: o registro
//!   é descartado na construção da base e o defeito fica guardado para quem
//!   quiser exibi-lo.
//! - [`InputError`]: fatos do usuário inválidos, rejeitados antes da execução.
//! - [`EngineError`]: uma [`EngineConfig`](crate::inference::EngineConfig) inutilizável.
//!
//! Não convergir *não* é erro; ver
//! [`InferenceReport::converged`](crate::inference::InferenceReport).

use serde::Serialize;
use thiserror::Error;

/// Registro de regra ignorado na construção de uma [`RuleBase`](crate::core::RuleBase).
#[derive(Clone, Debug, PartialEq, Serialize, Error)]
#[error("rule '{rule_id}' at position {position} skipped: {reason}")]
pub struct RuleDefect {
    /// Posição (a partir de zero) do registro na sequência de origem.
    pub position: usize,
    /// Identificador declarado, ou `#<posição>` quando não havia.
    pub rule_id: String,
    /// O que havia de errado com o registro.
    pub reason: DefectReason,
}

/// Motivo da rejeição de um registro de regra.
#[derive(Clone, Debug, PartialEq, Serialize, Error)]
pub enum DefectReason {
    #[error("missing or empty 'if' antecedent list")]
    MissingAntecedents,

    #[error("antecedent at index {index} is empty or not a string")]
    InvalidAntecedent { index: usize },

    #[error("missing or empty 'then' consequent")]
    MissingConsequent,

    #[error("missing or non-numeric 'cf'")]
    MissingCertainty,

    #[error("rule cf {value} is out of range [-1.0, 1.0]")]
    CertaintyOutOfRange { value: f64 },

    #[error("unknown operator '{operator}' (expected AND or OR)")]
    UnknownOperator { operator: String },

    #[error("record is not a JSON object")]
    NotAnObject,
}

/// Entrada inválida do usuário detectada na fronteira do motor.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InputError {
    #[error("fact '{code}' has certainty {cf}, outside [-1.0, 1.0]")]
    OutOfRange { code: String, cf: f64 },

    #[error("fact code cannot be empty")]
    EmptyCode,
}

impl InputError {
    /// Código de fato que causou a rejeição, se houver.
    pub fn code(&self) -> Option<&str> {
        match self {
            InputError::OutOfRange { code, .. } => Some(code),
            InputError::EmptyCode => None,
        }
    }
}

/// Configuração do motor inválida.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },
}
