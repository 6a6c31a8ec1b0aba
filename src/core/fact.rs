//! Fatos mantidos na memória de trabalho.

use std::fmt;

use serde::{Deserialize, Serialize};

/// De onde veio o valor atual de um fato.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FactSource {
    /// Informado pelo usuário antes da execução.
    User,
    /// Concluído por ao menos uma regra durante a execução.
    Derived,
}

/// Uma observação ou conclusão ponderada.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub code: String,
    /// Fator de certeza em `[-1, 1]`.
    pub cf: f64,
    pub source: FactSource,
    /// Passada em que o valor foi definido pela última vez (0 para fatos do usuário).
    pub generation: u32,
}

impl Fact {
    pub fn user(code: impl Into<String>, cf: f64) -> Self {
        Self {
            code: code.into(),
            cf,
            source: FactSource::User,
            generation: 0,
        }
    }

    /// Conclusão de regra produzida na passada `pass`.
    pub fn derived(code: impl Into<String>, cf: f64, pass: u32) -> Self {
        Self {
            code: code.into(),
            cf,
            source: FactSource::Derived,
            generation: pass,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.source == FactSource::Derived
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (CF = {:.3})", self.code, self.cf)
    }
}
