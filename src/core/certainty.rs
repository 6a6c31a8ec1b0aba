//! # Certainty — Cálculo de Combinação de Evidências
//!
//! Funções numéricas puras do modelo de **Fator de Certeza** (MYCIN,
//! Shortliffe & Buchanan). Um fator de certeza (CF) é uma confiança com sinal
//! em `[-1, 1]`:
//!
//! | CF | Significado |
//! |----|-------------|
//! | `1.0` | certamente verdadeiro |
//! | `0.0` | nenhuma evidência |
//! | `-1.0` | certamente falso |
//!
//! ## Operações
//!
//! | Função | Uso | Fórmula |
//! |--------|-----|---------|
//! | [`premise`] | antecedentes compostos | `AND = min`, `OR = max` |
//! | [`scale`] | aplicação de regra | `premissa × cf_regra` |
//! | [`combine`] | evidências paralelas | Shortliffe–Buchanan, ver abaixo |
//!
//! ## Combinação Paralela
//!
//! ```text
//! a ≥ 0, b ≥ 0  →  a + b·(1 − a)
//! a < 0, b < 0  →  a + b·(1 + a)
//! sinais mistos →  (a + b) / (1 − min(|a|, |b|))
//! ```
//!
//! Duas regras independentes concluindo `M1 = 0.4` e `M1 = 0.5` se reforçam:
//! `combine(0.4, 0.5) = 0.4 + 0.5 × 0.6 = 0.7`.
//!
//! Todas as funções aqui são sem estado e não alocam.

use serde::{Deserialize, Serialize};

/// Limite inferior da escala de CF.
pub const CF_MIN: f64 = -1.0;

/// Limite superior da escala de CF.
pub const CF_MAX: f64 = 1.0;

/// Como os CFs dos antecedentes de uma regra composta viram um único CF de premissa.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Todos os antecedentes precisam valer; a premissa é o mais fraco.
    #[default]
    And,
    /// Um antecedente basta; a premissa é o mais forte.
    Or,
}

impl Operator {
    /// Lê a grafia do arquivo de regras (`"AND"` / `"OR"`, sem diferenciar maiúsculas).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            _ => None,
        }
    }

    /// Palavra-chave usada ao renderizar uma regra, ex: `G01 AND G02`.
    pub fn label(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

/// Retorna `true` quando `cf` é um número finito dentro de `[-1, 1]`.
///
/// Única verificação de faixa, compartilhada pelo carregador de regras e pela
/// entrada de fatos do usuário. Valores fora da escala são rejeitados, nunca
/// truncados.
pub fn is_valid(cf: f64) -> bool {
    cf.is_finite() && (CF_MIN..=CF_MAX).contains(&cf)
}

/// Reduz os CFs dos antecedentes ao CF de premissa da regra.
///
/// Retorna `None` para uma fatia vazia; toda regra tem ao menos um
/// antecedente, então entrada vazia é erro de quem chama.
///
/// # Exemplo
///
/// ```rust
/// assert_eq!(premise(Operator::And, &[0.9, 0.5]), Some(0.5));
/// assert_eq!(premise(Operator::Or, &[0.9, 0.5]), Some(0.9));
/// ```
pub fn premise(op: Operator, cfs: &[f64]) -> Option<f64> {
    let (first, rest) = cfs.split_first()?;
    let folded = rest.iter().fold(*first, |acc, &cf| match op {
        Operator::And => acc.min(cf),
        Operator::Or => acc.max(cf),
    });
    Some(folded)
}

/// Atenua a premissa pela certeza da própria regra.
pub fn scale(premise_cf: f64, rule_cf: f64) -> f64 {
    premise_cf * rule_cf
}

/// **Combinação paralela** de dois CFs independentes para o mesmo fato.
///
/// Comutativa dentro de cada ramo de sinal, e `combine(a, 0.0) == a`.
///
/// Com sinais diferentes e um operando exatamente `±1`, o denominador
/// `1 − min(|a|, |b|)` zera. Nesse caso a evidência certa domina: retorna o
/// operando de maior magnitude (o primeiro, num empate exato `1` vs `-1`).
///
/// O resultado é limitado a `[-1, 1]` apenas para absorver erro de ponto
/// flutuante; entradas válidas nunca saem da escala matematicamente.
pub fn combine(a: f64, b: f64) -> f64 {
    let merged = if a >= 0.0 && b >= 0.0 {
        a + b * (1.0 - a)
    } else if a < 0.0 && b < 0.0 {
        a + b * (1.0 + a)
    } else {
        let denominator = 1.0 - a.abs().min(b.abs());
        if denominator <= 0.0 {
            if b.abs() > a.abs() {
                b
            } else {
                a
            }
        } else {
            (a + b) / denominator
        }
    };
    merged.clamp(CF_MIN, CF_MAX)
}
