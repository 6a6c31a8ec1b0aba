//! # ResultProjector — Ranqueamento das Conclusões
//!
//! Transforma a [`WorkingMemory`] final nas duas listas ranqueadas que são
//! exibidas:
//!
//! | Lista | Conteúdo |
//! |-------|----------|
//! | `diagnoses` | fatos derivados que o classificador marca como diagnóstico final |
//! | `all_derived` | todo fato derivado (diagnósticos e achados intermediários) |
//!
//! Ambas em CF decrescente, com empate resolvido pelo código crescente.
//!
//! O que conta como diagnóstico é convenção de nomes de quem escreve as
//! regras, por isso é injetado via [`DiagnosisClassifier`]: um prefixo
//! ([`PrefixClassifier`]), uma expressão regular ([`PatternClassifier`]) ou
//! qualquer `Fn(&str) -> bool`.

use std::cmp::Ordering;

use regex::Regex;
use serde::Serialize;

use crate::core::WorkingMemory;

/// Decide se um código derivado é diagnóstico final.
pub trait DiagnosisClassifier {
    fn is_terminal_diagnosis(&self, code: &str) -> bool;
}

impl<F> DiagnosisClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn is_terminal_diagnosis(&self, code: &str) -> bool {
        self(code)
    }
}

/// Códigos que começam com um prefixo fixo, ex: `"M"` para `M01`, `M02`...
#[derive(Clone, Debug)]
pub struct PrefixClassifier {
    prefix: String,
}

impl PrefixClassifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl DiagnosisClassifier for PrefixClassifier {
    fn is_terminal_diagnosis(&self, code: &str) -> bool {
        code.starts_with(&self.prefix)
    }
}

/// Códigos que casam com uma expressão regular (`CF_DIAGNOSIS_PATTERN`).
#[derive(Clone, Debug)]
pub struct PatternClassifier {
    pattern: Regex,
}

impl PatternClassifier {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl DiagnosisClassifier for PatternClassifier {
    fn is_terminal_diagnosis(&self, code: &str) -> bool {
        self.pattern.is_match(code)
    }
}

/// Par `{code, cf}` do contrato de saída.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredFact {
    pub code: String,
    pub cf: f64,
}

/// As duas listas ranqueadas extraídas da memória final.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Projection {
    pub diagnoses: Vec<ScoredFact>,
    pub all_derived: Vec<ScoredFact>,
}

impl Projection {
    /// Diagnóstico mais bem ranqueado, se houver.
    pub fn top_diagnosis(&self) -> Option<&ScoredFact> {
        self.diagnoses.first()
    }
}

pub struct ResultProjector;

impl ResultProjector {
    pub fn project(memory: &WorkingMemory, classifier: &dyn DiagnosisClassifier) -> Projection {
        let mut all_derived: Vec<ScoredFact> = memory
            .derived()
            .map(|fact| ScoredFact {
                code: fact.code.clone(),
                cf: fact.cf,
            })
            .collect();
        all_derived.sort_by(rank);

        let diagnoses = all_derived
            .iter()
            .filter(|f| classifier.is_terminal_diagnosis(&f.code))
            .cloned()
            .collect();

        Projection { diagnoses, all_derived }
    }
}

fn rank(a: &ScoredFact, b: &ScoredFact) -> Ordering {
    b.cf.partial_cmp(&a.cf)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.code.cmp(&b.code))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::core::{Fact, DEFAULT_EPSILON};

    fn memory() -> WorkingMemory {
        let users = BTreeMap::from([("G1".to_string(), 0.9)]);
        let mut memory = WorkingMemory::seeded(users.iter(), DEFAULT_EPSILON);
        memory.apply_updates(BTreeMap::from([
            ("M2".to_string(), Fact::derived("M2", 0.5, 1)),
            ("K1".to_string(), Fact::derived("K1", 0.8, 1)),
            ("M1".to_string(), Fact::derived("M1", 0.5, 1)),
            ("M3".to_string(), Fact::derived("M3", 0.7, 2)),
        ]));
        memory
    }

    fn codes(list: &[ScoredFact]) -> Vec<&str> {
        list.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn test_sorted_desc_with_code_tiebreak() {
        let projection = ResultProjector::project(&memory(), &PrefixClassifier::new("M"));
        assert_eq!(codes(&projection.all_derived), vec!["K1", "M3", "M1", "M2"]);
        assert_eq!(codes(&projection.diagnoses), vec!["M3", "M1", "M2"]);
        assert_eq!(projection.top_diagnosis().map(|f| f.code.as_str()), Some("M3"));
    }

    #[test]
    fn test_user_facts_are_not_projected() {
        let projection = ResultProjector::project(&memory(), &PrefixClassifier::new("G"));
        assert!(projection.diagnoses.is_empty());
        assert!(!codes(&projection.all_derived).contains(&"G1"));
    }

    #[test]
    fn test_closure_and_pattern_classifiers() {
        let by_closure = ResultProjector::project(&memory(), &|code: &str| code == "K1");
        assert_eq!(codes(&by_closure.diagnoses), vec!["K1"]);

        let pattern = PatternClassifier::new(r"^M[12]$").unwrap();
        let by_pattern = ResultProjector::project(&memory(), &pattern);
        assert_eq!(codes(&by_pattern.diagnoses), vec!["M1", "M2"]);
    }

    #[test]
    fn test_empty_memory_projects_nothing() {
        let projection = ResultProjector::project(&WorkingMemory::default(), &PrefixClassifier::new("M"));
        assert_eq!(projection, Projection::default());
    }
}
