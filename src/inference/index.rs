//! # RuleIndex — Ativação de Regras Guiada por Dependência
//!
//! Mapeia cada código antecedente para as regras que o mencionam, de modo que
//! uma passada só avalia regras cujas entradas mudaram na passada anterior:
//!
//! ```text
//! R0: IF (G1 AND G2) THEN M1        G1 → {0}
//! R1: IF (G2)        THEN M2   ⇒    G2 → {0, 1}
//! R2: IF (M1 OR M2)  THEN M3        M1 → {2}
//!                                   M2 → {2}
//! ```
//!
//! `candidate_rules({G2, M2})` retorna `[0, 1, 2]`, sempre crescente e sem
//! repetição, seja qual for a ordem dos códigos alterados.

use std::collections::{BTreeSet, HashMap};

use crate::core::RuleBase;

/// Código antecedente → conjunto ordenado de índices de regra. Só leitura depois de construído.
#[derive(Clone, Debug, Default)]
pub struct RuleIndex {
    by_antecedent: HashMap<String, BTreeSet<usize>>,
}

impl RuleIndex {
    /// Constrói o índice numa única varredura da base de regras.
    pub fn build(rules: &RuleBase) -> Self {
        let mut by_antecedent: HashMap<String, BTreeSet<usize>> = HashMap::new();
        for (index, rule) in rules.rules().iter().enumerate() {
            for code in &rule.antecedents {
                by_antecedent.entry(code.clone()).or_default().insert(index);
            }
        }
        tracing::debug!(codes = by_antecedent.len(), rules = rules.len(), "Índice de regras construído");
        Self { by_antecedent }
    }

    /// Regras cujos antecedentes intersectam `changed`, crescentes e únicas.
    pub fn candidate_rules<'a, I>(&self, changed: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut candidates = BTreeSet::new();
        for code in changed {
            if let Some(rules) = self.by_antecedent.get(code) {
                candidates.extend(rules.iter().copied());
            }
        }
        candidates.into_iter().collect()
    }

    /// Quantidade de códigos antecedentes distintos.
    pub fn code_count(&self) -> usize {
        self.by_antecedent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Operator, Rule};

    fn rule(id: &str, antecedents: &[&str], consequent: &str) -> Rule {
        Rule {
            id: id.to_string(),
            antecedents: antecedents.iter().map(|s| s.to_string()).collect(),
            consequent: consequent.to_string(),
            operator: Operator::And,
            rule_cf: 1.0,
        }
    }

    fn sample() -> RuleIndex {
        RuleIndex::build(&RuleBase::new(vec![
            rule("R0", &["G1", "G2"], "M1"),
            rule("R1", &["G2"], "M2"),
            rule("R2", &["M1", "M2"], "M3"),
        ]))
    }

    #[test]
    fn test_candidates_sorted_and_unique() {
        let index = sample();
        let changed = vec!["M2".to_string(), "G2".to_string(), "G1".to_string()];
        assert_eq!(index.candidate_rules(&changed), vec![0, 1, 2]);
    }

    #[test]
    fn test_candidates_independent_of_input_order() {
        let index = sample();
        let a = vec!["M1".to_string(), "G1".to_string()];
        let b = vec!["G1".to_string(), "M1".to_string()];
        assert_eq!(index.candidate_rules(&a), index.candidate_rules(&b));
        assert_eq!(index.candidate_rules(&a), vec![0, 2]);
    }

    #[test]
    fn test_unknown_codes_yield_nothing() {
        let index = sample();
        let changed = vec!["X9".to_string()];
        assert!(index.candidate_rules(&changed).is_empty());
        assert_eq!(index.code_count(), 4);
    }
}
