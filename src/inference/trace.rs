//! # Trace — Justificativa Passo a Passo de Uma Execução
//!
//! Uma [`TraceEntry`] é anexada a cada tentativa de avaliação de regra. A
//! sequência é a trilha de auditoria da execução: transformá-la em texto fica
//! a cargo de quem chama (a camada web gera linhas de log).

use serde::Serialize;

use crate::core::Operator;

/// Resultado da avaliação de uma regra candidata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Fired,
    /// Antecedentes necessários ausentes do snapshot da passada.
    Blocked,
}

/// Código antecedente com o CF de fato usado na premissa.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AntecedentValue {
    pub code: String,
    pub effective_cf: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceEntry {
    pub pass: u32,
    pub rule_id: String,
    pub rule_index: usize,
    pub operator: Operator,
    pub consequent: String,
    /// Antecedentes presentes no snapshot, na ordem declarada na regra.
    pub antecedents: Vec<AntecedentValue>,
    /// `None` quando bloqueada.
    pub premise_cf: Option<f64>,
    pub rule_cf: f64,
    /// `None` quando bloqueada.
    pub conclusion_cf: Option<f64>,
    pub outcome: Outcome,
    /// Antecedentes ausentes. Nunca vazio numa entrada bloqueada; uma regra
    /// `OR` pode disparar com códigos listados aqui.
    pub missing: Vec<String>,
}

/// Trace só de inserção, pertencente a uma única execução.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TraceRecorder {
    entries: Vec<TraceEntry>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn fired_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome == Outcome::Fired).count()
    }

    pub fn blocked_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome == Outcome::Blocked).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pass: u32, rule_id: &str, outcome: Outcome, missing: &[&str]) -> TraceEntry {
        let fired = outcome == Outcome::Fired;
        TraceEntry {
            pass,
            rule_id: rule_id.to_string(),
            rule_index: 0,
            operator: Operator::And,
            consequent: "M1".to_string(),
            antecedents: Vec::new(),
            premise_cf: fired.then_some(0.8),
            rule_cf: 0.5,
            conclusion_cf: fired.then_some(0.4),
            outcome,
            missing: missing.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_entries_keep_recording_order() {
        let mut trace = TraceRecorder::new();
        assert!(trace.is_empty());
        trace.record(entry(1, "R2", Outcome::Fired, &[]));
        trace.record(entry(1, "R1", Outcome::Blocked, &["G2"]));
        trace.record(entry(2, "R1", Outcome::Fired, &[]));

        let ids: Vec<(u32, &str)> = trace.entries().iter().map(|e| (e.pass, e.rule_id.as_str())).collect();
        assert_eq!(ids, vec![(1, "R2"), (1, "R1"), (2, "R1")]);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_counts_split_by_outcome() {
        let mut trace = TraceRecorder::new();
        trace.record(entry(1, "R1", Outcome::Fired, &[]));
        trace.record(entry(1, "R2", Outcome::Blocked, &["G3"]));
        trace.record(entry(1, "R3", Outcome::Blocked, &["G4", "G5"]));
        assert_eq!(trace.fired_count(), 1);
        assert_eq!(trace.blocked_count(), 2);
        assert_eq!(trace.fired_count() + trace.blocked_count(), trace.len());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut trace = TraceRecorder::new();
        trace.record(entry(1, "R1", Outcome::Blocked, &["G2"]));
        let json = serde_json::to_value(&trace).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["outcome"], "BLOCKED");
        assert_eq!(entries[0]["operator"], "AND");
        assert_eq!(entries[0]["missing"][0], "G2");
        assert!(entries[0]["conclusion_cf"].is_null());

        let entries = trace.into_entries();
        assert_eq!(entries[0].rule_id, "R1");
    }
}
