//! # InferenceEngine — Encadeamento Progressivo com Fatores de Certeza
//!
//! Conduz o laço de ponto fixo: a partir das observações ponderadas do
//! usuário, as regras são aplicadas passada após passada até nenhum fato
//! mudar.
//!
//! ## Algoritmo
//!
//! ```text
//! memory  = fatos do usuário (USER, geração 0)
//! changed = códigos dos fatos do usuário
//!
//! loop:
//!   changed empty                 → CONVERGED
//!   candidates = index(changed)
//!   candidates empty              → CONVERGED
//!   pass == max_passes            → NOT CONVERGED
//!   pass += 1
//!   snapshot = memory.snapshot()
//!   for rule in candidates (índice crescente):
//!     antecedentes ausentes       → trace BLOCKED
//!     else premise = min|max(effective cfs)
//!          conclusion = premise × rule_cf
//!          trace FIRED, stage (consequent, conclusion)
//!   changed = memory.apply_updates(fold(staged))
//! ```
//!
//! Uma passada sem regra candidata não é contada, então a cadeia de dois
//! passos `G1 → M1 → M2` converge em exatamente duas passadas.
//!
//! ## Ownership
//!
//! O motor (base de regras, índice, config) é imutável e `Send + Sync`: basta
//! um `Arc` para compartilhá-lo entre quantas execuções simultâneas forem
//! necessárias. Cada execução é dona da sua [`WorkingMemory`] e do seu
//! [`TraceRecorder`].
//!
//! ## Modo de Desconto
//!
//! Com [`EngineConfig::discount_derived_by_user`] ligado, um antecedente cujo
//! valor atual é DERIVED mas cujo código também veio do usuário contribui
//! `cf_derivado × cf_usuario` em vez de `cf_derivado`. Desligado por padrão,
//! pois muda o significado evidencial da base de regras.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use super::index::RuleIndex;
use super::projector::{DiagnosisClassifier, Projection, ResultProjector};
use super::trace::{AntecedentValue, Outcome, TraceEntry, TraceRecorder};
use crate::core::{
    certainty, Fact, MemorySnapshot, Operator, PendingUpdates, Rule, RuleBase, WorkingMemory,
    DEFAULT_EPSILON,
};
use crate::error::{EngineError, InputError};

/// Observações informadas pelo usuário: código → CF.
pub type UserFacts = BTreeMap<String, f64>;

/// Limite de passadas antes de a execução ser reportada como não convergida.
pub const DEFAULT_MAX_PASSES: u32 = 100;

/// Ajustes do laço de ponto fixo.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineConfig {
    pub max_passes: u32,
    /// Menor variação de CF que conta como mudança.
    pub epsilon: f64,
    /// Desconto opcional da evidência derivada pelo CF do usuário no mesmo código.
    pub discount_derived_by_user: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            epsilon: DEFAULT_EPSILON,
            discount_derived_by_user: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_passes == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "max_passes must be at least 1".to_string(),
            });
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(EngineError::InvalidConfig {
                reason: format!("epsilon must be a positive number, got {}", self.epsilon),
            });
        }
        Ok(())
    }
}

/// Correlaciona os eventos de log de uma execução. Nunca entra no trace nem no resultado.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ciclo de vida de uma execução. Só `Running` não é terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Running,
    Converged,
    /// `max_passes` atingido com fatos ainda mudando.
    NotConverged,
}

/// Tudo que uma execução concluída devolve a quem chamou.
#[derive(Clone, Debug)]
pub struct InferenceReport {
    pub run_id: RunId,
    pub state: RunState,
    /// Passadas que avaliaram ao menos uma regra candidata.
    pub passes: u32,
    pub memory: WorkingMemory,
    pub trace: TraceRecorder,
}

impl InferenceReport {
    pub fn converged(&self) -> bool {
        self.state == RunState::Converged
    }

    /// Ranqueia os fatos derivados para exibição.
    pub fn project(&self, classifier: &dyn DiagnosisClassifier) -> Projection {
        ResultProjector::project(&self.memory, classifier)
    }
}

/// Base de regras + índice + config imutáveis, compartilhados por toda execução.
#[derive(Debug)]
pub struct InferenceEngine {
    rules: RuleBase,
    index: RuleIndex,
    config: EngineConfig,
}

impl InferenceEngine {
    /// Constrói o índice uma única vez e valida a configuração.
    pub fn new(rules: RuleBase, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let index = RuleIndex::build(&rules);
        Ok(Self { rules, index, config })
    }

    pub fn with_defaults(rules: RuleBase) -> Self {
        let index = RuleIndex::build(&rules);
        Self {
            rules,
            index,
            config: EngineConfig::default(),
        }
    }

    pub fn rules(&self) -> &RuleBase {
        &self.rules
    }

    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verifica os fatos do usuário antes de qualquer cálculo.
    ///
    /// CFs fora da faixa são rejeitados, nunca truncados.
    pub fn validate_input(user_facts: &UserFacts) -> Result<(), InputError> {
        for (code, &cf) in user_facts {
            if code.trim().is_empty() {
                return Err(InputError::EmptyCode);
            }
            if !certainty::is_valid(cf) {
                return Err(InputError::OutOfRange {
                    code: code.clone(),
                    cf,
                });
            }
        }
        Ok(())
    }

    /// Inicia uma execução passo a passo. A validação acontece aqui.
    pub fn start(&self, user_facts: &UserFacts) -> Result<InferenceRun<'_>, InputError> {
        Self::validate_input(user_facts)?;
        Ok(InferenceRun::new(self, user_facts.clone()))
    }

    /// Executa até o fim.
    pub fn run(&self, user_facts: &UserFacts) -> Result<InferenceReport, InputError> {
        Ok(self.start(user_facts)?.finish())
    }

    /// Executa requisições independentes em paralelo (rayon) sobre o mesmo motor.
    ///
    /// Os resultados mantêm a ordem de `requests`.
    pub fn run_batch(&self, requests: &[UserFacts]) -> Vec<Result<InferenceReport, InputError>> {
        requests.par_iter().map(|facts| self.run(facts)).collect()
    }
}

/// Uma execução de inferência em andamento.
///
/// Chame [`step`](Self::step) até obter um estado terminal e depois
/// [`finish`](Self::finish). Descartar a execução entre passos a abandona.
pub struct InferenceRun<'e> {
    engine: &'e InferenceEngine,
    run_id: RunId,
    user_facts: UserFacts,
    memory: WorkingMemory,
    trace: TraceRecorder,
    changed: BTreeSet<String>,
    pass: u32,
    state: RunState,
}

impl<'e> InferenceRun<'e> {
    fn new(engine: &'e InferenceEngine, user_facts: UserFacts) -> Self {
        let memory = WorkingMemory::seeded(user_facts.iter(), engine.config.epsilon);
        let changed = user_facts.keys().cloned().collect();
        let run_id = RunId::new();
        tracing::debug!(run_id = %run_id, facts = user_facts.len(), "Execução de inferência iniciada");
        Self {
            engine,
            run_id,
            user_facts,
            memory,
            trace: TraceRecorder::new(),
            changed,
            pass: 0,
            state: RunState::Running,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    pub fn trace(&self) -> &TraceRecorder {
        &self.trace
    }

    /// Executa uma passada, ou passa a um estado terminal.
    pub fn step(&mut self) -> RunState {
        if self.state != RunState::Running {
            return self.state;
        }
        if self.changed.is_empty() {
            self.state = RunState::Converged;
            return self.state;
        }

        let engine = self.engine;
        let candidates = engine.index.candidate_rules(&self.changed);
        if candidates.is_empty() {
            self.state = RunState::Converged;
            return self.state;
        }
        if self.pass >= engine.config.max_passes {
            tracing::warn!(
                run_id = %self.run_id,
                passes = self.pass,
                still_changing = self.changed.len(),
                "Inferência não convergiu dentro de max_passes"
            );
            self.state = RunState::NotConverged;
            return self.state;
        }

        self.pass += 1;
        let snapshot = self.memory.snapshot();
        let mut pending = PendingUpdates::new(self.pass);

        for &rule_index in &candidates {
            if let Some(rule) = engine.rules.get(rule_index) {
                self.evaluate(rule, rule_index, &snapshot, &mut pending);
            }
        }

        self.changed = self.memory.apply_updates(pending.fold());
        tracing::debug!(
            run_id = %self.run_id,
            pass = self.pass,
            candidates = candidates.len(),
            changed = self.changed.len(),
            "Passada concluída"
        );
        RunState::Running
    }

    fn evaluate(
        &mut self,
        rule: &Rule,
        rule_index: usize,
        snapshot: &MemorySnapshot,
        pending: &mut PendingUpdates,
    ) {
        let mut present = Vec::with_capacity(rule.antecedents.len());
        let mut missing = Vec::new();
        for code in &rule.antecedents {
            match snapshot.get(code) {
                Some(fact) => present.push(AntecedentValue {
                    code: code.clone(),
                    effective_cf: self.effective_cf(fact),
                }),
                None => missing.push(code.clone()),
            }
        }

        let eligible = match rule.operator {
            Operator::And => missing.is_empty(),
            Operator::Or => !present.is_empty(),
        };
        let cfs: Vec<f64> = present.iter().map(|a| a.effective_cf).collect();
        let premise_cf = if eligible {
            certainty::premise(rule.operator, &cfs)
        } else {
            None
        };

        let Some(premise_cf) = premise_cf else {
            self.trace.record(TraceEntry {
                pass: self.pass,
                rule_id: rule.id.clone(),
                rule_index,
                operator: rule.operator,
                consequent: rule.consequent.clone(),
                antecedents: present,
                premise_cf: None,
                rule_cf: rule.rule_cf,
                conclusion_cf: None,
                outcome: Outcome::Blocked,
                missing,
            });
            return;
        };

        let conclusion_cf = certainty::scale(premise_cf, rule.rule_cf);
        pending.stage(&rule.consequent, &rule.id, rule_index, conclusion_cf);
        self.trace.record(TraceEntry {
            pass: self.pass,
            rule_id: rule.id.clone(),
            rule_index,
            operator: rule.operator,
            consequent: rule.consequent.clone(),
            antecedents: present,
            premise_cf: Some(premise_cf),
            rule_cf: rule.rule_cf,
            conclusion_cf: Some(conclusion_cf),
            outcome: Outcome::Fired,
            missing,
        });
    }

    fn effective_cf(&self, fact: &Fact) -> f64 {
        if self.engine.config.discount_derived_by_user && fact.is_derived() {
            if let Some(user_cf) = self.user_facts.get(&fact.code) {
                return fact.cf * user_cf;
            }
        }
        fact.cf
    }

    /// Consome a execução, concluindo-a antes se ainda estiver rodando.
    pub fn finish(mut self) -> InferenceReport {
        while self.step() == RunState::Running {}
        tracing::info!(
            run_id = %self.run_id,
            passes = self.pass,
            converged = self.state == RunState::Converged,
            derived = self.memory.derived().count(),
            fired = self.trace.fired_count(),
            blocked = self.trace.blocked_count(),
            "Execução de inferência concluída"
        );
        InferenceReport {
            run_id: self.run_id,
            state: self.state,
            passes: self.pass,
            memory: self.memory,
            trace: self.trace,
        }
    }
}
