//! # WorkingMemory — Memória de Fatos de Uma Execução
//!
//! Guarda o [`Fact`] atual de cada código conhecido durante uma única
//! execução. As mutações seguem a disciplina **snapshot-then-merge**:
//!
//! ```text
//! passada n:  snapshot() ──► toda regra lê o snapshot congelado
//!                             │
//!                             ▼
//!             PendingUpdates  (conclusões agrupadas por consequente)
//!                             │ fold()      conclusões da mesma passada
//!                             ▼             combinadas por id de regra
//!             apply_updates() ──► códigos que de fato mudaram
//! ```
//!
//! Nenhuma regra observa uma conclusão produzida antes na mesma passada, então
//! o resultado não depende da ordem em que as regras candidatas são avaliadas.
//!
//! ## Política de Merge
//!
//! | Entrada anterior | Valor armazenado |
//! |------------------|------------------|
//! | ausente | CF candidato |
//! | presente (usuário ou derivado) | [`combine`](super::certainty::combine)`(antigo, candidato)` |
//!
//! Um código conta como *alterado* quando estava ausente ou seu CF se moveu
//! mais que `epsilon` (padrão [`DEFAULT_EPSILON`]).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use super::certainty;
use super::fact::{Fact, FactSource};

/// Menor variação de CF que conta como mudança.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Visão imutável da memória tirada no início de uma passada.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySnapshot {
    facts: BTreeMap<String, Fact>,
}

impl MemorySnapshot {
    pub fn get(&self, code: &str) -> Option<&Fact> {
        self.facts.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.facts.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Memória mutável, pertencente a exatamente uma execução.
///
/// Apoiada num `BTreeMap`: toda iteração sai em ordem crescente de código.
#[derive(Clone, Debug)]
pub struct WorkingMemory {
    facts: BTreeMap<String, Fact>,
    epsilon: f64,
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl WorkingMemory {
    /// Memória vazia com limiar de mudança próprio.
    pub fn new(epsilon: f64) -> Self {
        Self {
            facts: BTreeMap::new(),
            epsilon,
        }
    }

    /// Memória semeada com os fatos do usuário (`source = User`, geração 0).
    ///
    /// Quem chama valida os CFs antes; aqui a entrada é aceita como está.
    pub fn seeded<'a>(user_facts: impl IntoIterator<Item = (&'a String, &'a f64)>, epsilon: f64) -> Self {
        let mut memory = Self::new(epsilon);
        for (code, cf) in user_facts {
            memory.facts.insert(code.clone(), Fact::user(code.clone(), *cf));
        }
        memory
    }

    pub fn get(&self, code: &str) -> Option<&Fact> {
        self.facts.get(code)
    }

    /// Cópia congelada para as consultas de antecedentes de uma passada.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            facts: self.facts.clone(),
        }
    }

    /// Incorpora os candidatos já combinados e informa quais códigos mudaram.
    ///
    /// Política de merge na doc do módulo. Entradas cujo CF não passou do
    /// epsilon mantêm origem e geração anteriores.
    pub fn apply_updates(&mut self, updates: BTreeMap<String, Fact>) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();
        for (code, candidate) in updates {
            match self.facts.entry(code) {
                Entry::Vacant(slot) => {
                    changed.insert(slot.key().clone());
                    slot.insert(candidate);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    let merged = certainty::combine(existing.cf, candidate.cf);
                    if (merged - existing.cf).abs() > self.epsilon {
                        existing.cf = merged;
                        existing.source = candidate.source;
                        existing.generation = candidate.generation;
                        changed.insert(slot.key().clone());
                    }
                }
            }
        }
        changed
    }

    /// Todos os fatos, em ordem crescente de código.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    /// Fatos cujo valor atual foi definido por uma regra.
    pub fn derived(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values().filter(|f| f.source == FactSource::Derived)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Conclusões de uma passada, antes de tocarem a memória.
#[derive(Debug, Default)]
pub struct PendingUpdates {
    // consequente -> [(rule_id, rule_index, cf)]
    staged: BTreeMap<String, Vec<(String, usize, f64)>>,
    pass: u32,
}

impl PendingUpdates {
    pub fn new(pass: u32) -> Self {
        Self {
            staged: BTreeMap::new(),
            pass,
        }
    }

    /// Registra a conclusão de uma regra disparada.
    pub fn stage(&mut self, consequent: &str, rule_id: &str, rule_index: usize, cf: f64) {
        self.staged
            .entry(consequent.to_string())
            .or_default()
            .push((rule_id.to_string(), rule_index, cf));
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Reduz as conclusões de mesmo consequente a um candidato por código.
    ///
    /// Combina em ordem crescente de id de regra, desempatando pelo índice,
    /// então o resultado independe da ordem de registro.
    pub fn fold(self) -> BTreeMap<String, Fact> {
        let pass = self.pass;
        self.staged
            .into_iter()
            .filter_map(|(code, mut conclusions)| {
                conclusions.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
                let mut iter = conclusions.into_iter().map(|(_, _, cf)| cf);
                let first = iter.next()?;
                let cf = iter.fold(first, certainty::combine);
                Some((code.clone(), Fact::derived(code, cf, pass)))
            })
            .collect()
    }
}
