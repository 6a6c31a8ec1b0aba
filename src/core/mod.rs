//! # Core Module — Tipos Fundamentais do Domínio
//!
//! Os blocos usados por todas as outras camadas:
//!
//! - [`certainty`]: o cálculo de fatores de certeza (`premise`, `scale`, `combine`)
//! - [`Rule`] / [`RuleBase`]: regras de produção validadas e o contêiner imutável
//! - [`Fact`] / [`FactSource`]: observação ou conclusão ponderada
//! - [`WorkingMemory`]: memória de trabalho por execução, com snapshot-then-merge
//! - [`KnowledgeBase`]: descrições legíveis dos códigos (só apresentação)
//!
//! ## Exemplo
//!
//! ```rust
//! use crate::core::{certainty, Operator};
//!
//! let premise = certainty::premise(Operator::And, &[0.9, 0.5]).unwrap(); // 0.5
//! let conclusion = certainty::scale(premise, 0.8);                      // 0.4
//! let corroborated = certainty::combine(conclusion, 0.5);               // 0.7
//! ```

pub mod certainty;

pub mod fact;

pub mod knowledge_base;

pub mod rule;

pub mod working_memory;

pub use certainty::Operator;
pub use fact::{Fact, FactSource};
pub use knowledge_base::KnowledgeBase;
pub use rule::{Rule, RuleBase, RuleRecord};
pub use working_memory::{MemorySnapshot, PendingUpdates, WorkingMemory, DEFAULT_EPSILON};
