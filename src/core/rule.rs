//! # Rule — Regras de Produção e a Base de Regras Imutável
//!
//! Uma [`Rule`] se lê como `IF antecedentes THEN consequente WITH cf_regra`:
//!
//! ```text
//! R1: IF (G01 AND G03) THEN M02   cf = 0.6
//! ```
//!
//! As regras chegam como [`RuleRecord`]s de tipagem frouxa (uma por entrada do
//! arquivo de regras) e são validadas numa [`RuleBase`]. Registros malformados
//! são descartados com um aviso e guardados como diagnóstico [`RuleDefect`];
//! as demais regras continuam utilizáveis.
//!
//! ## Formato do Registro
//!
//! | Campo | Tipo | Obrigatório |
//! |-------|------|-------------|
//! | `id` | string | não (padrão `#<posição>`) |
//! | `if` | array de strings, ≥ 1 | sim |
//! | `then` | string | sim |
//! | `cf` | número em `[-1, 1]` | sim |
//! | `operator` | `"AND"` \| `"OR"` | não (padrão `AND`) |
//!
//! Identificadores servem só de rótulo no trace; duplicatas são permitidas.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::certainty::{self, Operator};
use crate::error::{DefectReason, RuleDefect};

/// Regra de produção validada. Imutável depois de construída.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rule {
    /// Rótulo usado no trace. Não é único.
    pub id: String,
    /// Códigos antecedentes na ordem declarada (não vazio).
    pub antecedents: Vec<String>,
    /// Código de fato concluído pela regra.
    pub consequent: String,
    /// Como os CFs dos antecedentes viram a premissa.
    pub operator: Operator,
    /// Certeza da própria regra, em `[-1, 1]`.
    pub rule_cf: f64,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = format!(" {} ", self.operator.label());
        write!(
            f,
            "{}: IF ({}) THEN {} [cf {}]",
            self.id,
            self.antecedents.join(&joiner),
            self.consequent,
            self.rule_cf
        )
    }
}

/// Uma entrada ainda não validada do arquivo de regras.
///
/// Todos os campos são opcionais: a obrigatoriedade é decidida em
/// [`validate`](Self::validate), não na leitura.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleRecord {
    pub id: Option<String>,
    pub antecedents: Option<Vec<String>>,
    pub then: Option<String>,
    pub cf: Option<f64>,
    pub operator: Option<String>,
}

impl RuleRecord {
    /// Extrai um registro de JSON arbitrário, reportando o primeiro campo com
    /// formato errado.
    pub fn from_value(value: &Value) -> Result<Self, DefectReason> {
        let obj = value.as_object().ok_or(DefectReason::NotAnObject)?;

        let antecedents = match obj.get("if") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut codes = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let code = item
                        .as_str()
                        .ok_or(DefectReason::InvalidAntecedent { index })?;
                    codes.push(code.to_string());
                }
                Some(codes)
            }
            Some(_) => return Err(DefectReason::MissingAntecedents),
        };

        let then = match obj.get("then") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(DefectReason::MissingConsequent),
        };

        let cf = match obj.get("cf") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_f64().ok_or(DefectReason::MissingCertainty)?),
        };

        let operator = match obj.get("operator") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(DefectReason::UnknownOperator {
                    operator: other.to_string(),
                })
            }
        };

        // ids numéricos são aceitos e guardados como texto
        let id = match obj.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(Self {
            id,
            antecedents,
            then,
            cf,
            operator,
        })
    }

    /// Valida o registro, produzindo uma [`Rule`].
    pub fn validate(self, position: usize) -> Result<Rule, RuleDefect> {
        let rule_id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("#{position}"), str::to_string);

        let defect = |reason| RuleDefect {
            position,
            rule_id: rule_id.clone(),
            reason,
        };

        let antecedents: Vec<String> = self
            .antecedents
            .unwrap_or_default()
            .into_iter()
            .map(|code| code.trim().to_string())
            .collect();
        if antecedents.is_empty() {
            return Err(defect(DefectReason::MissingAntecedents));
        }
        if let Some(index) = antecedents.iter().position(String::is_empty) {
            return Err(defect(DefectReason::InvalidAntecedent { index }));
        }

        let consequent = self.then.as_deref().map(str::trim).unwrap_or_default();
        if consequent.is_empty() {
            return Err(defect(DefectReason::MissingConsequent));
        }

        let rule_cf = self.cf.ok_or_else(|| defect(DefectReason::MissingCertainty))?;
        if !certainty::is_valid(rule_cf) {
            return Err(defect(DefectReason::CertaintyOutOfRange { value: rule_cf }));
        }

        let operator = match self.operator.as_deref() {
            None => Operator::default(),
            Some(raw) => Operator::parse(raw).ok_or_else(|| {
                defect(DefectReason::UnknownOperator {
                    operator: raw.to_string(),
                })
            })?,
        };

        Ok(Rule {
            id: rule_id.clone(),
            antecedents,
            consequent: consequent.to_string(),
            operator,
            rule_cf,
        })
    }
}

/// Conjunto validado, ordenado e imutável de regras de que o motor é construído.
///
/// A ordem só importa como o "índice da regra" crescente usado na avaliação
/// determinística.
#[derive(Clone, Debug, Default)]
pub struct RuleBase {
    rules: Vec<Rule>,
    defects: Vec<RuleDefect>,
}

impl RuleBase {
    /// Base a partir de regras já tipadas.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            defects: Vec::new(),
        }
    }

    /// Valida os valores JSON em ordem, pulando os malformados.
    ///
    /// Um registro com campo mal tipado é descartado sozinho, sem derrubar o
    /// lote. Cada descarte emite um evento `warn` e fica em
    /// [`defects()`](Self::defects).
    pub fn from_values(values: &[Value]) -> Self {
        let mut base = Self::default();
        for (position, value) in values.iter().enumerate() {
            let validated = RuleRecord::from_value(value)
                .map_err(|reason| RuleDefect {
                    position,
                    rule_id: value
                        .get("id")
                        .and_then(Value::as_str)
                        .map_or_else(|| format!("#{position}"), str::to_string),
                    reason,
                })
                .and_then(|record| record.validate(position));
            match validated {
                Ok(rule) => base.rules.push(rule),
                Err(defect) => base.reject(defect),
            }
        }
        base
    }

    fn reject(&mut self, defect: RuleDefect) {
        tracing::warn!(
            position = defect.position,
            rule_id = %defect.rule_id,
            reason = %defect.reason,
            "Regra malformada ignorada"
        );
        self.defects.push(defect);
    }

    /// Regras válidas, na ordem do índice.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Registros descartados na construção.
    pub fn defects(&self) -> &[RuleDefect] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
