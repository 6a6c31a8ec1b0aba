//! # KnowledgeBase — Descrições Legíveis dos Códigos de Fato
//!
//! O motor só enxerga códigos opacos como `G03` ou `M01`. A
//! [`KnowledgeBase`] mapeia esses códigos para as descrições exibidas nas
//! páginas de sintomas e diagnósticos.
//!
//! ```json
//! { "G01": "Humor deprimido na maior parte do dia", "M01": "Transtorno depressivo maior" }
//! ```
//!
//! O núcleo de inferência nunca a consulta; ela pertence à apresentação.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Código → descrição, ordenado por código.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    labels: BTreeMap<String, String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(code.into(), label.into());
    }

    /// Descrição de um código, ou o próprio código quando não há descrição.
    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        self.labels.get(code).map_or(code, String::as_str)
    }

    /// Entradas cujo código começa com `prefix`, em ordem de código.
    ///
    /// O formulário lista todo código com o prefixo de sintoma.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.labels
            .iter()
            .filter(move |(code, _)| code.starts_with(prefix))
            .map(|(code, label)| (code.as_str(), label.as_str()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.labels.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(String, String)> for KnowledgeBase {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_code() {
        let mut kb = KnowledgeBase::new();
        kb.insert("G01", "Humor deprimido na maior parte do dia");
        assert_eq!(kb.label("G01"), "Humor deprimido na maior parte do dia");
        assert_eq!(kb.label("G99"), "G99");
    }

    #[test]
    fn test_with_prefix_filters_and_orders() {
        let kb: KnowledgeBase = [
            ("M01", "Transtorno depressivo maior"),
            ("G02", "Perda de interesse ou prazer"),
            ("G01", "Humor deprimido"),
        ]
        .into_iter()
        .map(|(c, l)| (c.to_string(), l.to_string()))
        .collect();
        let symptoms: Vec<_> = kb.with_prefix("G").map(|(c, _)| c).collect();
        assert_eq!(symptoms, vec!["G01", "G02"]);
    }

    #[test]
    fn test_deserializes_from_flat_object() {
        let kb: KnowledgeBase =
            serde_json::from_str(r#"{"G08": "Ataques súbitos de medo intenso", "M03": "Transtorno de pânico"}"#)
                .unwrap();
        assert_eq!(kb.len(), 2);
        assert_eq!(kb.label("M03"), "Transtorno de pânico");
    }
}
