//! # Templates Maud — HTML Server-Side
//!
//! | Função | Tipo | Descrição |
//! |--------|------|-----------|
//! | [`symptom_form()`] | página completa | um seletor de CF por código de sintoma |
//! | [`result_page()`] | página completa | diagnósticos ranqueados, fatos derivados, trace |
//! | [`error_page()`] | página completa | entrada rejeitada, link de volta |
//! | [`render_trace()`] | linhas de texto | o trace como log legível |
//!
//! ## Layout do Resultado
//!
//! ```text
//! ┌──────────────── nav-bar ────────────────────┐
//! ├─────────────────────────────────────────────┤
//! │ Diagnóstico principal (descrição, CF %)     │
//! │ Tabela de diagnósticos │ Suas observações   │
//! │ Todos os fatos derivados                    │
//! │ Log da inferência (<pre>)                   │
//! └─────────────────────────────────────────────┘
//! ```

use maud::{html, Markup, DOCTYPE};

use super::handlers::DiagnosisReport;
use crate::core::KnowledgeBase;
use crate::inference::{Outcome, TraceEntry};

/// Opções oferecidas para cada sintoma. `0.0` significa sintoma não
/// informado, que fica fora da execução.
pub const CF_OPTIONS: [(f64, &str); 6] = [
    (0.0, "Não sei / ausente"),
    (0.5, "Pouco provável (0.5)"),
    (0.6, "Talvez (0.6)"),
    (0.7, "Provável (0.7)"),
    (0.8, "Quase certo (0.8)"),
    (1.0, "Certo (1.0)"),
];

fn layout(page_title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (page_title) " | Diagnóstico CF" }
                link rel="stylesheet" href="/assets/style.css";
            }
            body {
                div class="app-shell" {
                    nav class="nav-bar" {
                        a href="/" class="nav-brand" {
                            span class="nav-brand-icon" { "CF" }
                            span class="nav-brand-text" { "Diagnóstico " em { "por Certeza" } }
                        }
                    }
                    main class="app-container" {
                        (content)
                    }
                }
            }
        }
    }
}

/// Página de GET `/`.
pub fn symptom_form(kb: &KnowledgeBase, symptom_prefix: &str) -> Markup {
    let symptoms: Vec<(&str, &str)> = kb.with_prefix(symptom_prefix).collect();
    layout(
        "Sintomas",
        html! {
            section class="panel" {
                h1 { "Quais sintomas você observa?" }
                p class="hint" {
                    "Escolha o quanto você tem certeza de cada sintoma. Deixe em \"Não sei / ausente\" para ignorá-lo."
                }
                @if symptoms.is_empty() {
                    div class="message error" { "Nenhum sintoma configurado na base de conhecimento." }
                } @else {
                    form method="post" action="/diagnose" class="symptom-form" {
                        table class="symptom-table" {
                            thead {
                                tr { th { "Código" } th { "Sintoma" } th { "Certeza" } }
                            }
                            tbody {
                                @for (code, label) in &symptoms {
                                    tr {
                                        td class="code" { (code) }
                                        td { (label) }
                                        td {
                                            select name=(code) {
                                                @for (value, text) in CF_OPTIONS {
                                                    option value=(value) { (text) }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        button type="submit" { "Diagnosticar" }
                    }
                }
            }
        },
    )
}

/// Página de POST `/diagnose`.
pub fn result_page(report: &DiagnosisReport, kb: &KnowledgeBase) -> Markup {
    let log = render_trace(report, kb);
    layout(
        "Resultado",
        html! {
            section class="panel top-diagnosis" {
                @if let Some(top) = &report.top_diagnosis {
                    div class="top-label" { "Diagnóstico mais provável" }
                    h1 { (top.label) " " span class="code" { "(" (top.code) ")" } }
                    div class="cf-percent" { (format!("{:.2}%", top.cf_percent)) }
                } @else {
                    h1 { "Nenhum diagnóstico pôde ser derivado" }
                    p class="hint" { "As observações não satisfizeram nenhuma regra de diagnóstico." }
                }
                @if !report.converged {
                    div class="message warning" {
                        (format!("A inferência parou após {} passadas sem atingir um resultado estável.", report.passes))
                    }
                }
            }

            div class="columns" {
                section class="panel" {
                    h2 { "Diagnósticos" }
                    @if report.diagnoses.is_empty() {
                        p class="hint" { "Nenhum." }
                    } @else {
                        table {
                            thead { tr { th { "Código" } th { "Diagnóstico" } th { "Certeza" } } }
                            tbody {
                                @for d in &report.diagnoses {
                                    tr {
                                        td class="code" { (d.code) }
                                        td { (d.label) }
                                        td { (format!("{:.2}%", d.cf_percent)) }
                                    }
                                }
                            }
                        }
                    }
                }
                section class="panel" {
                    h2 { "Suas observações" }
                    ul class="inputs" {
                        @for input in &report.inputs {
                            li { (input.label) ": " (format!("{:.2}", input.cf)) }
                        }
                    }
                }
            }

            section class="panel" {
                h2 { "Todos os fatos derivados" }
                table {
                    thead { tr { th { "Código" } th { "Descrição" } th { "CF" } } }
                    tbody {
                        @for fact in &report.all_derived {
                            tr {
                                td class="code" { (fact.code) }
                                td { (fact.label) }
                                td { (format!("{:.3}", fact.cf)) }
                            }
                        }
                    }
                }
            }

            section class="panel" {
                h2 { "Log da inferência" }
                pre class="trace" {
                    @for line in &log {
                        (line) "\n"
                    }
                }
            }

            a href="/" class="back-link" { "← Novo diagnóstico" }
        },
    )
}

/// Página exibida quando as observações enviadas são rejeitadas.
pub fn error_page(messages: &[String]) -> Markup {
    layout(
        "Entrada inválida",
        html! {
            section class="panel" {
                h1 { "As observações não puderam ser processadas" }
                div class="message error" {
                    ul {
                        @for message in messages {
                            li { (message) }
                        }
                    }
                }
                a href="/" class="back-link" { "← Voltar ao formulário de sintomas" }
            }
        },
    )
}

/// Renderiza os fatos iniciais e as entradas do trace em linhas de log.
pub fn render_trace(report: &DiagnosisReport, kb: &KnowledgeBase) -> Vec<String> {
    let mut lines = vec!["--- Fatos iniciais (do usuário) ---".to_string()];
    if report.inputs.is_empty() {
        lines.push("Nenhum fato foi informado.".to_string());
    }
    for input in &report.inputs {
        lines.push(format!("FATO: {} ({}) com CF = {:.3}", input.label, input.code, input.cf));
    }

    let mut current_pass = 0;
    for entry in &report.trace {
        if entry.pass != current_pass {
            current_pass = entry.pass;
            lines.push(format!("--- Passada {current_pass} ---"));
        }
        push_entry(&mut lines, entry, kb);
    }

    lines.push(if report.converged {
        "--- Inferência concluída: nenhum fato mudou ---".to_string()
    } else {
        format!("--- Inferência interrompida no limite de passadas ({}) ---", report.passes)
    });
    lines
}

fn push_entry(lines: &mut Vec<String>, entry: &TraceEntry, kb: &KnowledgeBase) {
    let present: Vec<String> = entry
        .antecedents
        .iter()
        .map(|a| format!("{}(CF={:.3})", a.code, a.effective_cf))
        .collect();

    lines.push(format!(
        "Regra {} → {} ({}) [{}]",
        entry.rule_id,
        entry.consequent,
        kb.label(&entry.consequent),
        entry.operator.label()
    ));
    match (entry.outcome, entry.premise_cf, entry.conclusion_cf) {
        (Outcome::Fired, Some(premise), Some(conclusion)) => {
            lines.push(format!("  -> disparou com {}", present.join(", ")));
            if !entry.missing.is_empty() {
                lines.push(format!("  -> não observados: {}", entry.missing.join(", ")));
            }
            lines.push(format!(
                "  -> CF = premissa × regra = {premise:.3} × {} = {conclusion:.3}",
                entry.rule_cf
            ));
        }
        _ => {
            lines.push(format!("  -> bloqueada, faltam {}", entry.missing.join(", ")));
        }
    }
}
