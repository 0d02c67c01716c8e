//! Saída de terminal do plugpack — mensagens de estágio coloridas e spinner.
//!
//! Usa `console` para estilização e `indicatif` para o spinner exibido
//! enquanto o compactador roda com a saída capturada.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::PreconditionViolation;
use crate::pipeline::{BuildReport, Stage};

/// Mensagens de progresso de uma execução.
pub struct StageProgress {
    // Estilo verde para sucesso.
    green: Style,
    // Estilo vermelho para falha.
    red: Style,
    // Estilo amarelo para avisos.
    yellow: Style,
    cyan: Style,
}

impl Default for StageProgress {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
        }
    }
}

impl StageProgress {
    /// Anuncia o início de um estágio.
    pub fn stage(&self, stage: Stage, message: &str) {
        println!("{} {message}", self.cyan.apply_to(format!("[{stage}]")));
    }

    pub fn warn(&self, message: &str) {
        println!("  {} {message}", self.yellow.apply_to("!"));
    }

    pub fn success(&self, message: &str) {
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    /// Exibe a falha e o estágio em que ocorreu.
    pub fn failure(&self, stage: Stage, message: &str) {
        println!(
            "  {} {} failed: {message}",
            self.red.apply_to("✗"),
            stage
        );
    }

    /// Lista violações de pré-condição, uma por linha.
    pub fn violations(&self, violations: &[PreconditionViolation]) {
        for violation in violations {
            println!("  {} {violation}", self.red.apply_to("✗"));
        }
    }

    /// Inicia um spinner; o chamador deve finalizá-lo com `finish_and_clear`.
    pub fn spinner(&self, message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Imprime o relatório da execução formatado em JSON.
    pub fn print_report(&self, report: &BuildReport) {
        let style = if report.failed_at.is_some() {
            &self.red
        } else {
            &self.green
        };
        println!();
        println!("{}", style.apply_to("─── Build Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}
