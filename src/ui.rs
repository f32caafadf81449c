//! Interface de terminal do cliente de provas: cronômetro e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de contagem regressiva e `console`
//! para estilização com cores. O [`CountdownBar`] mostra `Exam: m:ss` enquanto
//! a prova corre; o indicador de status reage às mudanças de estado.

use std::sync::Mutex;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};

use crate::api::{ExamSummary, HiringDrive};
use crate::error::SubmitMode;
use crate::observers::ObserverHandle;
use crate::state_machine::{SessionState, StateMachine};
use crate::submission::SubmissionOutcome;
use crate::timer::CountdownDisplay;

/// Formata o tempo restante como `Exam: m:ss`.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("Exam: {}:{:02}", secs / 60, secs % 60)
}

struct Running {
    pb: ProgressBar,
    ticker: JoinHandle<()>,
}

/// Contagem regressiva no terminal, atualizada uma vez por segundo.
pub struct CountdownBar {
    runtime: Handle,
    running: Mutex<Option<Running>>,
}

impl CountdownBar {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            running: Mutex::new(None),
        }
    }

    fn take(&self) -> Option<Running> {
        match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl CountdownDisplay for CountdownBar {
    fn show(&self, remaining: Duration) {
        self.hide();

        let pb = ProgressBar::new(remaining.as_secs());
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(format_countdown(remaining));

        let deadline = Instant::now() + remaining;
        let total = remaining.as_secs();
        let bar = pb.clone();
        let ticker = self.runtime.spawn(async move {
            let mut tick = interval(Duration::from_secs(1));
            loop {
                tick.tick().await;
                let left = deadline.saturating_duration_since(Instant::now());
                bar.set_message(format_countdown(left));
                bar.set_position(total.saturating_sub(left.as_secs()));
                if left.is_zero() {
                    break;
                }
            }
        });

        let mut guard = match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Running { pb, ticker });
    }

    fn hide(&self) {
        if let Some(running) = self.take() {
            running.ticker.abort();
            running.pb.finish_and_clear();
        }
    }
}

/// O que o candidato pode fazer em cada estado.
pub fn status_line(state: SessionState) -> String {
    let action = match state {
        SessionState::LoggedIn | SessionState::ExamStarted => "Submit Exam",
        SessionState::Submitting => "Submitting...",
        SessionState::LoggedOut | SessionState::ExamSubmitted | SessionState::ExamExpired => "Login",
    };
    format!("[{state}] {action}")
}

/// Registra um observador que imprime o status a cada transição.
pub fn attach_status_indicator(state: &StateMachine) -> ObserverHandle {
    let style = Style::new().cyan();
    state.subscribe(move |s| {
        eprintln!("  {}", style.apply_to(status_line(*s)));
        Ok(())
    })
}

/// Exibe o resultado de uma submissão com cor de sucesso ou falha.
pub fn print_outcome(outcome: &SubmissionOutcome, mode: SubmitMode) {
    let Some(message) = outcome.user_message(mode) else {
        return;
    };
    if outcome.is_failure() {
        println!("  {} {message}", Style::new().red().bold().apply_to("✗"));
    } else {
        println!("  {} {message}", Style::new().green().bold().apply_to("✓"));
    }
    if let Some(id) = outcome.result_id() {
        println!("    result: {id}");
    }
}

pub fn print_drives(drives: &[HiringDrive]) {
    let dim = Style::new().dim();
    if drives.is_empty() {
        println!("  {}", dim.apply_to("No hiring drives"));
        return;
    }
    for drive in drives {
        println!("  {}  {} {}", drive.id, drive.name, dim.apply_to(&drive.code));
    }
}

pub fn print_exams(exams: &[ExamSummary]) {
    let dim = Style::new().dim();
    if exams.is_empty() {
        println!("  {}", dim.apply_to("No exams in this drive"));
        return;
    }
    for exam in exams {
        let difficulty = exam.difficulty.as_deref().unwrap_or("-");
        println!(
            "  {}  {} {}",
            exam.id,
            exam.title,
            dim.apply_to(format!("({} min, {difficulty})", exam.duration))
        );
    }
}

/// Resumo do `status`: estado, prova e tempo restante.
pub fn print_status(state: SessionState, exam_id: Option<&str>, remaining: Option<Duration>) {
    let bold = Style::new().bold();
    println!("  {} {}", bold.apply_to("State:"), status_line(state));
    if let Some(exam) = exam_id {
        println!("  {} {exam}", bold.apply_to("Exam:"));
    }
    if let Some(left) = remaining {
        println!("  {} {}", bold.apply_to("Time:"), format_countdown(left));
    }
}

/// Aviso amarelo para falhas não fatais.
pub fn warn(message: &str) {
    eprintln!("  {} {message}", Style::new().yellow().apply_to("!"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::sync::Arc;

    #[test]
    fn countdown_format() {
        assert_eq!(format_countdown(Duration::from_secs(3600)), "Exam: 60:00");
        assert_eq!(format_countdown(Duration::from_secs(65)), "Exam: 1:05");
        assert_eq!(format_countdown(Duration::from_secs(0)), "Exam: 0:00");
        assert_eq!(format_countdown(Duration::from_millis(59_900)), "Exam: 0:59");
    }

    #[test]
    fn status_affordance_per_state() {
        assert!(status_line(SessionState::ExamStarted).ends_with("Submit Exam"));
        assert!(status_line(SessionState::LoggedIn).ends_with("Submit Exam"));
        assert!(status_line(SessionState::ExamExpired).ends_with("Login"));
        assert_eq!(status_line(SessionState::Submitting), "[SUBMITTING] Submitting...");
    }

    #[test]
    fn status_indicator_survives_transitions() {
        let sm = StateMachine::new(Store::in_memory());
        let handle = attach_status_indicator(&sm);
        sm.transition(SessionState::LoggedIn).unwrap();
        assert!(sm.unsubscribe(handle));
    }

    #[tokio::test]
    async fn countdown_bar_show_and_hide() {
        let bar = Arc::new(CountdownBar::new(Handle::current()));
        bar.show(Duration::from_secs(90));
        assert!(bar.running.lock().unwrap().is_some());

        // Mostrar de novo substitui a barra anterior.
        bar.show(Duration::from_secs(30));
        bar.hide();
        assert!(bar.running.lock().unwrap().is_none());
        bar.hide();
    }
}
