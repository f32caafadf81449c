//! Interface de linha de comando do cliente de provas baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (login, drives, exams,
//! start, status, submit, watch) e a flag global `--verbose`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// exam-proctor: cliente de provas de programação com cronômetro e proctoring.
#[derive(Debug, Parser)]
#[command(name = "exam-proctor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Salva o token de acesso e valida com o servidor.
    Login {
        /// Token emitido pelo portal do candidato.
        #[arg(long)]
        token: String,
    },

    /// Esquece token e prova atual.
    Logout,

    /// Lista os processos seletivos do candidato.
    Drives,

    /// Lista as provas de um processo seletivo.
    Exams {
        /// Identificador do processo seletivo.
        drive: String,
    },

    /// Inicia uma prova: cria o workspace e dispara o cronômetro.
    Start {
        #[arg(long)]
        drive: String,

        #[arg(long)]
        exam: String,

        /// Duração em minutos. Por padrão usa a duração informada pelo servidor.
        #[arg(long)]
        duration_minutes: Option<u32>,

        /// Diretório cujo conteúdo é copiado para o workspace da prova.
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Mostra estado, prova e tempo restante.
    Status,

    /// Envia a prova agora.
    Submit,

    /// Acompanha a prova: lê sinais do editor em JSON (uma linha cada) pelo
    /// stdin e envia automaticamente quando o tempo acaba.
    Watch,
}
