//! Interface de linha de comando do plugpack baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (build, check, stamp,
//! version) e flags globais (--config, --verbose).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// plugpack — empacota um plugin contra uma engine binária e carimba sua versão.
#[derive(Debug, Parser)]
#[command(name = "plugpack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./plugpack.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose) e imprime o relatório do build.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o pipeline completo: verificação, build, carimbo e compactação.
    Build {
        /// Mostra o comando de build sem executá-lo.
        #[arg(long)]
        dry_run: bool,

        /// Branch usada para a revisão do plugin (padrão: branch atual).
        #[arg(long)]
        branch: Option<String>,
    },

    /// Verifica todas as pré-condições e lista cada violação.
    Check,

    /// Carimba BuildId e VersionName em uma saída já construída.
    Stamp {
        /// Branch usada para a revisão do plugin (padrão: branch atual).
        #[arg(long)]
        branch: Option<String>,
    },

    /// Imprime a string de versão composta.
    Version {
        /// Branch usada para a revisão do plugin (padrão: branch atual).
        #[arg(long)]
        branch: Option<String>,
    },
}
