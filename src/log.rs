//! Diagnostic output collaborator
//!
//! The harness writes its result lines through [`Logger`]. Deduplication
//! across processes lives in the logger, not in the sweep logic: under an MPI
//! launcher only rank 0 of [`TracingLogger`] prints.

use std::sync::Mutex;

use tracing::info;

/// Sink for harness output lines
pub trait Logger {
    fn log(&self, line: &str);
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, line: &str) {
        (**self).log(line);
    }
}

/// Environment variables MPI launchers use to publish the process rank
const RANK_VARIABLES: [&str; 4] = ["PMI_RANK", "OMPI_COMM_WORLD_RANK", "PMIX_RANK", "SLURM_PROCID"];

/// Rank of this process under an MPI launcher, 0 when run standalone
pub fn process_rank() -> usize {
    RANK_VARIABLES
        .iter()
        .find_map(|var| std::env::var(var).ok()?.trim().parse().ok())
        .unwrap_or(0)
}

/// Emits lines as `info` events, on the master process only
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    master: bool,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::with_rank(process_rank())
    }

    pub fn with_rank(rank: usize) -> Self {
        Self { master: rank == 0 }
    }

    pub fn is_master(&self) -> bool {
        self.master
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for TracingLogger {
    fn log(&self, line: &str) {
        if self.master {
            info!(target: "pml_check", "{line}");
        }
    }
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Format a number the way C's `%g` does (6 significant digits)
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Rounding to 6 digits can move the exponent, so take it from the rounded form
    let sci = format!("{value:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (5 - exp).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
