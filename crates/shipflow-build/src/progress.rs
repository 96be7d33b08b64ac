//! ステップ進捗の記録
//!
//! 各ステップの開始・成功・失敗と所要時間を記録し、最後にサマリーを出力する。

use crate::plan::StepKind;
use colored::Colorize;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// ステップの実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success { duration: Duration },
    Failed { error: String, duration: Duration },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Success { duration } | Self::Failed { duration, .. } => *duration,
        }
    }
}

pub struct StepReporter {
    start_time: Instant,
    results: Vec<(StepKind, StepOutcome)>,
    current: Option<(StepKind, Instant)>,
}

impl StepReporter {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            results: Vec::new(),
            current: None,
        }
    }

    pub fn start(&mut self, step: StepKind) {
        tracing::debug!(step = %step, "Step started");
        self.current = Some((step, Instant::now()));
    }

    pub fn success(&mut self) {
        if let Some((step, start)) = self.current.take() {
            let duration = start.elapsed();
            tracing::debug!(step = %step, elapsed = %format_duration(duration), "Step finished");
            self.results.push((step, StepOutcome::Success { duration }));
        }
    }

    pub fn failed(&mut self, error: &impl Display) {
        if let Some((step, start)) = self.current.take() {
            let duration = start.elapsed();
            tracing::error!(step = %step, error = %error, "Step failed");
            self.results.push((
                step,
                StepOutcome::Failed {
                    error: error.to_string(),
                    duration,
                },
            ));
        }
    }

    pub fn results(&self) -> &[(StepKind, StepOutcome)] {
        &self.results
    }

    /// 成功したステップ（実行順）
    pub fn completed(&self) -> Vec<StepKind> {
        self.results
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(step, _)| *step)
            .collect()
    }

    pub fn all_success(&self) -> bool {
        self.results.iter().all(|(_, outcome)| outcome.is_success())
    }

    /// サマリーを出力
    pub fn print_summary(&self) {
        let total = self.start_time.elapsed();
        let slowest = self
            .results
            .iter()
            .max_by_key(|(_, outcome)| outcome.duration());

        let status = if self.all_success() {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };

        let mut line = format!(
            "{} {} steps in {}",
            status,
            self.results.len(),
            format_duration(total)
        );
        if let Some((step, outcome)) = slowest {
            line.push_str(&format!(
                " (slowest: {} {})",
                step,
                format_duration(outcome.duration())
            ));
        }
        println!("{}", line);
    }
}

impl Default for StepReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Duration を読みやすい形式にフォーマット
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}
