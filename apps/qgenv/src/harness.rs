//! Result aggregation and the routine runner.
//!
//! The `Aggregator` is an owned value threaded through every routine by
//! `&mut`. `run_routines` executes routines in the order given and isolates
//! each one: results are staged per routine, and a routine that returns an
//! error or panics contributes exactly one failing result instead.

use crate::checks::{Context, Routine};
use crate::models::{CheckResult, RunSummary};
use crate::utils;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

thread_local! {
    static IN_ROUTINE: Cell<bool> = Cell::new(false);
}

static PANIC_HOOK: Once = Once::new();

/// Route panics raised inside a running routine to tracing instead of the
/// default stderr report; the runner records them as results. Panics
/// elsewhere still reach the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_ROUTINE.with(Cell::get) {
                tracing::debug!(%info, "routine panicked");
            } else {
                previous(info);
            }
        }));
    });
}

/// Whether the current thread is inside `run_routine`.
pub fn routine_active() -> bool {
    IN_ROUTINE.with(Cell::get)
}

/// Accumulates check results for one harness run.
pub struct Aggregator {
    results: Vec<CheckResult>,
    passed: usize,
    failed: usize,
    started: Instant,
    echo: bool,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator {
            results: Vec::new(),
            passed: 0,
            failed: 0,
            started: Instant::now(),
            echo: false,
        }
    }

    /// Aggregator that prints a progress line for every recorded result.
    pub fn echoing() -> Self {
        Aggregator {
            echo: true,
            ..Self::new()
        }
    }

    pub fn add_result(&mut self, name: impl Into<String>, passed: bool, message: impl Into<String>) {
        self.push(CheckResult {
            name: name.into(),
            passed,
            message: message.into(),
        });
    }

    fn push(&mut self, result: CheckResult) {
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        if self.echo {
            if result.passed {
                println!("  {} {}", utils::status_mark(true), result.name);
            } else {
                println!(
                    "  {} {}: {}",
                    utils::status_mark(false),
                    result.name,
                    result.message
                );
            }
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn summarize(&self) -> RunSummary {
        let total = self.results.len();
        let success_rate = if total == 0 {
            100.0
        } else {
            self.passed as f64 / total as f64 * 100.0
        };
        RunSummary {
            total,
            passed: self.passed,
            failed: self.failed,
            success_rate,
            duration_secs: self.started.elapsed().as_secs_f64(),
            success: self.failed == 0,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "routine panicked".to_string()
    }
}

/// Run one routine into `agg`, converting an error or panic into a single
/// failing result named after the routine.
pub fn run_routine(routine: Routine, ctx: &Context<'_>, agg: &mut Aggregator) {
    if agg.echo {
        println!("\n{}", routine.title());
    }
    install_panic_hook();
    let mut staged = Aggregator::new();
    IN_ROUTINE.with(|f| f.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| routine.run(ctx, &mut staged)));
    IN_ROUTINE.with(|f| f.set(false));
    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };
    match failure {
        None => {
            for r in staged.results {
                agg.push(r);
            }
        }
        Some(message) => {
            tracing::warn!(routine = ?routine, %message, "routine failed");
            agg.add_result(routine.failure_name(ctx), false, message);
        }
    }
}

/// Run `routines` in order. Later routines run regardless of earlier failures.
pub fn run_routines(routines: &[Routine], ctx: &Context<'_>, agg: &mut Aggregator) {
    for routine in routines {
        run_routine(*routine, ctx, agg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_every_call() {
        let mut agg = Aggregator::new();
        let pattern = [true, false, false, true, true, false, true];
        for (i, passed) in pattern.iter().enumerate() {
            agg.add_result(format!("check {}", i), *passed, "");
            let s = agg.summarize();
            assert_eq!(s.total, i + 1);
            assert_eq!(s.total, s.passed + s.failed);
        }
    }

    #[test]
    fn test_mixed_results_summary() {
        let mut agg = Aggregator::new();
        agg.add_result("A", true, "");
        agg.add_result("B", false, "missing");
        agg.add_result("C", true, "");
        let s = agg.summarize();
        assert_eq!((s.total, s.passed, s.failed), (3, 2, 1));
        assert_eq!(format!("{:.1}", s.success_rate), "66.7");
        assert!(!s.success);
        let failed: Vec<_> = agg.failures().map(|r| r.name.as_str()).collect();
        assert_eq!(failed, vec!["B"]);
    }

    #[test]
    fn test_empty_run_is_vacuous_success() {
        let s = Aggregator::new().summarize();
        assert_eq!(s.total, 0);
        assert!(s.success);
        assert_eq!(s.success_rate, 100.0);
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let mut agg = Aggregator::new();
        agg.add_result("Library: numpy", true, "v1.24.3");
        agg.add_result("Library: numpy", false, "Not installed");
        assert_eq!(agg.results().len(), 2);
        assert!(!agg.summarize().success);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "routine panicked");
    }
}
