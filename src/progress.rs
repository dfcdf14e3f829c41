use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TransplantError};
use crate::transplant::TransplantState;

/// Cooperative cancellation flag shared between the caller and a running transplant.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Receives state transitions and progress of a transplant.
pub trait TransplantObserver {
    fn on_state(&mut self, state: TransplantState) {
        let _ = state;
    }

    /// Called with a percentage in `0..=100`, never decreasing and never repeated.
    fn on_progress(&mut self, percent: u8) {
        let _ = percent;
    }
}

pub struct NoopObserver;

impl TransplantObserver for NoopObserver {}

/// Cancellation checks and percentage reporting for the loops of one invocation.
///
/// Work is counted in units (a terrain row, a statics row or a statics block).
/// Callers check cancellation at the top of every unit and advance after it.
pub struct ProgressTicker<'a> {
    cancel: CancellationToken,
    stage: TransplantState,
    total: u64,
    done: u64,
    last_percent: Option<u8>,
    observer: Option<&'a mut dyn TransplantObserver>,
}

impl<'a> ProgressTicker<'a> {
    pub fn new(
        cancel: CancellationToken,
        total: u64,
        observer: Option<&'a mut dyn TransplantObserver>,
    ) -> Self {
        ProgressTicker {
            cancel,
            stage: TransplantState::Idle,
            total,
            done: 0,
            last_percent: None,
            observer,
        }
    }

    /// A ticker nobody listens to and nobody cancels.
    pub fn unobserved() -> Self {
        ProgressTicker::new(CancellationToken::new(), 0, None)
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    pub fn stage(&self) -> TransplantState {
        self.stage
    }

    pub(crate) fn enter(&mut self, stage: TransplantState) {
        self.stage = stage;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_state(stage);
        }
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TransplantError::Cancelled(self.stage));
        }
        Ok(())
    }

    pub fn advance(&mut self) {
        if self.total == 0 {
            return;
        }
        self.done = (self.done + 1).min(self.total);
        self.emit((self.done * 100 / self.total) as u8);
    }

    pub(crate) fn finish(&mut self) {
        self.done = self.total;
        self.emit(100);
    }

    fn emit(&mut self, percent: u8) {
        if self.last_percent.is_some_and(|last| percent <= last) {
            return;
        }
        self.last_percent = Some(percent);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_progress(percent);
        }
    }
}
