//! Budget de résolution : limite de temps et signal d'annulation fournis par
//! l'appelant. Le solveur consulte `check` entre deux augmentations et,
//! pendant la recherche de chemin, une fois tous les `mask + 1` pas.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Drapeau d'annulation partageable entre threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    TimeLimit,
    Cancelled,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::TimeLimit => write!(f, "time limit reached"),
            Interruption::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Budget {
    started: Instant,
    limit: Option<Duration>,
    token: Option<CancelToken>,
    clock_check_mask: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Budget {
    /// Vérification d'horloge tous les 1024 pas de recherche.
    const DEFAULT_CLOCK_CHECK_MASK: u64 = 0x3FF;

    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
            token: None,
            clock_check_mask: Self::DEFAULT_CLOCK_CHECK_MASK,
        }
    }

    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            limit: Some(limit),
            ..Self::unlimited()
        }
    }

    pub fn from_millis(ms: Option<u64>) -> Self {
        match ms {
            Some(ms) => Self::with_time_limit(Duration::from_millis(ms)),
            None => Self::unlimited(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_clock_check_mask(mut self, mask: u64) -> Self {
        self.clock_check_mask = mask;
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Contrôle complet (annulation puis horloge).
    pub fn check(&self) -> Option<Interruption> {
        if self.token.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Some(Interruption::Cancelled);
        }
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Some(Interruption::TimeLimit),
            _ => None,
        }
    }

    /// Contrôle filtré par masque, pour les boucles internes.
    #[inline]
    pub fn check_step(&self, steps: u64) -> Option<Interruption> {
        if steps & self.clock_check_mask == 0 {
            self.check()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_never_interrupts() {
        let budget = Budget::unlimited();
        assert_eq!(budget.check(), None);
        assert_eq!(budget.check_step(0), None);
    }

    #[test]
    fn zero_limit_trips_immediately() {
        let budget = Budget::with_time_limit(Duration::ZERO);
        assert_eq!(budget.check(), Some(Interruption::TimeLimit));
    }

    #[test]
    fn cancel_token_wins_over_clock() {
        let token = CancelToken::new();
        let budget = Budget::with_time_limit(Duration::ZERO).with_cancel_token(token.clone());
        token.cancel();
        assert_eq!(budget.check(), Some(Interruption::Cancelled));
    }

    #[test]
    fn step_check_skips_when_mask_bits_set() {
        let budget = Budget::with_time_limit(Duration::ZERO);
        assert_eq!(budget.check_step(1), None);
        assert_eq!(budget.check_step(1024), Some(Interruption::TimeLimit));

        // masque 0x3 : contrôle un pas sur quatre
        let budget = Budget::with_time_limit(Duration::ZERO).with_clock_check_mask(0x3);
        assert_eq!(budget.check_step(5), None);
        assert_eq!(budget.check_step(8), Some(Interruption::TimeLimit));
    }
}
