//! Stake sizing for the three staking families.
//!
//! Each family is a transition function
//!   (bankroll, state) → (desired stake, state after a win, state after a loss)
//!
//! * **Flat** – the same amount every bet.
//! * **Percentage** – a fixed fraction of the *current* bankroll.
//! * **Fibonacci** – `sequence[step] × unit`. A loss moves one step up the
//!   sequence; a win moves two steps back down, never below zero.
//!
//! The desired stake is only a request: the simulator clamps it to the
//! bankroll and the table maximum with [`clamp_stake`].

/// Lazily extended Fibonacci sequence seeded `[1, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciSequence {
    values: Vec<u64>,
}

impl Default for FibonacciSequence {
    fn default() -> Self {
        Self { values: vec![1, 1] }
    }
}

impl FibonacciSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `step`, extending the cache as needed. Saturates at
    /// `u64::MAX` rather than overflowing.
    pub fn get(&mut self, step: usize) -> u64 {
        while self.values.len() <= step {
            let n = self.values.len();
            let next = self.values[n - 1].saturating_add(self.values[n - 2]);
            self.values.push(next);
        }
        self.values[step]
    }

    #[cfg(test)]
    pub fn cached_len(&self) -> usize {
        self.values.len()
    }
}

/// Per-run staking state. Only the Fibonacci family moves `step`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakingState {
    pub step: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeQuote {
    pub desired: f64,
    pub on_win: StakingState,
    pub on_loss: StakingState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StakingPolicy {
    Flat { amount: f64 },
    /// `fraction` of the current bankroll, e.g. 0.05 for 5%
    Percentage { fraction: f64 },
    Fibonacci { unit: f64 },
}

impl StakingPolicy {
    /// Short family identifier used in result tables, e.g. `fibonacci-5`.
    pub fn family(&self) -> String {
        match self {
            StakingPolicy::Flat { .. } => "flat".to_string(),
            StakingPolicy::Percentage { .. } => "percentage".to_string(),
            StakingPolicy::Fibonacci { unit } => format!("fibonacci-{}", format_amount(*unit)),
        }
    }

    /// Compact key fragment, e.g. `flat100`, `pct5`, `fib1`.
    pub fn key(&self) -> String {
        match self {
            StakingPolicy::Flat { amount } => format!("flat{}", format_amount(*amount)),
            StakingPolicy::Percentage { fraction } => {
                format!("pct{}", format_amount(fraction * 100.0))
            }
            StakingPolicy::Fibonacci { unit } => format!("fib{}", format_amount(*unit)),
        }
    }

    pub fn is_fibonacci(&self) -> bool {
        matches!(self, StakingPolicy::Fibonacci { .. })
    }

    pub fn quote(
        &self,
        bankroll: f64,
        state: StakingState,
        sequence: &mut FibonacciSequence,
    ) -> StakeQuote {
        match self {
            StakingPolicy::Flat { amount } => StakeQuote {
                desired: *amount,
                on_win: state,
                on_loss: state,
            },
            StakingPolicy::Percentage { fraction } => StakeQuote {
                desired: bankroll * fraction,
                on_win: state,
                on_loss: state,
            },
            StakingPolicy::Fibonacci { unit } => StakeQuote {
                desired: sequence.get(state.step) as f64 * unit,
                on_win: StakingState {
                    step: state.step.saturating_sub(2),
                },
                on_loss: StakingState {
                    step: state.step + 1,
                },
            },
        }
    }
}

/// Clamp a desired stake to the bankroll first, then to the table maximum.
pub fn clamp_stake(desired: f64, bankroll: f64, max_bet: f64) -> f64 {
    desired.min(bankroll).min(max_bet)
}

fn format_amount(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}
