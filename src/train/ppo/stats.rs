//! Training statistics for PPO
//!
//! This module defines structures for tracking and aggregating
//! training metrics during PPO training.

use std::ops::AddAssign;

/// Training statistics for a PPO update
///
/// Tracks losses, diagnostics and the gradient-guard counters from one or
/// more minibatch updates.
#[derive(Debug, Clone, Default)]
pub struct TrainingStats {
    /// Policy loss (clipped surrogate objective)
    pub policy_loss: f64,

    /// Value function loss
    pub value_loss: f64,

    /// Entropy of the policy distribution
    pub entropy: f64,

    /// Total loss (weighted sum of policy, value, and entropy losses)
    pub total_loss: f64,

    /// Fraction of clipped policy updates
    pub clip_fraction: f64,

    /// Approximate KL divergence between rollout and current policies
    pub approx_kl: f64,

    /// Explained variance of value function predictions
    pub explained_var: f64,

    /// Pre-clip global gradient norm
    pub grad_norm: f64,

    /// Minibatch updates skipped by the non-finite-loss or gradient guards
    pub skipped_minibatches: usize,

    /// Number of gradient updates performed
    pub num_updates: usize,
}

impl TrainingStats {
    /// Create zero-initialized statistics
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Add another statistics instance to this one
    pub fn add(&mut self, other: &TrainingStats) {
        self.policy_loss += other.policy_loss;
        self.value_loss += other.value_loss;
        self.entropy += other.entropy;
        self.total_loss += other.total_loss;
        self.clip_fraction += other.clip_fraction;
        self.approx_kl += other.approx_kl;
        self.explained_var += other.explained_var;
        self.grad_norm += other.grad_norm;
        self.skipped_minibatches += other.skipped_minibatches;
        self.num_updates += other.num_updates;
    }

    /// Compute average statistics across the performed updates
    ///
    /// Skip counters are carried through as totals, not averaged.
    pub fn average(&self) -> Self {
        if self.num_updates == 0 {
            return Self { skipped_minibatches: self.skipped_minibatches, ..Self::zeros() };
        }

        let scale = self.num_updates as f64;
        Self {
            policy_loss: self.policy_loss / scale,
            value_loss: self.value_loss / scale,
            entropy: self.entropy / scale,
            total_loss: self.total_loss / scale,
            clip_fraction: self.clip_fraction / scale,
            approx_kl: self.approx_kl / scale,
            explained_var: self.explained_var / scale,
            grad_norm: self.grad_norm / scale,
            skipped_minibatches: self.skipped_minibatches,
            num_updates: self.num_updates,
        }
    }
}

impl AddAssign<&TrainingStats> for TrainingStats {
    fn add_assign(&mut self, other: &TrainingStats) {
        self.add(other);
    }
}
