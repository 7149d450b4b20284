//! Loss computation functions for PPO
//!
//! This module contains the core loss computation functions used
//! in PPO training including policy loss, value loss, and entropy loss.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tch::{Kind, Tensor};

/// Compute PPO policy loss with clipping
///
/// Returns (policy_loss, clip_fraction, approx_kl)
///
/// # Arguments
/// * `log_probs` - Log probabilities of actions under current policy
/// * `old_log_probs` - Log probabilities of actions under rollout policy
/// * `advantages` - Normalized advantages
/// * `clip_range` - PPO clipping parameter (epsilon)
pub fn compute_policy_loss(
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    advantages: &Tensor,
    clip_range: f64,
) -> (Tensor, f64, f64) {
    // Probability ratio pi(a|s) / pi_old(a|s)
    let ratio = (log_probs - old_log_probs).exp();

    // Clipped surrogate objective
    let clipped_ratio = ratio.clamp(1.0 - clip_range, 1.0 + clip_range);
    let policy_loss_1 = advantages * &ratio;
    let policy_loss_2 = advantages * clipped_ratio;
    let policy_loss = -policy_loss_1.minimum(&policy_loss_2).mean(Kind::Float);

    // Fraction of samples where the ratio hit the clip boundary
    let clip_fraction = (&ratio - 1.0).abs().greater(clip_range).to_kind(Kind::Float).mean(Kind::Float);

    // Approximate KL divergence for monitoring
    let approx_kl = (old_log_probs - log_probs).mean(Kind::Float);

    (
        policy_loss,
        f64::try_from(&clip_fraction).unwrap_or(0.0),
        f64::try_from(&approx_kl).unwrap_or(0.0),
    )
}

/// Compute value function loss
///
/// Returns (value_loss, explained_variance)
///
/// # Arguments
/// * `values` - Predicted values under current critic
/// * `returns` - Computed returns (targets)
pub fn compute_value_loss(values: &Tensor, returns: &Tensor) -> (Tensor, f64) {
    let value_loss = (values - returns).square().mean(Kind::Float);

    // Explained variance: 1 - Var(returns - values) / Var(returns)
    let var_returns = f64::try_from(returns.var(false)).unwrap_or(0.0);
    let explained_var = if var_returns == 0.0 {
        0.0
    } else {
        let residual_var = f64::try_from((returns - values).var(false)).unwrap_or(0.0);
        1.0 - residual_var / var_returns
    };

    (value_loss, explained_var)
}

/// Compute entropy loss (negative entropy, so minimizing maximizes entropy)
///
/// # Arguments
/// * `entropy` - Entropy tensor from the policy distribution
pub fn compute_entropy_loss(entropy: &Tensor) -> Tensor {
    -entropy.mean(Kind::Float)
}

/// Generate shuffled minibatch indices
///
/// Every sample appears in exactly one minibatch; the last minibatch holds
/// the remainder. The caller's rng makes the shuffle order reproducible.
///
/// # Arguments
/// * `buffer_size` - Total number of samples
/// * `batch_size` - Desired size of each minibatch
/// * `rng` - Seeded shuffle rng
pub fn generate_minibatch_indices(
    buffer_size: usize,
    batch_size: usize,
    rng: &mut StdRng,
) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..buffer_size).collect();
    indices.shuffle(rng);

    indices.chunks(batch_size).map(|chunk| chunk.to_vec()).collect()
}
