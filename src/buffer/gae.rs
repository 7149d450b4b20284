//! Generalized Advantage Estimation (GAE)
//!
//! GAE computes advantages as a discounted, decayed sum of temporal
//! difference errors, trading bias against variance via lambda.
//!
//! # Mathematical Formula
//! ```text
//! delta_t = r_t + gamma * V_{t+1} * (1 - done_t) - V_t
//! A_t     = delta_t + gamma * lambda * (1 - done_t) * A_{t+1}
//! ret_t   = A_t + V_t
//! ```
//!
//! A set done flag zeroes both the bootstrap term and the recursion, so
//! advantages never leak across an episode boundary.

/// Compute advantages and returns for one rollout
///
/// # Arguments
/// * `rewards` - Reward at each timestep
/// * `values` - Critic value estimate at each timestep
/// * `dones` - Episode-end flag at each timestep
/// * `bootstrap_value` - Value of the state following the last transition
///   (0 if that state is terminal, else the critic's estimate)
/// * `gamma` - Discount factor
/// * `gae_lambda` - GAE trace decay
///
/// # Returns
/// `(advantages, returns)`, both of the input length, un-normalized.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    bootstrap_value: f32,
    gamma: f32,
    gae_lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    debug_assert_eq!(values.len(), n);
    debug_assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0; n];
    let mut returns = vec![0.0; n];
    let mut gae = 0.0;

    for t in (0..n).rev() {
        let mask = if dones[t] { 0.0 } else { 1.0 };
        let next_value = if t == n - 1 { bootstrap_value } else { values[t + 1] };

        let delta = rewards[t] + gamma * next_value * mask - values[t];
        gae = delta + gamma * gae_lambda * mask * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];
    }

    (advantages, returns)
}

/// Normalize advantages in place to zero mean and unit variance
///
/// A small epsilon keeps the division finite for near-constant advantages.
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.len() < 2 {
        return;
    }

    let n = advantages.len() as f32;
    let mean: f32 = advantages.iter().sum::<f32>() / n;
    let variance: f32 = advantages.iter().map(|&a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();

    for a in advantages.iter_mut() {
        *a = (*a - mean) / (std + 1e-8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMMA: f32 = 0.99;
    const LAMBDA: f32 = 0.95;

    #[test]
    fn test_constant_reward_matches_closed_form() {
        // Constant reward, zero values, done only on the last step: the
        // recursion collapses to a discounted sum with rate gamma * lambda
        let n = 16;
        let r = 0.5_f32;
        let rewards = vec![r; n];
        let values = vec![0.0; n];
        let mut dones = vec![false; n];
        dones[n - 1] = true;

        let (advantages, returns) = compute_gae(&rewards, &values, &dones, 0.0, GAMMA, LAMBDA);

        let decay = GAMMA * LAMBDA;
        for t in 0..n {
            let steps = (n - t) as i32;
            let expected = r * (1.0 - decay.powi(steps)) / (1.0 - decay);
            assert!(
                (advantages[t] - expected).abs() < 1e-4,
                "t={}: {} != {}",
                t,
                advantages[t],
                expected
            );
            // Zero values make returns equal advantages
            assert!((returns[t] - advantages[t]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_done_resets_recursion() {
        // Two episodes in one array; the first episode's advantages must not
        // see anything past its terminal step
        let rewards = vec![1.0, 1.0, 1.0, 1.0];
        let values = vec![0.0; 4];
        let dones = vec![false, true, false, true];

        let (advantages, _) = compute_gae(&rewards, &values, &dones, 0.0, GAMMA, LAMBDA);

        // Terminal steps have advantage exactly equal to their reward
        assert!((advantages[1] - 1.0).abs() < 1e-6);
        assert!((advantages[3] - 1.0).abs() < 1e-6);

        // Step 0 bootstraps only over step 1
        let expected0 = 1.0 + GAMMA * LAMBDA * 1.0;
        assert!((advantages[0] - expected0).abs() < 1e-5);

        // The two episodes are identical, so their advantages match
        assert!((advantages[0] - advantages[2]).abs() < 1e-6);
    }

    #[test]
    fn test_bootstrap_used_when_not_terminal() {
        let rewards = vec![0.0];
        let values = vec![0.0];
        let dones = vec![false];

        let (advantages, returns) = compute_gae(&rewards, &values, &dones, 2.0, GAMMA, LAMBDA);
        assert!((advantages[0] - GAMMA * 2.0).abs() < 1e-6);
        assert!((returns[0] - GAMMA * 2.0).abs() < 1e-6);

        // Terminal final step ignores the bootstrap value entirely
        let (advantages, _) = compute_gae(&rewards, &values, &[true], 2.0, GAMMA, LAMBDA);
        assert_eq!(advantages[0], 0.0);
    }

    #[test]
    fn test_normalization_statistics() {
        let mut advantages: Vec<f32> = (0..64).map(|i| (i as f32) * 0.3 - 7.0).collect();
        normalize_advantages(&mut advantages);

        let n = advantages.len() as f32;
        let mean: f32 = advantages.iter().sum::<f32>() / n;
        let var: f32 = advantages.iter().map(|&a| (a - mean).powi(2)).sum::<f32>() / n;

        assert!(mean.abs() < 1e-5, "mean {} not ~0", mean);
        assert!((var.sqrt() - 1.0).abs() < 1e-3, "std {} not ~1", var.sqrt());
    }

    #[test]
    fn test_normalization_constant_input_stays_finite() {
        let mut advantages = vec![3.0; 8];
        normalize_advantages(&mut advantages);
        for &a in &advantages {
            assert!(a.is_finite());
        }
    }
}
