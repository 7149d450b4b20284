//! Gradient guard behavior across a full update
//!
//! A hard gradient-norm ceiling small enough to reject every minibatch must
//! leave the model parameters bit-for-bit unchanged while still reporting
//! finite statistics and the skip count.

use pong_rl::buffer::Trajectory;
use pong_rl::checkpoint::CheckpointManager;
use pong_rl::env::pong::{PongConfig, PongSim, OBS_DIM};
use pong_rl::policy::{ActionSpace, ActorCritic, ActorCriticConfig};
use pong_rl::train::ppo::{PPOConfig, PPOTrainer};
use tch::Tensor;

fn snapshot(policy: &ActorCritic) -> Vec<Tensor> {
    policy
        .actor_vs()
        .trainable_variables()
        .iter()
        .chain(policy.critic_vs().trainable_variables().iter())
        .map(|v| v.detach().copy())
        .collect()
}

fn params_equal(policy: &ActorCritic, before: &[Tensor]) -> bool {
    policy
        .actor_vs()
        .trainable_variables()
        .iter()
        .chain(policy.critic_vs().trainable_variables().iter())
        .zip(before)
        .all(|(now, then)| now.equal(then))
}

#[test]
fn test_hard_limit_skips_update_without_touching_params() {
    tch::manual_seed(0);
    let policy = ActorCritic::new(ActorCriticConfig {
        action_space: ActionSpace::Continuous,
        action_scale: 6.0,
        ..Default::default()
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let checkpoints = CheckpointManager::new(dir.path()).unwrap();

    // Any real gradient exceeds this ceiling, so every minibatch is skipped
    let config = PPOConfig::new()
        .n_epochs(2)
        .batch_size(16)
        .max_steps_per_episode(64)
        .max_grad_norm(1e-8)
        .grad_norm_hard_limit(1e-8);
    let mut trainer = PPOTrainer::new(config, policy, checkpoints).unwrap();

    let mut env = PongSim::new(PongConfig::default(), 1).unwrap();
    let (trajectory, bootstrap, _) = trainer.collect_rollout(&mut env).unwrap();

    let before = snapshot(trainer.policy());
    let stats = trainer.update(&trajectory, bootstrap).unwrap();

    assert_eq!(stats.num_updates, 0);
    assert!(stats.skipped_minibatches > 0);
    assert!(stats.policy_loss.is_finite());
    assert!(stats.value_loss.is_finite());
    assert!(params_equal(trainer.policy(), &before), "parameters changed despite skipped updates");
}

#[test]
fn test_non_finite_loss_skips_minibatch_without_touching_params() {
    tch::manual_seed(0);
    let policy = ActorCritic::new(ActorCriticConfig {
        action_space: ActionSpace::Continuous,
        action_scale: 6.0,
        ..Default::default()
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let checkpoints = CheckpointManager::new(dir.path()).unwrap();

    let config = PPOConfig::new().n_epochs(2).batch_size(8);
    let mut trainer = PPOTrainer::new(config, policy, checkpoints).unwrap();

    // NaN rollout log probs poison the probability ratio, so every minibatch
    // loss is non-finite and must be abandoned before any backward pass
    let mut trajectory = Trajectory::with_capacity(8);
    for i in 0..8 {
        let obs = vec![0.1 * i as f32; OBS_DIM];
        trajectory.push(obs, 0.0, 0.1, 0.0, f32::NAN, i == 7);
    }

    let before = snapshot(trainer.policy());
    let stats = trainer.update(&trajectory, 0.0).unwrap();

    assert_eq!(stats.num_updates, 0);
    assert!(stats.skipped_minibatches > 0);
    assert!(params_equal(trainer.policy(), &before), "parameters changed despite non-finite loss");
}

#[test]
fn test_normal_update_changes_params() {
    tch::manual_seed(0);
    let policy = ActorCritic::new(ActorCriticConfig {
        action_space: ActionSpace::Continuous,
        action_scale: 6.0,
        ..Default::default()
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let checkpoints = CheckpointManager::new(dir.path()).unwrap();

    let config = PPOConfig::new().n_epochs(2).batch_size(16).max_steps_per_episode(64);
    let mut trainer = PPOTrainer::new(config, policy, checkpoints).unwrap();

    let mut env = PongSim::new(PongConfig::default(), 1).unwrap();
    let (trajectory, bootstrap, _) = trainer.collect_rollout(&mut env).unwrap();

    let before = snapshot(trainer.policy());
    let stats = trainer.update(&trajectory, bootstrap).unwrap();

    assert!(stats.num_updates > 0);
    assert_eq!(stats.skipped_minibatches, 0);
    assert!(!params_equal(trainer.policy(), &before), "update left parameters untouched");
}
