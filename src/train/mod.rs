//! Training algorithms
//!
//! This module implements PPO training for the paddle policy.

pub mod ppo;

pub use ppo::{
    compute_entropy_loss, compute_policy_loss, compute_value_loss, generate_minibatch_indices,
    PPOConfig, PPOTrainer, TrainingStats,
};
