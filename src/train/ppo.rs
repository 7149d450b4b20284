//! Proximal Policy Optimization (PPO)
//!
//! PPO is a policy gradient method that uses a clipped surrogate objective
//! to keep each policy update close to the policy that collected the data.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each episode:
//!   1. Collect one trajectory using the current policy
//!   2. Compute advantages with GAE and normalize them
//!   3. For multiple epochs:
//!      a. Shuffle the trajectory into minibatches
//!      b. Compute the clipped PPO loss per minibatch
//!      c. Guard gradients, then step actor and critic optimizers
//! ```
//!
//! # References
//!
//! - [Proximal Policy Optimization Algorithms](https://arxiv.org/abs/1707.06347)
//! - [OpenAI Spinning Up: PPO](https://spinningup.openai.com/en/latest/algorithms/ppo.html)

pub mod config;
pub mod loss;
pub mod stats;
pub mod trainer;

pub use config::PPOConfig;
pub use loss::{
    compute_entropy_loss, compute_policy_loss, compute_value_loss, generate_minibatch_indices,
};
pub use stats::TrainingStats;
pub use trainer::PPOTrainer;
