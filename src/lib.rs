//! # pong-rl
//!
//! Reinforcement-learning training for a paddle-control policy in a simplified
//! 2D pong simulation, built on tch-rs.
//!
//! Two pieces form one unit: a seeded physics environment that advances
//! simulation state and computes rewards, and a PPO actor-critic learner that
//! samples actions, estimates advantages with GAE, and updates its parameters
//! from collected experience.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pong_rl::checkpoint::CheckpointManager;
//! use pong_rl::env::pong::{PongConfig, PongSim};
//! use pong_rl::policy::actor_critic::{ActionSpace, ActorCritic, ActorCriticConfig};
//! use pong_rl::train::ppo::{PPOConfig, PPOTrainer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let env_config = PongConfig::default();
//! let mut env = PongSim::new(env_config.clone(), 42)?;
//!
//! let policy = ActorCritic::new(ActorCriticConfig {
//!     action_space: ActionSpace::Continuous,
//!     action_scale: env_config.max_paddle_speed,
//!     ..Default::default()
//! })?;
//!
//! let checkpoints = CheckpointManager::new("checkpoints")?;
//! let mut trainer = PPOTrainer::new(PPOConfig::default(), policy, checkpoints)?;
//! trainer.run(&mut env, 100)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment trait and the pong simulator
pub mod env;

/// Actor-critic policy networks
pub mod policy;

/// Trajectory storage and advantage estimation
pub mod buffer;

/// Training algorithms (PPO)
pub mod train;

/// Checkpoint persistence for actor/critic parameters
pub mod checkpoint;

/// Current version of pong-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
