//! Train a paddle policy with PPO
//!
//! Builds the seeded pong environment and the actor-critic model, resumes
//! from the latest checkpoint when one exists, then runs the training loop.
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pong_rl::checkpoint::CheckpointManager;
use pong_rl::env::pong::{PongConfig, PongSim};
use pong_rl::env::Environment;
use pong_rl::policy::{ActionSpace, ActorCritic, ActorCriticConfig};
use pong_rl::train::ppo::{PPOConfig, PPOTrainer};

const SEED: u64 = 42;
const N_EPISODES: usize = 1000;
const CHECKPOINT_DIR: &str = "checkpoints";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Weight initialization draws from libtorch's rng
    tch::manual_seed(SEED as i64);

    let env_config = PongConfig::default();
    let mut env = PongSim::new(env_config.clone(), SEED)?;

    let policy = ActorCritic::new(ActorCriticConfig {
        obs_dim: env.observation_space().shape[0] as i64,
        action_space: ActionSpace::Continuous,
        action_scale: env_config.max_paddle_speed,
        ..Default::default()
    })?;
    info!(device = ?policy.device(), "model initialized");

    let checkpoints = CheckpointManager::new(CHECKPOINT_DIR)?;
    let config = PPOConfig::new().seed(SEED);
    let mut trainer = PPOTrainer::new(config, policy, checkpoints)?;

    match trainer.resume_from_latest()? {
        Some(meta) => info!(
            episode = meta.episode,
            total_steps = meta.total_steps,
            avg_reward = meta.avg_reward,
            "resumed from latest checkpoint"
        ),
        None => info!("no checkpoint found, starting fresh"),
    }

    trainer.run(&mut env, N_EPISODES)?;

    info!(
        episodes = trainer.total_episodes(),
        steps = trainer.total_steps(),
        avg_reward = trainer.average_reward(),
        "training complete"
    );
    Ok(())
}
