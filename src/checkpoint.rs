//! Checkpoint persistence for actor and critic parameters
//!
//! A checkpoint is a trio of files sharing one tag-derived stem:
//! `<stem>.actor.pt` and `<stem>.critic.pt` hold the network parameters in
//! libtorch's native format, `<stem>.json` holds training metadata. Actor
//! and critic live in separate artifacts so either network can be reloaded
//! on its own.
//!
//! Tags name the three checkpoint roles: `best` for the highest rolling
//! average reward seen so far, `latest` for the most recent periodic save,
//! and `episode_<n>` for numbered snapshots.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::ActorCritic;

/// Checkpoint role, determines the on-disk file stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointTag {
    /// Best rolling average reward so far
    Best,

    /// Most recent save
    Latest,

    /// Numbered snapshot at a given episode
    Episode(u64),
}

impl CheckpointTag {
    fn stem(&self) -> String {
        match self {
            CheckpointTag::Best => "best".to_string(),
            CheckpointTag::Latest => "latest".to_string(),
            CheckpointTag::Episode(n) => format!("episode_{n}"),
        }
    }
}

impl fmt::Display for CheckpointTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stem())
    }
}

/// Training metadata stored alongside the network parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Episodes completed when the checkpoint was written
    pub episode: u64,

    /// Total environment steps taken
    pub total_steps: u64,

    /// Rolling average reward at save time
    pub avg_reward: f32,

    /// Wall-clock save time
    pub saved_at: DateTime<Utc>,

    /// Crate version that wrote the checkpoint
    pub version: String,
}

/// Manages checkpoint files under a single directory
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create checkpoint directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn actor_path(&self, tag: &CheckpointTag) -> PathBuf {
        self.dir.join(format!("{}.actor.pt", tag.stem()))
    }

    fn critic_path(&self, tag: &CheckpointTag) -> PathBuf {
        self.dir.join(format!("{}.critic.pt", tag.stem()))
    }

    fn meta_path(&self, tag: &CheckpointTag) -> PathBuf {
        self.dir.join(format!("{}.json", tag.stem()))
    }

    /// Save the policy's parameters and metadata under a tag
    ///
    /// Overwrites any existing checkpoint with the same tag.
    pub fn save(&self, tag: &CheckpointTag, policy: &ActorCritic, meta: &CheckpointMeta) -> Result<()> {
        policy
            .save_actor(self.actor_path(tag))
            .with_context(|| format!("failed to save actor for checkpoint '{tag}'"))?;
        policy
            .save_critic(self.critic_path(tag))
            .with_context(|| format!("failed to save critic for checkpoint '{tag}'"))?;

        let json = serde_json::to_string_pretty(meta)?;
        std::fs::write(self.meta_path(tag), json)
            .with_context(|| format!("failed to write metadata for checkpoint '{tag}'"))?;
        Ok(())
    }

    /// Load a checkpoint into the policy
    ///
    /// Returns `Ok(None)` when no checkpoint exists under the tag. A partial
    /// checkpoint (some files present, others missing or unreadable) is an
    /// error, not a silent fresh start.
    pub fn load(&self, tag: &CheckpointTag, policy: &mut ActorCritic) -> Result<Option<CheckpointMeta>> {
        let actor_path = self.actor_path(tag);
        if !actor_path.exists() {
            return Ok(None);
        }

        policy
            .load_actor(&actor_path)
            .with_context(|| format!("failed to load actor for checkpoint '{tag}'"))?;
        policy
            .load_critic(self.critic_path(tag))
            .with_context(|| format!("failed to load critic for checkpoint '{tag}'"))?;

        let json = std::fs::read_to_string(self.meta_path(tag))
            .with_context(|| format!("failed to read metadata for checkpoint '{tag}'"))?;
        let meta: CheckpointMeta = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse metadata for checkpoint '{tag}'"))?;
        Ok(Some(meta))
    }

    /// Read a checkpoint's metadata without loading any parameters
    ///
    /// Returns `Ok(None)` when no metadata exists under the tag.
    pub fn read_meta(&self, tag: &CheckpointTag) -> Result<Option<CheckpointMeta>> {
        let path = self.meta_path(tag);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read metadata for checkpoint '{tag}'"))?;
        let meta = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse metadata for checkpoint '{tag}'"))?;
        Ok(Some(meta))
    }

    /// List episode numbers with a saved snapshot, ascending
    pub fn episode_checkpoints(&self) -> Result<Vec<u64>> {
        let mut episodes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(rest) = name.strip_prefix("episode_") {
                if let Some(num) = rest.strip_suffix(".json") {
                    if let Ok(n) = num.parse() {
                        episodes.push(n);
                    }
                }
            }
        }
        episodes.sort_unstable();
        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ActorCriticConfig;

    fn meta(episode: u64) -> CheckpointMeta {
        CheckpointMeta {
            episode,
            total_steps: episode * 100,
            avg_reward: 1.5,
            saved_at: Utc::now(),
            version: crate::VERSION.to_string(),
        }
    }

    #[test]
    fn test_tag_stems() {
        assert_eq!(CheckpointTag::Best.to_string(), "best");
        assert_eq!(CheckpointTag::Latest.to_string(), "latest");
        assert_eq!(CheckpointTag::Episode(40).to_string(), "episode_40");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let policy = ActorCritic::new(ActorCriticConfig::default()).unwrap();

        manager.save(&CheckpointTag::Best, &policy, &meta(7)).unwrap();

        let mut restored = ActorCritic::new(ActorCriticConfig::default()).unwrap();
        let loaded = manager.load(&CheckpointTag::Best, &mut restored).unwrap().unwrap();
        assert_eq!(loaded.episode, 7);
        assert_eq!(loaded.total_steps, 700);
        assert_eq!(loaded.version, crate::VERSION);
    }

    #[test]
    fn test_read_meta_without_policy() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let policy = ActorCritic::new(ActorCriticConfig::default()).unwrap();

        assert!(manager.read_meta(&CheckpointTag::Best).unwrap().is_none());

        manager.save(&CheckpointTag::Best, &policy, &meta(4)).unwrap();
        let loaded = manager.read_meta(&CheckpointTag::Best).unwrap().unwrap();
        assert_eq!(loaded.episode, 4);
        assert_eq!(loaded.avg_reward, 1.5);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let mut policy = ActorCritic::new(ActorCriticConfig::default()).unwrap();

        let loaded = manager.load(&CheckpointTag::Latest, &mut policy).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_episode_listing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let policy = ActorCritic::new(ActorCriticConfig::default()).unwrap();

        for episode in [30, 10, 20] {
            manager.save(&CheckpointTag::Episode(episode), &policy, &meta(episode)).unwrap();
        }
        manager.save(&CheckpointTag::Latest, &policy, &meta(30)).unwrap();

        assert_eq!(manager.episode_checkpoints().unwrap(), vec![10, 20, 30]);
    }
}
