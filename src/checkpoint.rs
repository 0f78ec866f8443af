use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Snapshot handed to persistence on each save interval: θ plus run position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<N> {
    pub trial: u64,
    /// Number of episodes completed when the snapshot was taken
    pub episode: usize,
    pub global_step: u64,
    pub network: N,
}

/// Persistence collaborator receiving checkpoints from the episode loop
pub trait CheckpointSink<N> {
    fn save(&mut self, checkpoint: &Checkpoint<N>) -> Result<()>;
}

/// Writes each checkpoint as a bincode file under one directory
#[derive(Clone, Debug)]
pub struct FileCheckpointSink {
    dir: PathBuf,
}

impl FileCheckpointSink {
    /// Creates `dir` if it does not exist
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileCheckpointSink { dir })
    }

    pub fn path_for(&self, trial: u64, episode: usize) -> PathBuf {
        self.dir.join(format!("trial{}_episode{}.ckpt", trial, episode))
    }
}

impl<N: Serialize> CheckpointSink<N> for FileCheckpointSink {
    fn save(&mut self, checkpoint: &Checkpoint<N>) -> Result<()> {
        let path = self.path_for(checkpoint.trial, checkpoint.episode);
        let serialized = bincode::serialize(checkpoint)?;
        fs::write(&path, serialized)?;
        info!(path = %path.display(), episode = checkpoint.episode, "checkpoint written");
        Ok(())
    }
}

/// Keeps checkpoints in memory
#[derive(Clone, Debug)]
pub struct MemorySink<N> {
    pub checkpoints: Vec<Checkpoint<N>>,
}

impl<N> MemorySink<N> {
    pub fn new() -> Self {
        MemorySink { checkpoints: Vec::new() }
    }
}

impl<N> Default for MemorySink<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> CheckpointSink<N> for MemorySink<N> {
    fn save(&mut self, checkpoint: &Checkpoint<N>) -> Result<()> {
        self.checkpoints.push(checkpoint.clone());
        Ok(())
    }
}

/// Read a checkpoint written by [`FileCheckpointSink`]
pub fn load_checkpoint<N: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Checkpoint<N>> {
    let data = fs::read(path)?;
    Ok(bincode::deserialize(&data)?)
}
