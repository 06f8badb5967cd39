use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::blockchain::Block;
use crate::error::NodeError;

/// Append-only flat-file block store: one block per line, serialized in
/// the same canonical JSON form used for hashing, so re-reading and
/// re-hashing reproduces the identical linkage.
///
/// The wallet ledger is never persisted; it is rebuilt by replay.
#[derive(Debug)]
pub struct BlockStore {
    path: PathBuf,
}

impl BlockStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the whole persisted chain in append order. A missing file is an
    /// empty chain (fresh node); an unparseable line is a corrupt store and
    /// must halt startup rather than proceed with unverified state.
    pub fn load_all(&self) -> Result<Vec<Block>, NodeError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut chain = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let block: Block = serde_json::from_str(&line).map_err(|e| {
                NodeError::Storage(format!(
                    "corrupt chain file {} at line {}: {e}",
                    self.path.display(),
                    n + 1
                ))
            })?;
            chain.push(block);
        }
        Ok(chain)
    }

    /// Append one block in strict chain order.
    pub fn append(&self, block: &Block) -> Result<(), NodeError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", canonical_line(block))?;
        Ok(())
    }

    /// Rewrite the whole file, used when consensus replaces the chain.
    pub fn replace_all(&self, chain: &[Block]) -> Result<(), NodeError> {
        let mut file = File::create(&self.path)?;
        for block in chain {
            writeln!(file, "{}", canonical_line(block))?;
        }
        Ok(())
    }

    /// Blocks with index >= `index`, in order.
    pub fn read_from(&self, index: u64) -> Result<Vec<Block>, NodeError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|b| b.index >= index)
            .collect())
    }

    pub fn read_by_index(&self, index: u64) -> Result<Option<Block>, NodeError> {
        Ok(self.load_all()?.into_iter().find(|b| b.index == index))
    }
}

fn canonical_line(block: &Block) -> String {
    serde_json::to_value(block)
        .expect("block serializes to JSON")
        .to_string()
}
