//! Batch facade: dispatches independent tiles sequentially or across a
//! scoped worker pool.

use rayon::prelude::*;

use crate::config::CodecConfig;
use crate::error::EbcotError;
use crate::framing::Token;
use crate::image::Tile;
use crate::tile_coder::{decode_tile, encode_tile};

/// EBCOT Tier-1 batch codec.
///
/// Tiles are pure with respect to each other: results preserve input order
/// and are byte-identical whether a batch runs sequentially or on a pool.
#[derive(Debug, Clone)]
pub struct EbcotCodec {
    config: CodecConfig,
}

impl EbcotCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Magnitude bit budget derived from the configured marker.
    pub fn k_max(&self) -> u8 {
        self.config.k_max()
    }

    /// Encode a batch of tiles into framed token sequences.
    pub fn encode(&self, tiles: &[Tile]) -> Result<Vec<Vec<Token>>, EbcotError> {
        log::debug!(
            "encoding {} tile(s) at depth {}",
            tiles.len(),
            self.config.depth
        );
        let depth = self.config.depth;
        self.dispatch(tiles, move |tile| encode_tile(tile, depth))
    }

    /// Decode a batch of framed token sequences back into tiles.
    pub fn decode(&self, codestreams: &[Vec<Token>]) -> Result<Vec<Tile>, EbcotError> {
        log::debug!(
            "decoding {} codestream(s) at depth {}",
            codestreams.len(),
            self.config.depth
        );
        let depth = self.config.depth;
        self.dispatch(codestreams, move |tokens| decode_tile(tokens, depth))
    }

    // Run `job` over every item, on a bounded pool when the batch is large
    // enough and acceleration was requested. The pool lives for the
    // duration of one batch call.
    fn dispatch<I, O, F>(&self, items: &[I], job: F) -> Result<Vec<O>, EbcotError>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> Result<O, EbcotError> + Sync,
    {
        if self.config.accelerated && items.len() >= self.config.min_task_number {
            let workers = items.len().min(self.config.max_pool_size).max(1);
            log::debug!("dispatching {} task(s) across {} worker(s)", items.len(), workers);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|_| EbcotError::WorkerPool)?;
            pool.install(|| items.par_iter().map(&job).collect())
        } else {
            items.iter().map(&job).collect()
        }
    }
}

impl Default for EbcotCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}
