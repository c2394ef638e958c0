//! Read-side cursor: replays a channel's block sequence as a forward-only
//! time cursor with hold-last-value semantics.

use adm_model::{AdmGraph, BlockFormat, BlockParams, Handle, Nanos};

use crate::error::{CursorError, Result};

#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    blocks: &'a [BlockFormat],
    index: usize,
    last_seek: Option<Nanos>,
}

impl<'a> ReadCursor<'a> {
    /// A cursor over an ordered block sequence.
    pub fn new(blocks: &'a [BlockFormat]) -> Self {
        Self {
            blocks,
            index: 0,
            last_seek: None,
        }
    }

    pub fn for_channel(graph: &'a AdmGraph, channel: Handle) -> Result<Self> {
        Ok(Self::new(graph.channel_blocks(channel)?))
    }

    /// A cursor over the first channel format carried by `track`.
    pub fn for_track(graph: &'a AdmGraph, track: Handle) -> Result<Self> {
        let channel = graph
            .channels_for_track(track)?
            .into_iter()
            .next()
            .ok_or(CursorError::NoChannels)?;
        Self::for_channel(graph, channel)
    }

    /// Advance to the block covering `t`.
    ///
    /// Past the end of the sequence, or inside a gap, the most recent block
    /// is held. Before the first block there is no value.
    pub fn seek(&mut self, t: Nanos) -> Result<Option<&'a BlockFormat>> {
        if let Some(current) = self.last_seek {
            if t < current {
                return Err(CursorError::SeekBackwards { t, current });
            }
        }
        self.last_seek = Some(t);

        let blocks = self.blocks;
        while self.index + 1 < blocks.len() && blocks[self.index + 1].start <= t {
            self.index += 1;
        }
        Ok(blocks.get(self.index).filter(|b| b.start <= t))
    }

    /// Parameters in effect at `t`; see [`seek`](Self::seek).
    pub fn params_at(&mut self, t: Nanos) -> Result<Option<BlockParams>> {
        Ok(self.seek(t)?.map(|b| b.params))
    }

    /// The block at the cursor position, if the cursor has reached one.
    pub fn current(&self) -> Option<&'a BlockFormat> {
        let t = self.last_seek?;
        self.blocks.get(self.index).filter(|b| b.start <= t)
    }

    /// Restart the scan from the beginning.
    pub fn reset(&mut self) {
        self.index = 0;
        self.last_seek = None;
    }
}
