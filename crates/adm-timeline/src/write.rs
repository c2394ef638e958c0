//! Write-side cursor: compacts a stream of parameter updates into block
//! formats.
//!
//! ```text
//!   Idle ──set_position──▶ Open ──set_position (same params)──▶ Open
//!                           │  ──set_position (new params)───▶ emit block, Open
//!                           │  ──seek──▶ Open
//!   Idle/Open ──end_position_changes──▶ Closed (emit pending block)
//! ```
//!
//! Every emitted block is appended to all registered channel formats, so a
//! single cursor describes several co-moving objects. Channels are registered
//! while the cursor is idle; every channel is checked before a block is
//! appended to any of them.

use adm_model::{AdmGraph, BlockFormat, BlockParams, Handle, Kind, Nanos};

use crate::error::{CursorError, Result};

/// The block being accumulated while the cursor is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub start: Nanos,
    pub params: BlockParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CursorState {
    /// No update seen since creation.
    Idle,
    /// A candidate block is pending.
    Open(Candidate),
    /// `end_position_changes` was called.
    Closed,
}

#[derive(Debug, Clone)]
pub struct WriteCursor {
    state: CursorState,
    now: Nanos,
    channels: Vec<Handle>,
    emitted: usize,
}

impl Default for WriteCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteCursor {
    pub fn new() -> Self {
        Self {
            state: CursorState::Idle,
            now: 0,
            channels: Vec::new(),
            emitted: 0,
        }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// The latest time passed to `set_position` or `seek`.
    pub fn now(&self) -> Nanos {
        self.now
    }

    pub fn channels(&self) -> &[Handle] {
        &self.channels
    }

    /// Number of blocks closed so far (per channel).
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// # Errors
    ///
    /// [`CursorError::AlreadyWriting`] once `set_position` has been called,
    /// [`CursorError::Closed`] after `end_position_changes`.
    pub fn register_channel(&mut self, graph: &AdmGraph, channel: Handle) -> Result<()> {
        self.ensure_idle()?;
        graph.get_kind(channel, Kind::ChannelFormat)?;
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
        Ok(())
    }

    /// Register the channel formats carried by `track`.
    pub fn register_track(&mut self, graph: &AdmGraph, track: Handle) -> Result<()> {
        self.register_all(graph, graph.channels_for_track(track)?)
    }

    /// Register the channel formats under `object`'s pack and its children.
    pub fn register_object(&mut self, graph: &AdmGraph, object: Handle) -> Result<()> {
        self.register_all(graph, graph.channels_for_object(object)?)
    }

    fn register_all(&mut self, graph: &AdmGraph, channels: Vec<Handle>) -> Result<()> {
        self.ensure_idle()?;
        if channels.is_empty() {
            return Err(CursorError::NoChannels);
        }
        for channel in channels {
            self.register_channel(graph, channel)?;
        }
        Ok(())
    }

    /// Record that `params` apply from time `t`.
    ///
    /// Unchanged parameters extend the pending block. Changed parameters
    /// close it at `t` and open a new one; if the pending block also started
    /// at `t` its parameters are replaced instead.
    pub fn set_position(&mut self, graph: &mut AdmGraph, t: Nanos, params: BlockParams) -> Result<()> {
        self.ensure_writable()?;
        if self.channels.is_empty() {
            return Err(CursorError::NoChannels);
        }
        self.check_forward(t)?;
        params.validate()?;

        let state = self.state;
        self.state = match state {
            CursorState::Idle => CursorState::Open(Candidate { start: t, params }),
            CursorState::Open(candidate) if candidate.params == params => {
                CursorState::Open(candidate)
            }
            CursorState::Open(candidate) if candidate.start == t => {
                CursorState::Open(Candidate { start: t, params })
            }
            CursorState::Open(candidate) => {
                self.emit(graph, candidate, t)?;
                CursorState::Open(Candidate { start: t, params })
            }
            CursorState::Closed => return Err(CursorError::Closed),
        };
        self.now = t;
        Ok(())
    }

    /// Advance the cursor's notion of "now" without changing parameters.
    pub fn seek(&mut self, t: Nanos) -> Result<()> {
        self.ensure_writable()?;
        self.check_forward(t)?;
        self.now = t;
        Ok(())
    }

    /// Close the pending block at the current time and stop accepting
    /// writes. A pending block of zero length is dropped.
    pub fn end_position_changes(&mut self, graph: &mut AdmGraph) -> Result<()> {
        self.ensure_writable()?;
        if let CursorState::Open(candidate) = self.state {
            if self.now > candidate.start {
                self.emit(graph, candidate, self.now)?;
            } else {
                tracing::debug!(start = candidate.start, "Dropping zero-length final block");
            }
        }
        self.state = CursorState::Closed;
        tracing::debug!(
            blocks = self.emitted,
            channels = self.channels.len(),
            "Write cursor closed"
        );
        Ok(())
    }

    fn emit(&mut self, graph: &mut AdmGraph, candidate: Candidate, end: Nanos) -> Result<()> {
        let block = BlockFormat::new(candidate.start, end - candidate.start, candidate.params);
        for channel in &self.channels {
            graph.get_kind(*channel, Kind::ChannelFormat)?;
        }
        for channel in &self.channels {
            graph.create_block_format(*channel, block.clone())?;
        }
        self.emitted += 1;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            CursorState::Idle if self.emitted == 0 => Ok(()),
            CursorState::Closed => Err(CursorError::Closed),
            _ => Err(CursorError::AlreadyWriting),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.state {
            CursorState::Closed => Err(CursorError::Closed),
            _ => Ok(()),
        }
    }

    fn check_forward(&self, t: Nanos) -> Result<()> {
        if t < self.now {
            return Err(CursorError::TimeReversal { t, now: self.now });
        }
        Ok(())
    }
}
