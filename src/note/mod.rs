//! Host-side handle for one sounding note.
//!
//! The handle carries everything an instrument needs to render a period of
//! the note (pitch, how many frames to produce, where in the working buffer
//! they start, whether the key is up) plus the instrument's own per-note
//! state. That state is a typed payload owned by the handle: the instrument
//! creates it lazily on the first period and it is dropped with the handle,
//! or earlier if the host asks the instrument to clean it up.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Playing,   // Key held
    Releasing, // Key released, tail still sounding
}

pub struct NotePlayHandle<D> {
    frequency: f32,
    frames: usize,
    offset: usize,
    total_frames_played: u64,
    state: NoteState,
    released_frames: u64,
    data: Option<D>,
}

impl<D> NotePlayHandle<D> {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            frames: 0,
            offset: 0,
            total_frames_played: 0,
            state: NoteState::Playing,
            released_frames: 0,
            data: None,
        }
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Pitch may move while the note sounds (bends, glides).
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Host: announce the next period. `offset` is where the note's frames
    /// start inside the working buffer (non-zero only when a note begins
    /// mid-period).
    pub fn begin_period(&mut self, frames: usize, offset: usize) {
        self.frames = frames;
        self.offset = offset;
    }

    /// Host: the period has been rendered.
    pub fn end_period(&mut self) {
        self.total_frames_played += self.frames as u64;
        if self.state == NoteState::Releasing {
            self.released_frames += self.frames as u64;
        }
        self.offset = 0;
    }

    #[inline]
    pub fn frames_left_for_current_period(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn note_offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn total_frames_played(&self) -> u64 {
        self.total_frames_played
    }

    /// Host: the key went up.
    pub fn note_off(&mut self) {
        if self.state == NoteState::Playing {
            self.state = NoteState::Releasing;
        }
    }

    #[inline]
    pub fn is_release_started(&self) -> bool {
        self.state == NoteState::Releasing
    }

    #[inline]
    pub fn released_frames(&self) -> u64 {
        self.released_frames
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    /// True once the release tail has run for `desired_release_frames`.
    pub fn is_finished(&self, desired_release_frames: usize) -> bool {
        self.state == NoteState::Releasing
            && self.released_frames >= desired_release_frames as u64
    }

    pub fn plugin_data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    pub fn plugin_data_mut(&mut self) -> Option<&mut D> {
        self.data.as_mut()
    }

    /// The per-note payload, built by `init` on first use.
    pub fn plugin_data_or_insert_with(&mut self, init: impl FnOnce() -> D) -> &mut D {
        if self.data.is_none() {
            trace!(frequency = self.frequency, "creating per-note state");
        }
        self.data.get_or_insert_with(init)
    }

    /// Detach the payload so the caller decides where it is dropped.
    pub fn take_plugin_data(&mut self) -> Option<D> {
        self.data.take()
    }
}
