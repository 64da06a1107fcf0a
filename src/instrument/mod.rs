//! Per-note instruments.
//!
//! The host calls [`Instrument::play_note`] once per period for every sounding
//! note, in program order, on the audio thread. The instrument renders
//! `frames_left_for_current_period()` frames starting at `note_offset()` in
//! the working buffer. Per-note state lives inside the note handle as the
//! instrument's [`Instrument::NoteData`]; it is allocated on the first period
//! and never again.

pub mod fbsynth;
pub mod unison;

use tracing::trace;

use crate::engine::EngineContext;
use crate::note::NotePlayHandle;
use crate::params::Settings;
use crate::Frame;

pub use fbsynth::{FbSynth, FbSynthParams};
pub use unison::{UnisonOscillator, UnisonParams};

pub trait Instrument: Settings + Send {
    type NoteData: Send;

    fn name(&self) -> &'static str;

    /// Render one period of `note` into `buffer[note_offset..note_offset + frames]`.
    fn play_note(
        &mut self,
        ctx: &EngineContext,
        note: &mut NotePlayHandle<Self::NoteData>,
        buffer: &mut [Frame],
    );

    /// Tail length after release before the host may retire the note.
    fn desired_release_frames(&self, ctx: &EngineContext) -> usize;

    /// Drop the per-note state. Called once, after the tail has finished.
    fn delete_note_plugin_data(&mut self, note: &mut NotePlayHandle<Self::NoteData>) {
        if note.take_plugin_data().is_some() {
            trace!(instrument = self.name(), "per-note state released");
        }
    }
}

/// The slice of `buffer` a note renders into this period, clipped to the
/// buffer's length.
pub(crate) fn note_window<'a, D>(note: &NotePlayHandle<D>, buffer: &'a mut [Frame]) -> &'a mut [Frame] {
    let start = note.note_offset().min(buffer.len());
    let end = (start + note.frames_left_for_current_period()).min(buffer.len());
    &mut buffer[start..end]
}

/// Fade a releasing note linearly to silence over `desired_release_frames`.
///
/// Frame `f` of the period is scaled by
/// `(desired - released - f - 1) / desired`, floored at zero, so the fade
/// continues seamlessly from one period to the next.
pub fn apply_release<D>(note: &NotePlayHandle<D>, buffer: &mut [Frame], desired_release_frames: usize) {
    if !note.is_release_started() || desired_release_frames == 0 {
        return;
    }

    let desired = desired_release_frames as f32;
    let released = note.released_frames() as f32;
    for (f, frame) in note_window(note, buffer).iter_mut().enumerate() {
        let fac = ((desired - released - f as f32 - 1.0) / desired).max(0.0);
        frame[0] *= fac;
        frame[1] *= fac;
    }
}
