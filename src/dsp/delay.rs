//! Stereo ring buffer used as a feedback delay line.
//!
//! The buffer keeps a single cursor. Writes and reads address frames relative
//! to it: offset `0` is the cursor itself, negative offsets reach into the
//! past. Offsets are clamped to the capacity, so a request for a longer delay
//! than the buffer holds reads the oldest frame instead of wandering into
//! frames that were never written.

use crate::Frame;

pub struct RingBuffer {
    frames: Vec<Frame>,
    position: usize,
}

impl RingBuffer {
    /// Allocates `capacity` silent frames. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: vec![[0.0; 2]; capacity.max(1)],
            position: 0,
        }
    }

    /// A buffer long enough for `seconds` of audio at `sample_rate`.
    pub fn with_duration(sample_rate: f32, seconds: f32) -> Self {
        Self::new((sample_rate * seconds).max(1.0) as usize)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn index(&self, offset: isize) -> usize {
        let cap = self.capacity() as isize;
        let offset = offset.clamp(-cap, cap);
        (self.position as isize + offset).rem_euclid(cap) as usize
    }

    /// Store `src` starting `offset` frames from the cursor, overwriting.
    pub fn write(&mut self, src: &[Frame], offset: isize) {
        let start = self.index(offset);
        let cap = self.capacity();
        for (i, frame) in src.iter().enumerate() {
            self.frames[(start + i) % cap] = *frame;
        }
    }

    /// Mix `src` into the buffer starting `offset` frames from the cursor.
    pub fn write_adding(&mut self, src: &[Frame], offset: isize) {
        let start = self.index(offset);
        let cap = self.capacity();
        for (i, frame) in src.iter().enumerate() {
            let slot = &mut self.frames[(start + i) % cap];
            slot[0] += frame[0];
            slot[1] += frame[1];
        }
    }

    /// Copy frames starting `offset` frames from the cursor into `dst`.
    ///
    /// Fractional offsets are truncated toward zero.
    pub fn read(&self, dst: &mut [Frame], offset: f32) {
        let start = self.index(offset as isize);
        let cap = self.capacity();
        for (i, frame) in dst.iter_mut().enumerate() {
            *frame = self.frames[(start + i) % cap];
        }
    }

    /// Single-frame read, the common case inside per-sample loops.
    #[inline]
    pub fn read_frame(&self, offset: f32) -> Frame {
        self.frames[self.index(offset as isize)]
    }

    /// Advance the cursor by `frames`, wrapping at the capacity.
    #[inline]
    pub fn move_position(&mut self, frames: usize) {
        self.position = (self.position + frames) % self.capacity();
    }

    pub fn reset(&mut self) {
        self.frames.fill([0.0; 2]);
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<Frame> {
        (0..len).map(|i| [i as f32 * 0.25, -(i as f32) * 0.5]).collect()
    }

    #[test]
    fn reads_back_what_was_written() {
        let mut ring = RingBuffer::new(64);
        let input = ramp(20);
        ring.write(&input, 0);
        ring.move_position(input.len());

        let mut out = vec![[0.0; 2]; input.len()];
        ring.read(&mut out, -(input.len() as f32));
        assert_eq!(out, input);
    }

    #[test]
    fn round_trip_across_the_wrap_point() {
        let mut ring = RingBuffer::new(16);
        ring.move_position(12);
        let input = ramp(10);
        ring.write(&input, 0);
        ring.move_position(input.len());
        assert_eq!(ring.position(), 6);

        let mut out = vec![[0.0; 2]; input.len()];
        ring.read(&mut out, -10.0);
        assert_eq!(out, input);
    }

    #[test]
    fn full_capacity_round_trip() {
        let mut ring = RingBuffer::new(32);
        let input = ramp(32);
        for frame in &input {
            ring.write(std::slice::from_ref(frame), 0);
            ring.move_position(1);
        }
        let mut out = vec![[0.0; 2]; 32];
        ring.read(&mut out, -32.0);
        assert_eq!(out, input);
    }

    #[test]
    fn fractional_offsets_truncate() {
        let mut ring = RingBuffer::new(8);
        ring.write(&ramp(4), 0);
        ring.move_position(4);
        assert_eq!(ring.read_frame(-2.9), ring.read_frame(-2.0));
    }

    #[test]
    fn oversized_offsets_are_clamped() {
        let mut ring = RingBuffer::new(8);
        ring.write(&ramp(8), 0);
        ring.move_position(3);
        assert_eq!(ring.read_frame(-1000.0), ring.read_frame(-8.0));
        assert_eq!(ring.read_frame(1000.0), ring.read_frame(8.0));
    }

    #[test]
    fn reset_silences_every_offset() {
        let mut ring = RingBuffer::new(16);
        ring.write(&ramp(16), 0);
        ring.move_position(5);
        ring.reset();
        assert_eq!(ring.position(), 0);

        let mut ahead = vec![[1.0; 2]; 8];
        ring.read(&mut ahead, 3.0);
        let mut behind = vec![[1.0; 2]; 8];
        ring.read(&mut behind, -8.0);
        assert!(ahead.iter().chain(&behind).all(|f| *f == [0.0; 2]));
        assert_eq!(ring.read_frame(-1.0), [0.0; 2]);
    }

    #[test]
    fn write_adding_mixes() {
        let mut ring = RingBuffer::new(4);
        ring.write(&[[1.0, 2.0]], 1);
        ring.write_adding(&[[0.5, 0.5]], 1);
        assert_eq!(ring.read_frame(1.0), [1.5, 2.5]);
    }
}
