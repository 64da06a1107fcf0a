//! Stereo frame mixing, level measurement and buffer hygiene.

/*
Wet / Dry
=========

Effects blend their processed signal with the untouched input:

    out = dry · input + wet · processed

The effect's wet/dry knob runs from -1 to 1:

    wet = knob
    dry = 1 - |knob|

      knob   wet    dry
     -1.0   -1.0    0.0   fully processed, polarity flipped
      0.0    0.0    1.0   bypass
      0.5    0.5    0.5   even blend
      1.0    1.0    0.0   fully processed

Negative settings are useful for null tests: at -0.5 an effect that changes
nothing cancels itself out completely.


Mean Square
-----------

The effect gate compares the period's mean squared output against its
threshold. Both channels count, so a full-scale stereo sine reads as 1.0:

    mean_square = Σ (l² + r²) / frames
*/

use crate::Frame;

/// Split a wet/dry knob value in `[-1, 1]` into `(dry, wet)` gains.
#[inline]
pub fn dry_wet_levels(knob: f32) -> (f32, f32) {
    let wet = knob.clamp(-1.0, 1.0);
    (1.0 - wet.abs(), wet)
}

/// `dry · input + wet · processed` for one frame.
#[inline]
pub fn blend_frame(input: Frame, processed: Frame, dry: f32, wet: f32) -> Frame {
    [
        dry * input[0] + wet * processed[0],
        dry * input[1] + wet * processed[1],
    ]
}

/// Sum of `l² + r²` over the buffer divided by its length.
pub fn mean_square(buffer: &[Frame]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum: f64 = buffer
        .iter()
        .map(|f| (f[0] as f64) * (f[0] as f64) + (f[1] as f64) * (f[1] as f64))
        .sum();
    (sum / buffer.len() as f64) as f32
}

/// True when any sample in the buffer is audible at all.
pub fn has_signal(buffer: &[Frame]) -> bool {
    buffer.iter().any(|f| f[0] != 0.0 || f[1] != 0.0)
}

/// Replace NaN and infinite samples with silence. Returns how many were fixed.
pub fn sanitize(buffer: &mut [Frame]) -> usize {
    let mut fixed = 0;
    for frame in buffer.iter_mut() {
        for sample in frame.iter_mut() {
            if !sample.is_finite() {
                *sample = 0.0;
                fixed += 1;
            }
        }
    }
    fixed
}

/// Add `src` into `dst` frame by frame.
#[inline]
pub fn sum_in_place(dst: &mut [Frame], src: &[Frame]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        d[0] += s[0];
        d[1] += s[1];
    }
}

pub fn clear(buffer: &mut [Frame]) {
    buffer.fill([0.0; 2]);
}
