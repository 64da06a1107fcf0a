//! Offline host loop: one note through an effect chain, period by period.

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use std::path::Path;
use tracing::{debug, info};

use rackdsp::dsp::mix::{clear, has_signal};
use rackdsp::effect::EffectChain;
use rackdsp::instrument::Instrument;
use rackdsp::note::NotePlayHandle;
use rackdsp::{EngineContext, Frame};

/// Timing of the rendered note, in frames.
#[derive(Debug, Clone, Copy)]
pub struct NoteTiming {
    pub frequency: f32,
    pub total_frames: usize,
    pub release_frame: usize,
}

/// Render `timing.total_frames` frames. The key goes up at the first period
/// boundary at or after `release_frame`; once the release tail is over the
/// note is retired and only the effect tails keep sounding.
pub fn render_note<I: Instrument>(
    ctx: &EngineContext,
    instrument: &mut I,
    chain: &mut EffectChain,
    timing: NoteTiming,
) -> Vec<Frame> {
    let period = ctx.frames_per_period();
    let desired_release = instrument.desired_release_frames(ctx);

    let mut note = NotePlayHandle::new(timing.frequency);
    let mut note_alive = true;
    let mut buffer = vec![[0.0f32; 2]; period];
    let mut out = Vec::with_capacity(timing.total_frames);

    while out.len() < timing.total_frames {
        let frames = period.min(timing.total_frames - out.len());
        let block = &mut buffer[..frames];
        clear(block);

        if note_alive && !note.is_release_started() && out.len() >= timing.release_frame {
            debug!(frame = out.len(), "note released");
            note.note_off();
        }

        if note_alive {
            note.begin_period(frames, 0);
            instrument.play_note(ctx, &mut note, block);
            note.end_period();
            if note.is_finished(desired_release) {
                instrument.delete_note_plugin_data(&mut note);
                note_alive = false;
                debug!(frame = out.len() + frames, "note retired");
            }
        }

        // Effects restart only on audible input; a silent note lets them stop.
        let has_input = note_alive && has_signal(block);
        chain.process_audio_buffer(ctx, block, has_input);
        out.extend_from_slice(block);
    }

    out
}

/// Level statistics of a render.
#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub rms: f32,
    pub peak: f32,
}

impl RenderStats {
    pub fn measure(frames: &[Frame]) -> Self {
        if frames.is_empty() {
            return Self { rms: 0.0, peak: 0.0 };
        }
        let mut sum = 0.0f64;
        let mut peak = 0.0f32;
        for frame in frames {
            for &s in frame {
                sum += (s * s) as f64;
                peak = peak.max(s.abs());
            }
        }
        Self {
            rms: (sum / (frames.len() * 2) as f64).sqrt() as f32,
            peak,
        }
    }
}

/// Write a 32-bit float stereo WAV.
pub fn write_wav(path: &Path, sample_rate: u32, frames: &[Frame]) -> EyreResult<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .wrap_err_with(|| format!("failed to create {}", path.display()))?;
    for frame in frames {
        writer.write_sample(frame[0])?;
        writer.write_sample(frame[1])?;
    }
    writer.finalize().wrap_err("failed to finalize WAV file")?;

    info!(path = %path.display(), frames = frames.len(), "WAV written");
    Ok(())
}
