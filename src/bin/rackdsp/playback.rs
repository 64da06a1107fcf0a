//! Play a pre-rendered buffer on the default output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use rackdsp::Frame;

/// Sample rate of the default output device, so the render can match it.
pub fn device_sample_rate() -> EyreResult<u32> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    Ok(config.sample_rate().0)
}

/// The output callback only writes `f32` samples.
fn require_f32(format: cpal::SampleFormat) -> EyreResult<()> {
    if format != cpal::SampleFormat::F32 {
        return Err(eyre!(
            "default output device uses {format:?} samples; playback needs f32"
        ));
    }
    Ok(())
}

/// Block until `frames` has played through.
pub fn play(frames: Vec<Frame>) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    require_f32(config.sample_format())?;
    let channels = config.channels() as usize;

    info!(
        sample_rate = config.sample_rate().0,
        channels,
        frames = frames.len(),
        "starting playback"
    );

    let done = Arc::new(AtomicBool::new(false));
    let done_cb = Arc::clone(&done);
    let mut position = 0usize;

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            for out in data.chunks_mut(channels) {
                let frame = frames.get(position).copied().unwrap_or([0.0; 2]);
                // Mono devices get the left channel; extra channels stay silent.
                for (ch, sample) in out.iter_mut().enumerate() {
                    *sample = if ch < 2 { frame[ch] } else { 0.0 };
                }
                position += 1;
            }
            if position >= frames.len() {
                done_cb.store(true, Ordering::Release);
            }
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;

    stream.play()?;
    while !done.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(50));
    }
    // Let the device drain its last buffer.
    std::thread::sleep(Duration::from_millis(100));
    Ok(())
}
