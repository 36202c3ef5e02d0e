//! Channel mapping and sample-rate conversion to the output device format.

use crate::error::{KioskError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Converts interleaved audio from `from` channels to `to` channels.
///
/// Mono is duplicated to every output channel; anything wider folded to mono
/// is averaged; otherwise extra source channels are dropped and missing ones
/// are silent.
pub fn remix(input: &[f32], from: u16, to: u16) -> Vec<f32> {
    let (from, to) = (from.max(1) as usize, to.max(1) as usize);
    if from == to {
        return input.to_vec();
    }

    let frames = input.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in input.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|c| frame.get(c).copied().unwrap_or(0.0)));
        }
    }
    out
}

/// Resamples interleaved audio from `input_rate` to `output_rate`.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32, channels: u16) -> Result<Vec<f32>> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    debug!("Resampling {}Hz -> {}Hz ({} channels)", input_rate, output_rate, channels);

    let planar = deinterleave(input, channels);
    let frames = planar[0].len();
    if frames == 0 {
        return Ok(Vec::new());
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        frames,
        planar.len(),
    )
    .map_err(|e| KioskError::Decode(format!("resampler: {}", e)))?;

    let expected = (frames as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();

    let mut planar_out = resampler
        .process(&planar, None)
        .map_err(|e| KioskError::Decode(format!("resampling: {}", e)))?;
    // Drain the filter with silence so the tail is not cut by the output delay.
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| KioskError::Decode(format!("resampling: {}", e)))?;

    for (channel, rest) in planar_out.iter_mut().zip(tail) {
        channel.extend(rest);
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected);
    }

    Ok(interleave(&planar_out))
}

fn deinterleave(input: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let channels = channels.max(1) as usize;
    let mut planar = vec![Vec::with_capacity(input.len() / channels); channels];
    for frame in input.chunks_exact(channels) {
        for (c, sample) in frame.iter().enumerate() {
            planar[c].push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            out.push(channel[i]);
        }
    }
    out
}
