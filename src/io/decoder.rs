//! Audio decoding using Symphonia
//!
//! Files are decoded to interleaved `f32`, downmixed to mono and resampled
//! to the analysis rate with a sinc resampler.

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix;

/// Loads a file into a mono waveform
pub trait AudioLoader: Send + Sync {
    /// Decode `path` into mono samples and their sample rate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DecodingError` if the file cannot be read or decoded
    fn load(&self, path: &Path) -> Result<(Vec<f32>, u32), AnalysisError>;
}

impl<T: AudioLoader + ?Sized> AudioLoader for std::sync::Arc<T> {
    fn load(&self, path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
        (**self).load(path)
    }
}

/// Symphonia-backed loader with optional resampling
#[derive(Debug, Clone)]
pub struct SymphoniaLoader {
    target_sample_rate: Option<u32>,
}

impl SymphoniaLoader {
    /// Loader that resamples everything to `target_sample_rate`
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(target_sample_rate),
        }
    }

    /// Loader that keeps the native sample rate of every file
    pub fn native() -> Self {
        Self {
            target_sample_rate: None,
        }
    }
}

impl AudioLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
        let (samples, sample_rate) = decode_audio(path)?;
        match self.target_sample_rate {
            Some(target) if target != sample_rate => {
                let resampled = resample(&samples, sample_rate, target)?;
                Ok((resampled, target))
            }
            _ => Ok((samples, sample_rate)),
        }
    }
}

/// Decode audio file to mono PCM samples
///
/// # Returns
///
/// Tuple of (samples, sample_rate)
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, has no
/// audio track, or yields no samples
pub fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::DecodingError(format!("{}: no supported audio track", path.display()))
        })?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AnalysisError::DecodingError(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupted packet
                log::debug!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                return Err(AnalysisError::DecodingError(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let spec = *decoded.spec();
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }
        let channels = spec.channels.count();

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        mono.extend(downmix(buffer.samples(), channels)?);
    }

    if mono.is_empty() || sample_rate == 0 {
        return Err(AnalysisError::DecodingError(format!(
            "{}: no audio samples decoded",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {} samples at {} Hz ({:.2}s)",
        mono.len(),
        sample_rate,
        mono.len() as f32 / sample_rate as f32
    );

    Ok((mono, sample_rate))
}

/// Resample a mono signal with a windowed-sinc interpolator
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the resampler rejects the ratio
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid resampling rates: {} -> {}",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .map_err(|e| AnalysisError::DecodingError(format!("Resampler error: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| AnalysisError::DecodingError(format!("Resample failed: {}", e)))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail, then drop the leading delay
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| AnalysisError::DecodingError(format!("Resample flush failed: {}", e)))?;
    if let Some(channel) = tail.into_iter().next() {
        output.extend(channel);
    }
    let output: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();

    log::debug!(
        "Resampled {} Hz -> {} Hz: {} -> {} samples (delay {})",
        from_rate,
        to_rate,
        samples.len(),
        output.len(),
        delay
    );

    Ok(output)
}
