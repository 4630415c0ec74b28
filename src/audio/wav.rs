//! WAV file reader and writer.
//!
//! Audio is stored as 32-bit float PCM, so writing and reading back is
//! lossless.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{GeneratorError, Result};
use crate::types::AudioTensor;

/// Bit depth of written files.
pub const BITS_PER_SAMPLE: u16 = 32;

fn wav_spec(audio: &AudioTensor, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: audio.num_channels(),
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Float,
    }
}

/// Writes audio to a WAV file, replacing any existing file at `path`.
///
/// # Example
///
/// ```ignore
/// use music_generator::audio::write_wav;
/// use music_generator::types::AudioTensor;
///
/// let audio = AudioTensor::mono(vec![0.0, 0.5, -0.5, 0.0]);
/// write_wav(&audio, Path::new("/tmp/test.wav"), 32000)?;
/// ```
pub fn write_wav(audio: &AudioTensor, path: &Path, sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_spec(audio, sample_rate))
        .map_err(|e| GeneratorError::audio_io(path, e))?;

    for sample in audio.interleaved() {
        writer
            .write_sample(sample)
            .map_err(|e| GeneratorError::audio_io(path, e))?;
    }

    writer
        .finalize()
        .map_err(|e| GeneratorError::audio_io(path, e))
}

/// Writes audio to an in-memory WAV buffer and returns its bytes.
pub fn write_wav_to_buffer(audio: &AudioTensor, sample_rate: u32) -> Result<Vec<u8>> {
    let memory = Path::new("<memory>");
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec(audio, sample_rate))
            .map_err(|e| GeneratorError::audio_io(memory, e))?;
        for sample in audio.interleaved() {
            writer
                .write_sample(sample)
                .map_err(|e| GeneratorError::audio_io(memory, e))?;
        }
        writer
            .finalize()
            .map_err(|e| GeneratorError::audio_io(memory, e))?;
    }
    Ok(cursor.into_inner())
}

/// Reads a WAV file back into an [`AudioTensor`] and its sample rate.
///
/// Integer files are scaled into `[-1, 1]`.
pub fn read_wav(path: &Path) -> Result<(AudioTensor, u32)> {
    let reader = WavReader::open(path).map_err(|e| GeneratorError::audio_io(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| GeneratorError::audio_io(path, e))?,
        SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| GeneratorError::audio_io(path, e))?
        }
    };

    let audio = AudioTensor::from_interleaved(&samples, spec.channels)?;
    Ok((audio, spec.sample_rate))
}

/// Calculates the duration of audio in seconds from a per-channel sample count.
pub fn samples_to_duration(sample_count: usize, sample_rate: u32) -> f32 {
    sample_count as f32 / sample_rate as f32
}
