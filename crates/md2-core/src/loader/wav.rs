//! WAV decoding into stereo clips

use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::{LoadError, LoadResult};
use crate::types::{Sample, StereoClip, StereoSample};

/// Decode a WAV file into a [`StereoClip`]
///
/// Integer samples are normalized to [-1, 1). Mono files are duplicated to
/// both channels; files with more than two channels keep the first two.
pub fn decode_wav(path: &Path) -> LoadResult<StereoClip> {
    let wav_error = |source| LoadError::Wav {
        path: path.to_owned(),
        source,
    };

    let reader = WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(LoadError::NoChannels(path.to_owned()));
    }

    let samples: Vec<Sample> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(LoadError::UnsupportedFormat {
                    path: path.to_owned(),
                    bits: spec.bits_per_sample,
                    format: "int",
                });
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let channels = spec.channels as usize;
    let frames = samples
        .chunks_exact(channels)
        .map(|frame| match frame {
            [mono] => StereoSample::mono(*mono),
            [left, right, ..] => StereoSample::new(*left, *right),
            [] => StereoSample::silence(),
        })
        .collect();

    log::debug!(
        "Decoded {:?}: {} channels, {} Hz, {}-bit",
        path,
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample
    );
    Ok(StereoClip::new(frames, spec.sample_rate))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::TempDir;

    /// Write a 16-bit integer WAV with the given interleaved samples
    pub(crate) fn write_int_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_stereo_int() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_int_wav(&path, 2, &[16384, -16384, 0, 8192]);

        let clip = decode_wav(&path).unwrap();
        assert_eq!(clip.sample_rate(), 44100);
        assert_eq!(
            clip.frames(),
            &[StereoSample::new(0.5, -0.5), StereoSample::new(0.0, 0.25)]
        );
    }

    #[test]
    fn test_decode_mono_duplicates_channel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mono.wav");
        write_int_wav(&path, 1, &[16384, -8192, 0]);

        let clip = decode_wav(&path).unwrap();
        assert_eq!(clip.len(), 3);
        assert_eq!(clip.frames()[0], StereoSample::mono(0.5));
        assert_eq!(clip.frames()[1], StereoSample::mono(-0.25));
    }

    #[test]
    fn test_decode_float() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for sample in [0.25f32, -0.75, 1.0, 0.0] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let clip = decode_wav(&path).unwrap();
        assert_eq!(clip.sample_rate(), 48000);
        assert_eq!(
            clip.frames(),
            &[StereoSample::new(0.25, -0.75), StereoSample::new(1.0, 0.0)]
        );
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();

        assert!(matches!(decode_wav(&path), Err(LoadError::Wav { .. })));
    }

    #[test]
    fn test_decode_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(decode_wav(&dir.path().join("missing.wav")).is_err());
    }
}
