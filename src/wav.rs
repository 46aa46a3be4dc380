//! WAV file writer
//!
//! 16-bit PCM, mono. The sample rate only goes into the header.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const HEADER_LEN: u32 = 44;

/// Convert one sample in [-1.0, 1.0] to i16, clamping anything outside
fn to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        // -1.0 maps to i16::MIN
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Encode samples as a complete WAV file image
pub fn encode_wav_16bit<W: Write>(out: &mut W, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = samples.len() as u32 * block_align as u32;

    // RIFF chunk
    out.write_all(b"RIFF")?;
    out.write_all(&(HEADER_LEN - 8 + data_size).to_le_bytes())?;
    out.write_all(b"WAVE")?;

    // fmt subchunk
    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // PCM
    out.write_all(&num_channels.to_le_bytes())?;
    out.write_all(&sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&block_align.to_le_bytes())?;
    out.write_all(&bits_per_sample.to_le_bytes())?;

    // data subchunk
    out.write_all(b"data")?;
    out.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        out.write_all(&to_i16(sample).to_le_bytes())?;
    }

    Ok(())
}

/// Write a 16-bit PCM WAV file
///
/// # Example
/// ```
/// use keypiano::wav::write_wav_16bit;
///
/// let path = std::env::temp_dir().join("keypiano_doc_silence.wav");
/// let samples = vec![0.0f32; 8000]; // 1 second of silence at 8kHz
/// write_wav_16bit(&path, &samples, 8000).unwrap();
/// # std::fs::remove_file(&path).unwrap();
/// ```
pub fn write_wav_16bit(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    encode_wav_16bit(&mut writer, samples, sample_rate)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let mut data = Vec::new();
        encode_wav_16bit(&mut data, samples, sample_rate).unwrap();
        data
    }

    #[test]
    fn test_header() {
        let data = encode(&[1.0, -1.0, 0.5, -0.5, 0.0], 16000);

        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(&data[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([data[20], data[21]]), 1); // PCM
        assert_eq!(u16::from_le_bytes([data[22], data[23]]), 1); // mono
        assert_eq!(
            u32::from_le_bytes([data[24], data[25], data[26], data[27]]),
            16000
        );
        assert_eq!(&data[36..40], b"data");
    }

    #[test]
    fn test_sizes() {
        let data = encode(&[0.0; 1000], 8000);
        let data_size = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        let riff_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        assert_eq!(data_size, 2000);
        assert_eq!(riff_size, 36 + data_size);
        assert_eq!(data.len(), 44 + 2000);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), i16::MIN);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), i16::MIN);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn test_write_file() {
        let path = std::env::temp_dir().join("keypiano_wav_test.wav");
        write_wav_16bit(&path, &[0.25; 10], 8000).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 64);
        assert_eq!(i16::from_le_bytes([data[44], data[45]]), 8191);
        std::fs::remove_file(&path).unwrap();
    }
}
