use bytes::{BufMut, Bytes, BytesMut};

const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;

/// Encodes mono `f32` samples in `-1.0..=1.0` as a 16-bit PCM WAV file.
pub fn encode_wav(sample_rate: u32, samples: &[f32]) -> Bytes {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let data_len = (samples.len() * usize::from(block_align)) as u32;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + data_len as usize);

    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1); // PCM
    buf.put_u16_le(CHANNELS);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(sample_rate * u32::from(block_align));
    buf.put_u16_le(block_align);
    buf.put_u16_le(BITS_PER_SAMPLE);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    for sample in samples {
        let clamped = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        buf.put_i16_le((clamped * f32::from(i16::MAX)) as i16);
    }

    buf.freeze()
}
