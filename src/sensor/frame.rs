//! Raw RGB frames, PPM codec, brightness metric

use crate::error::{Error, Result};

/// A packed RGB24 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap packed RGB24 pixel data
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = raster_len(width, height).ok_or_else(|| {
            Error::SensorUnavailable(format!("frame dimensions {width}x{height} overflow"))
        })?;
        if data.len() != expected {
            return Err(Error::SensorUnavailable(format!(
                "frame is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one colour
    #[cfg(test)]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let len = raster_len(width, height).expect("test frame dimensions overflow");
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Mean of the HSV value channel, in `[0, 255]`
    ///
    /// V is the per-pixel maximum of the three channels, so the result
    /// does not depend on RGB vs BGR ordering.
    pub fn brightness(&self) -> f32 {
        let pixels = self.data.len() / 3;
        if pixels == 0 {
            return 0.0;
        }
        let total: u64 = self
            .data
            .chunks_exact(3)
            .map(|px| u64::from(px[0].max(px[1]).max(px[2])))
            .sum();
        (total as f64 / pixels as f64) as f32
    }

    /// Decode a binary PPM (`P6`, maxval 255)
    pub fn from_ppm(bytes: &[u8]) -> Result<Self> {
        let mut header = PpmHeader { bytes, pos: 0 };

        if header.token()? != "P6" {
            return Err(invalid("not a binary PPM"));
        }
        let width: u32 = header.number()?;
        let height: u32 = header.number()?;
        let maxval: u32 = header.number()?;
        if maxval != 255 {
            return Err(invalid(&format!("unsupported maxval {maxval}")));
        }

        // exactly one whitespace byte separates the header from the raster
        let start = header.pos + 1;
        let end = raster_len(width, height)
            .and_then(|len| start.checked_add(len))
            .ok_or_else(|| invalid("dimensions overflow"))?;
        let raster = bytes
            .get(start..end)
            .ok_or_else(|| invalid("truncated raster"))?;

        Self::new(width, height, raster.to_vec())
    }

    /// Encode as a binary PPM
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }
}

/// Byte length of a packed RGB24 raster, `None` on overflow
fn raster_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(3)
}

fn invalid(reason: &str) -> Error {
    Error::SensorUnavailable(format!("invalid PPM: {reason}"))
}

struct PpmHeader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl PpmHeader<'_> {
    fn skip_space_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Result<String> {
        self.skip_space_and_comments();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(invalid("truncated header"));
        }
        Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    fn number(&mut self) -> Result<u32> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| invalid(&format!("bad header field {token:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_uses_value_channel() {
        // pure red has V = 255 even though the RGB mean is 85
        let red = Frame::filled(4, 4, [255, 0, 0]);
        assert_eq!(red.brightness(), 255.0);

        let grey = Frame::filled(4, 4, [30, 30, 30]);
        assert_eq!(grey.brightness(), 30.0);
    }

    #[test]
    fn test_brightness_mixed() {
        let frame = Frame::new(2, 1, vec![0, 0, 100, 20, 10, 0]).unwrap();
        assert_eq!(frame.brightness(), 60.0);
    }

    #[test]
    fn test_empty_frame_brightness() {
        let frame = Frame::new(0, 0, vec![]).unwrap();
        assert_eq!(frame.brightness(), 0.0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(Frame::new(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn test_ppm_decode_with_comment() {
        let mut bytes = b"P6\n# captured by fswebcam\n2 1\n255\n".to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6]);

        let frame = Frame::from_ppm(&bytes).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.pixel(1, 0), Some([4, 5, 6]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_ppm_encode_decode() {
        let frame = Frame::new(1, 2, vec![9, 8, 7, 6, 5, 4]).unwrap();
        assert_eq!(Frame::from_ppm(&frame.to_ppm()).unwrap(), frame);
    }

    #[test]
    fn test_ppm_rejects_bad_input() {
        assert!(Frame::from_ppm(b"P3\n1 1\n255\n0 0 0").is_err());
        assert!(Frame::from_ppm(b"P6\n2 2\n255\n\x00\x00").is_err());
        assert!(Frame::from_ppm(b"P6\n1 1\n65535\n\x00\x00\x00\x00\x00\x00").is_err());
        assert!(Frame::from_ppm(b"").is_err());
    }

    #[test]
    fn test_ppm_oversized_header_is_error() {
        let result = Frame::from_ppm(b"P6\n4294967295 4294967295\n255\n\x00\x00\x00");
        assert!(matches!(result, Err(Error::SensorUnavailable(_))));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        assert!(Frame::new(u32::MAX, u32::MAX, vec![]).is_err());
        assert!(Frame::new(u32::MAX, 2, vec![0; 6]).is_err());
    }
}
