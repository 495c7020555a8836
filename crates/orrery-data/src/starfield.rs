//! Binary starfield format consumed by the engine
//!
//! Layout (little-endian, no padding):
//! `"STAR"`, i32 version, i32 count, then per star
//! f32 dir_x, f32 dir_y, f32 dir_z, f32 magnitude, u32 ARGB.

use std::io::{Read, Write};
use std::path::Path;
use anyhow::{Context, Result};

use crate::error::StarfieldError;

pub const STARFIELD_MAGIC: &[u8; 4] = b"STAR";
pub const STARFIELD_VERSION: i32 = 1;
pub const HEADER_SIZE: usize = 12;
pub const RECORD_SIZE: usize = 20;

/// One engine-ready star
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompiledStar {
    /// Unit direction in engine axes
    pub direction: [f32; 3],
    /// Apparent magnitude (lower = brighter)
    pub magnitude: f32,
    /// Packed 0xAARRGGBB
    pub color: u32,
}

impl CompiledStar {
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let [x, y, z] = self.direction;
        out[0..4].copy_from_slice(&x.to_le_bytes());
        out[4..8].copy_from_slice(&y.to_le_bytes());
        out[8..12].copy_from_slice(&z.to_le_bytes());
        out[12..16].copy_from_slice(&self.magnitude.to_le_bytes());
        out[16..20].copy_from_slice(&self.color.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Self {
            direction: [
                f32::from_le_bytes(word(0)),
                f32::from_le_bytes(word(4)),
                f32::from_le_bytes(word(8)),
            ],
            magnitude: f32::from_le_bytes(word(12)),
            color: u32::from_le_bytes(word(16)),
        }
    }
}

/// Ordered list of compiled stars (brightest first)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Starfield {
    pub version: i32,
    pub stars: Vec<CompiledStar>,
}

impl Starfield {
    pub fn new(stars: Vec<CompiledStar>) -> Self {
        Self { version: STARFIELD_VERSION, stars }
    }

    pub fn len(&self) -> usize { self.stars.len() }
    pub fn is_empty(&self) -> bool { self.stars.is_empty() }

    /// Size of the encoded file in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.stars.len() * RECORD_SIZE
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), StarfieldError> {
        let count = i32::try_from(self.stars.len())
            .map_err(|_| StarfieldError::TooManyStars(self.stars.len()))?;

        writer.write_all(STARFIELD_MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&count.to_le_bytes())?;
        for star in &self.stars {
            writer.write_all(&star.to_bytes())?;
        }
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self, StarfieldError> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let magic = [header[0], header[1], header[2], header[3]];
        if &magic != STARFIELD_MAGIC {
            return Err(StarfieldError::BadMagic(magic));
        }

        let version = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != STARFIELD_VERSION {
            return Err(StarfieldError::UnsupportedVersion(version));
        }

        let count = i32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        let count = usize::try_from(count).map_err(|_| StarfieldError::InvalidCount(count))?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        let expected = count * RECORD_SIZE;
        if payload.len() != expected {
            return Err(StarfieldError::LengthMismatch { expected, found: payload.len() });
        }

        let stars = payload
            .chunks_exact(RECORD_SIZE)
            .map(|chunk| <&[u8; RECORD_SIZE]>::try_from(chunk).map(CompiledStar::from_bytes))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StarfieldError::LengthMismatch { expected, found: payload.len() })?;
        Ok(Self { version, stars })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create starfield: {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        self.serialize(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open starfield: {}", path.display()))?;
        let mut reader = std::io::BufReader::new(file);
        Self::deserialize(&mut reader)
            .with_context(|| format!("Failed to decode starfield: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Starfield {
        Starfield::new(vec![
            CompiledStar { direction: [0.6, 0.0, 0.8], magnitude: -1.46, color: 0xFFCA_D8FF },
            CompiledStar { direction: [-1.0, 0.0, 0.0], magnitude: 0.03, color: 0xFFFF_F4EA },
            CompiledStar { direction: [0.0, 0.28, -0.96], magnitude: 8.99, color: 0xFFFF_A651 },
        ])
    }

    #[test]
    fn test_header_layout() {
        let mut bytes = Vec::new();
        sample().serialize(&mut bytes).unwrap();

        assert_eq!(&bytes[0..4], b"STAR");
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3i32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_SIZE + 3 * RECORD_SIZE);
        assert_eq!(bytes.len(), sample().encoded_len());
    }

    #[test]
    fn test_record_layout_is_little_endian() {
        let star = CompiledStar { direction: [1.0, 0.0, 0.0], magnitude: 2.5, color: 0xFF11_2233 };
        let bytes = star.to_bytes();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2.5f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &[0x33, 0x22, 0x11, 0xFF]);
    }

    #[test]
    fn test_record_decodes_from_fixed_block() {
        let star = CompiledStar { direction: [0.0, -1.0, 0.0], magnitude: -0.74, color: 0xFFFF_EEDD };
        assert_eq!(CompiledStar::from_bytes(&star.to_bytes()), star);
    }

    #[test]
    fn test_decode_recovers_everything() {
        let original = sample();
        let mut bytes = Vec::new();
        original.serialize(&mut bytes).unwrap();

        let decoded = Starfield::deserialize(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_starfield() {
        let mut bytes = Vec::new();
        Starfield::new(Vec::new()).serialize(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let decoded = Starfield::deserialize(&mut bytes.as_slice()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Vec::new();
        sample().serialize(&mut bytes).unwrap();
        bytes[0..4].copy_from_slice(b"RATS");

        let err = Starfield::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StarfieldError::BadMagic(m) if &m == b"RATS"));
    }

    #[test]
    fn test_unknown_version() {
        let mut bytes = Vec::new();
        sample().serialize(&mut bytes).unwrap();
        bytes[4..8].copy_from_slice(&2i32.to_le_bytes());

        let err = Starfield::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StarfieldError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = Vec::new();
        sample().serialize(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 7);

        let err = Starfield::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StarfieldError::LengthMismatch { expected: 60, found: 53 }));
    }

    #[test]
    fn test_negative_count() {
        let mut bytes = Vec::new();
        Starfield::new(Vec::new()).serialize(&mut bytes).unwrap();
        bytes[8..12].copy_from_slice(&(-4i32).to_le_bytes());

        let err = Starfield::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StarfieldError::InvalidCount(-4)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stars.bin");
        sample().save(&path).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, sample().encoded_len());
        assert_eq!(Starfield::load(&path).unwrap(), sample());
    }
}
