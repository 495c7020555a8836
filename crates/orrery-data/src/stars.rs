//! Star catalog processing for HYG-style exports (mag, x, y, z, ci)

use orrery_core::color::color_index_to_argb;
use orrery_core::coordinates::EquatorialPosition;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use std::io::Read;
use std::path::Path;
use anyhow::{Context, Result};

use crate::config::StarfieldConfig;
use crate::starfield::CompiledStar;

/// Columns a star export must carry; `ci` is optional
pub const REQUIRED_COLUMNS: [&str; 4] = ["mag", "x", "y", "z"];

/// Raw star data from catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    /// Apparent visual magnitude
    pub mag: f64,
    /// Equatorial Cartesian position (HYG uses parsecs; only the direction matters)
    pub position: EquatorialPosition,
    /// B-V color index
    pub color_index: Option<f64>,
}

impl StarRecord {
    /// Engine direction + packed color, or `None` for a degenerate position
    pub fn compile(&self) -> Option<CompiledStar> {
        let direction = self.position.to_engine_direction()?;
        Some(CompiledStar {
            direction: direction.to_f32(),
            magnitude: self.mag as f32,
            color: color_index_to_argb(self.color_index),
        })
    }
}

/// Star catalog container
pub struct StarCatalog {
    stars: Vec<StarRecord>,
    /// Rows dropped while parsing
    skipped: usize,
}

impl StarCatalog {
    /// Load from a HYG-format CSV, gzip-compressed when the name ends in `.gz`
    pub fn load_csv(path: &Path) -> Result<Self> {
        tracing::info!("Loading star catalog from {:?}", path);

        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open star catalog: {}", path.display()))?;

        let is_gzip = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz"));
        let parsed = if is_gzip {
            Self::from_reader(flate2::read::GzDecoder::new(file))
        } else {
            Self::from_reader(file)
        };
        let catalog = parsed
            .with_context(|| format!("Failed to read star catalog: {}", path.display()))?;

        tracing::info!("Loaded {} valid stars ({} rows skipped)", catalog.len(), catalog.skipped);
        Ok(catalog)
    }

    /// Parse CSV rows; malformed rows are skipped, never fatal
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h.trim() == column) {
                anyhow::bail!("Star catalog has no '{}' column", column);
            }
        }

        let mut stars = Vec::new();
        let mut skipped = 0;

        for (row, result) in reader.deserialize::<HygCsvRecord>().enumerate() {
            match result.map(|r| r.to_star_record()) {
                Ok(Some(star)) => stars.push(star),
                Ok(None) => skipped += 1,
                Err(e) => {
                    tracing::debug!("Skipping star row {}: {}", row + 1, e);
                    skipped += 1;
                }
            }
        }

        Ok(Self { stars, skipped })
    }

    /// Create from existing records
    pub fn from_records(stars: Vec<StarRecord>) -> Self {
        Self { stars, skipped: 0 }
    }

    pub fn len(&self) -> usize { self.stars.len() }
    pub fn is_empty(&self) -> bool { self.stars.is_empty() }
    pub fn skipped(&self) -> usize { self.skipped }
    pub fn iter(&self) -> impl Iterator<Item = &StarRecord> { self.stars.iter() }

    /// Keep only stars at least as bright as the threshold
    pub fn filter_by_magnitude(self, max_mag: f64) -> Self {
        Self {
            stars: self.stars.into_iter()
                .filter(|s| s.mag <= max_mag)
                .collect(),
            skipped: self.skipped,
        }
    }

    /// Transform every star, drop degenerate ones, then keep the N brightest.
    ///
    /// The sort is stable, so equal magnitudes keep catalog order.
    pub fn compile_brightest(&self, n: usize) -> Vec<CompiledStar> {
        let mut compiled: Vec<(f64, CompiledStar)> = self.stars.par_iter()
            .filter_map(|s| s.compile().map(|c| (s.mag, c)))
            .collect();

        let degenerate = self.stars.len() - compiled.len();
        if degenerate > 0 {
            tracing::debug!("Dropped {} stars with degenerate positions", degenerate);
        }

        compiled.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        compiled.truncate(n);
        compiled.into_iter().map(|(_, star)| star).collect()
    }

    /// Full star compiler policy: magnitude ceiling, transform, rank, truncate
    pub fn compile(self, config: &StarfieldConfig) -> Vec<CompiledStar> {
        self.filter_by_magnitude(config.max_mag).compile_brightest(config.max_stars)
    }

    /// Write back out in HYG column layout
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut w = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        w.write_record(["id", "mag", "x", "y", "z", "ci"])?;
        for (i, s) in self.stars.iter().enumerate() {
            w.write_record(&[
                i.to_string(),
                s.mag.to_string(),
                s.position.x.to_string(),
                s.position.y.to_string(),
                s.position.z.to_string(),
                s.color_index.map(|c| c.to_string()).unwrap_or_default(),
            ])?;
        }
        w.flush()?;
        Ok(())
    }
}

/// CSV record matching the HYG export columns we use (others are ignored)
#[derive(Debug, Deserialize)]
struct HygCsvRecord {
    mag: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    ci: Option<f64>,
}

impl HygCsvRecord {
    fn to_star_record(&self) -> Option<StarRecord> {
        let mag = self.mag.filter(|m| m.is_finite())?;
        // Blank coordinates read as zero; an all-blank row ends up degenerate.
        let coord = |v: Option<f64>| v.unwrap_or(0.0);
        if let Some(ci) = self.ci {
            if !ci.is_finite() {
                return None;
            }
        }
        Some(StarRecord {
            mag,
            position: EquatorialPosition::new(coord(self.x), coord(self.y), coord(self.z)),
            color_index: self.ci,
        })
    }
}

/// Generate synthetic stars for testing (deterministic)
pub fn generate_synthetic_stars(count: usize, seed: u64) -> Vec<StarRecord> {
    let mut rng = seed;
    let mut rand = || {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (rng >> 33) as f64 / (1u64 << 31) as f64
    };

    (0..count).map(|_| {
        let ra = rand() * std::f64::consts::TAU;
        let dec = (rand() * 2.0 - 1.0).asin();

        // Log-uniform distance: 1 to 1,000 pc
        let dist_pc = 10.0_f64.powf(rand() * 3.0);

        // Random absolute mag -2 to +10, then apparent
        let abs_mag = -2.0 + rand() * 12.0;
        let mag = abs_mag + 5.0 * dist_pc.log10() - 5.0;

        let cos_dec = dec.cos();
        let position = EquatorialPosition::new(
            dist_pc * cos_dec * ra.cos(),
            dist_pc * cos_dec * ra.sin(),
            dist_pc * dec.sin(),
        );

        let color_index = Some(-0.4 + rand() * 2.4);

        StarRecord { mag, position, color_index }
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYG_SAMPLE: &str = "\
id,hip,proper,ra,dec,dist,mag,absmag,ci,x,y,z
0,,Sol,0,0,0,-26.7,4.85,0.656,0.000005,0,0
1,1,,0.0006,1.089,219.78,9.1,2.39,0.482,219.7,0.003,4.17
2,32349,Sirius,6.75,-16.71,2.64,-1.44,1.45,0.009,-0.49,2.47,-0.76
3,30438,Canopus,6.39,-52.69,94.79,-0.62,-5.5,0.164,-3.29,55.2,-75.36
4,,,1.0,1.0,1.0,5.0,1.0,abc,1.0,1.0,1.0
5,,,1.0,1.0,1.0,4.0,1.0,,0,0,0
6,,,1.0,1.0,1.0,,1.0,0.5,1.0,1.0,1.0
7,71683,Rigil Kentaurus,14.66,-60.83,1.34,-0.01,4.38,0.71,-0.49,-0.41,-1.16
";

    fn sample_catalog() -> StarCatalog {
        StarCatalog::from_reader(HYG_SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let cat = sample_catalog();
        // row 4 has a bad ci, row 6 has no mag
        assert_eq!(cat.len(), 6);
        assert_eq!(cat.skipped(), 2);
    }

    #[test]
    fn test_missing_color_index_is_kept() {
        let cat = sample_catalog();
        let blank_ci = cat.iter().find(|s| s.mag == 4.0).unwrap();
        assert_eq!(blank_ci.color_index, None);
    }

    #[test]
    fn test_degenerate_positions_are_dropped() {
        let stars = sample_catalog().compile(&StarfieldConfig { max_mag: 30.0, max_stars: 100 });
        // Sol (tiny but non-zero) survives; the all-zero row does not
        assert_eq!(stars.len(), 5);
        assert!(stars.iter().all(|s| s.magnitude != 4.0));
    }

    #[test]
    fn test_compile_sorts_and_filters() {
        let stars = sample_catalog().compile(&StarfieldConfig::default());
        let mags: Vec<f32> = stars.iter().map(|s| s.magnitude).collect();
        assert_eq!(mags, vec![-26.7, -1.44, -0.62, -0.01]);
    }

    #[test]
    fn test_truncates_to_brightest() {
        let stars = sample_catalog().compile(&StarfieldConfig { max_mag: 9.0, max_stars: 2 });
        assert_eq!(stars.len(), 2);
        assert_eq!(stars[0].magnitude, -26.7);
        assert_eq!(stars[1].magnitude, -1.44);
    }

    #[test]
    fn test_magnitude_ceiling_is_inclusive() {
        let records = vec![
            StarRecord { mag: 9.0, position: EquatorialPosition::new(1.0, 0.0, 0.0), color_index: None },
            StarRecord { mag: 9.0001, position: EquatorialPosition::new(1.0, 0.0, 0.0), color_index: None },
        ];
        let stars = StarCatalog::from_records(records).compile(&StarfieldConfig::default());
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].magnitude, 9.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records: Vec<StarRecord> = (0..20).map(|i| StarRecord {
            mag: if i % 2 == 0 { 3.0 } else { 1.0 },
            position: EquatorialPosition::new(1.0, i as f64, 0.5),
            color_index: None,
        }).collect();

        let expected: Vec<[f32; 3]> = records.iter()
            .filter(|r| r.mag == 1.0)
            .chain(records.iter().filter(|r| r.mag == 3.0))
            .map(|r| r.compile().unwrap().direction)
            .collect();

        let stars = StarCatalog::from_records(records).compile(&StarfieldConfig::default());
        let got: Vec<[f32; 3]> = stars.iter().map(|s| s.direction).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_signed_zero_magnitudes_tie() {
        let records = vec![
            StarRecord { mag: 0.0, position: EquatorialPosition::new(1.0, 0.0, 0.0), color_index: None },
            StarRecord { mag: -0.0, position: EquatorialPosition::new(0.0, 1.0, 0.0), color_index: None },
        ];

        let expected: Vec<[f32; 3]> = records.iter().map(|r| r.compile().unwrap().direction).collect();

        let stars = StarCatalog::from_records(records).compile_brightest(2);
        let got: Vec<[f32; 3]> = stars.iter().map(|s| s.direction).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "mag,x,y,ci\n1.0,1,0,0.5\n";
        assert!(StarCatalog::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_synthetic_output_contract() {
        let config = StarfieldConfig { max_mag: 9.0, max_stars: 500 };
        let records = generate_synthetic_stars(5000, 42);
        let filtered = records.iter().filter(|r| r.mag <= config.max_mag).count();

        let stars = StarCatalog::from_records(records).compile(&config);
        assert_eq!(stars.len(), filtered.min(config.max_stars));
        assert!(stars.windows(2).all(|w| w[0].magnitude <= w[1].magnitude));
        for s in &stars {
            let [x, y, z] = s.direction;
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-5);
            assert_eq!(s.color >> 24, 0xFF);
        }
    }

    #[test]
    fn test_synthetic_is_deterministic() {
        assert_eq!(generate_synthetic_stars(50, 7), generate_synthetic_stars(50, 7));
        assert_ne!(generate_synthetic_stars(50, 7), generate_synthetic_stars(50, 8));
    }

    #[test]
    fn test_gzip_and_csv_round_trip() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let gz_path = dir.path().join("hyg.csv.gz");
        let mut enc = flate2::write::GzEncoder::new(
            std::fs::File::create(&gz_path).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(HYG_SAMPLE.as_bytes()).unwrap();
        enc.finish().unwrap();

        let from_gz = StarCatalog::load_csv(&gz_path).unwrap();
        assert_eq!(from_gz.len(), 6);

        let csv_path = dir.path().join("copy.csv");
        from_gz.save_csv(&csv_path).unwrap();
        let reloaded = StarCatalog::load_csv(&csv_path).unwrap();
        let a: Vec<_> = from_gz.iter().cloned().collect();
        let b: Vec<_> = reloaded.iter().cloned().collect();
        assert_eq!(a, b);
    }
}
