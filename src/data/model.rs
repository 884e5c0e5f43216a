use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Level – one tier of the land cover hierarchy
// ---------------------------------------------------------------------------

/// The four classification tiers, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    One,
    Two,
    Three,
    Four,
}

impl Level {
    /// Resolution order used by type lookups.
    pub const ALL: [Level; 4] = [Level::One, Level::Two, Level::Three, Level::Four];

    pub fn number(&self) -> u8 {
        match self {
            Level::One => 1,
            Level::Two => 2,
            Level::Three => 3,
            Level::Four => 4,
        }
    }

    /// Column name in the metadata table, e.g. `LEVEL_2`.
    pub fn column(&self) -> String {
        format!("LEVEL_{}", self.number())
    }
}

impl TryFrom<u8> for Level {
    type Error = SpectraError;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            4 => Ok(Level::Four),
            other => Err(SpectraError::invalid_metadata(format!(
                "classification level must be 1-4, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

pub const LEVEL_1_TYPES: &[&str] = &["pervious", "impervious"];
pub const LEVEL_2_TYPES: &[&str] = &["bare", "burn", "npv", "urban", "vegetation"];
pub const LEVEL_3_TYPES: &[&str] = &["measured", "simulated"];

// ---------------------------------------------------------------------------
// SpectrumRecord – one row of the metadata table
// ---------------------------------------------------------------------------

fn default_level_3() -> String {
    "measured".to_string()
}

/// Classification and provenance for a single reference spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    /// Unique ID of the measured spectrum.
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "LEVEL_1")]
    pub level_1: String,
    #[serde(rename = "LEVEL_2")]
    pub level_2: String,
    #[serde(rename = "LEVEL_3", default = "default_level_3")]
    pub level_3: String,
    #[serde(rename = "LEVEL_4", default)]
    pub level_4: Option<String>,
    #[serde(rename = "LAT", default)]
    pub lat: Option<f64>,
    #[serde(rename = "LON", default)]
    pub lon: Option<f64>,
    #[serde(rename = "SOURCE", default)]
    pub source: Option<String>,
    #[serde(rename = "NOTES", default)]
    pub notes: Option<String>,
}

impl SpectrumRecord {
    /// A measured record with the required classification fields set.
    pub fn new(
        name: impl Into<String>,
        level_1: impl Into<String>,
        level_2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            level_1: level_1.into(),
            level_2: level_2.into(),
            level_3: default_level_3(),
            level_4: None,
            lat: None,
            lon: None,
            source: None,
            notes: None,
        }
    }

    /// Label at a classification level. `LEVEL_4` may be unset.
    pub fn level(&self, level: Level) -> Option<&str> {
        match level {
            Level::One => Some(&self.level_1),
            Level::Two => Some(&self.level_2),
            Level::Three => Some(&self.level_3),
            Level::Four => self.level_4.as_deref().filter(|s| !s.is_empty()),
        }
    }

    /// Reject labels outside the fixed vocabularies of levels 1-3.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (Level::One, &self.level_1, LEVEL_1_TYPES),
            (Level::Two, &self.level_2, LEVEL_2_TYPES),
            (Level::Three, &self.level_3, LEVEL_3_TYPES),
        ];
        for (level, value, allowed) in checks {
            if !allowed.contains(&value.as_str()) {
                return Err(SpectraError::invalid_metadata(format!(
                    "{}: {level} value '{value}' not one of {}",
                    self.name,
                    allowed.join(", ")
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MetadataTable – per-spectrum rows, same order as the spectra array
// ---------------------------------------------------------------------------

/// Ordered metadata rows, one per spectrum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    records: Vec<SpectrumRecord>,
}

impl MetadataTable {
    pub fn new(records: Vec<SpectrumRecord>) -> Self {
        Self { records }
    }

    /// Parse a CSV table with a header row naming the columns.
    ///
    /// Columns beyond the known schema are ignored; every row is validated.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();
        for row in csv_reader.deserialize() {
            let record: SpectrumRecord = row?;
            record.validate()?;
            records.push(record);
        }
        log::debug!("parsed {} metadata rows", records.len());
        Ok(Self { records })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn records(&self) -> &[SpectrumRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of the rows at `indices`, renumbered from zero. Repeats allowed.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let mut records = Vec::with_capacity(indices.len());
        for &i in indices {
            let record = self.records.get(i).ok_or_else(|| {
                SpectraError::shape(format!(
                    "metadata row {i} out of range for {} rows",
                    self.records.len()
                ))
            })?;
            records.push(record.clone());
        }
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
NAME,LEVEL_1,LEVEL_2,LEVEL_3,LEVEL_4,LAT,LON,SOURCE,NOTES
oak_leaf,pervious,vegetation,measured,broadleaf,37.4,-122.1,field,
asphalt,impervious,urban,measured,,,,,new road
";

    #[test]
    fn test_record_defaults() {
        let s = SpectrumRecord {
            level_3: "measured".to_string(),
            level_4: Some("any_label".to_string()),
            ..SpectrumRecord::new("TestSample", "pervious", "vegetation")
        };
        assert_eq!(s.name, "TestSample");
        assert_eq!(s.level(Level::One), Some("pervious"));
        assert_eq!(s.level(Level::Two), Some("vegetation"));
        assert_eq!(s.level(Level::Three), Some("measured"));
        assert_eq!(s.level(Level::Four), Some("any_label"));
        assert!(s.lat.is_none());
        assert!(s.lon.is_none());
        assert!(s.source.is_none());
        assert!(s.notes.is_none());

        let copy = s.clone();
        assert_eq!(copy, s);
    }

    #[test]
    fn test_parse_table() {
        let table = MetadataTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let oak = &table.records()[0];
        assert_eq!(oak.level_4.as_deref(), Some("broadleaf"));
        assert_eq!(oak.lat, Some(37.4));
        let road = &table.records()[1];
        assert_eq!(road.level(Level::Four), None);
        assert_eq!(road.notes.as_deref(), Some("new road"));
    }

    #[test]
    fn test_parse_rejects_unknown_level_value() {
        let bad = "NAME,LEVEL_1,LEVEL_2\nx,pervious,forest\n";
        let err = MetadataTable::from_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_level3_defaults_to_measured() {
        let table = MetadataTable::from_reader("NAME,LEVEL_1,LEVEL_2\nx,pervious,bare\n".as_bytes())
            .unwrap();
        assert_eq!(table.records()[0].level_3, "measured");
    }

    #[test]
    fn test_select_reindexes() {
        let table = MetadataTable::from_reader(TABLE.as_bytes()).unwrap();
        let picked = table.select(&[1, 1, 0]).unwrap();
        assert_eq!(picked.len(), 3);
        assert_eq!(picked.records()[0].name, "asphalt");
        assert_eq!(picked.records()[2].name, "oak_leaf");
        assert!(table.select(&[2]).is_err());
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(Level::try_from(2).unwrap(), Level::Two);
        assert!(Level::try_from(5).is_err());
        assert_eq!(Level::Three.column(), "LEVEL_3");
    }
}
