//! Festival settings: timezone, day cutoff, placeholder sentinel, stage
//! priority and the weekend calendar of each edition.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::timetable::FestivalClock;
use crate::timetable::clock::{DEFAULT_CUTOFF_HOUR, DEFAULT_TIMEZONE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekend {
    #[serde(rename = "WEEKEND_1")]
    Weekend1,
    #[serde(rename = "WEEKEND_2")]
    Weekend2,
}

impl Weekend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekend::Weekend1 => "WEEKEND_1",
            Weekend::Weekend2 => "WEEKEND_2",
        }
    }
}

impl fmt::Display for Weekend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekend {
    type Err = anyhow::Error;

    /// Accepts `WEEKEND_1`, `weekend_1` or `1`
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WEEKEND_1" | "1" => Ok(Weekend::Weekend1),
            "WEEKEND_2" | "2" => Ok(Weekend::Weekend2),
            _ => bail!("Unknown weekend: {}", s),
        }
    }
}

/// One festival year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub year: i32,
    pub weekend_1: Vec<NaiveDate>,
    pub weekend_2: Vec<NaiveDate>,
}

impl Edition {
    pub fn weekend_dates(&self, weekend: Weekend) -> &[NaiveDate] {
        match weekend {
            Weekend::Weekend1 => &self.weekend_1,
            Weekend::Weekend2 => &self.weekend_2,
        }
    }

    pub fn weekend_for_date(&self, date: NaiveDate) -> Option<Weekend> {
        if self.weekend_1.contains(&date) {
            Some(Weekend::Weekend1)
        } else if self.weekend_2.contains(&date) {
            Some(Weekend::Weekend2)
        } else {
            None
        }
    }

    pub fn all_dates(&self) -> Vec<NaiveDate> {
        self.weekend_1
            .iter()
            .chain(self.weekend_2.iter())
            .copied()
            .collect()
    }
}

const DEFAULT_STAGE_ORDER: [&str; 15] = [
    "MAINSTAGE",
    "THE RAVE CAVE",
    "CORE",
    "HOUSE OF FORTUNE BY JBL",
    "FREEDOM BY BUD",
    "CAGE",
    "CRYSTAL GARDEN",
    "MELODIA BY CORONA",
    "THE ROSE GARDEN",
    "RISE BY COCA-COLA",
    "THE GREAT LIBRARY",
    "ELIXIR",
    "PLANAXIS",
    "ATMOSPHERE",
    "MOOSEBAR",
];

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.name().to_string()
}

fn default_cutoff_hour() -> u32 {
    DEFAULT_CUTOFF_HOUR
}

fn default_placeholder_start() -> String {
    "12:00".to_string()
}

fn default_placeholder_end() -> String {
    "12:01".to_string()
}

fn default_stage_order() -> Vec<String> {
    DEFAULT_STAGE_ORDER.iter().map(|s| s.to_string()).collect()
}

fn default_year() -> i32 {
    2025
}

fn dates(year: i32, month: u32, days: [u32; 3]) -> Vec<NaiveDate> {
    days.iter()
        .filter_map(|&day| NaiveDate::from_ymd_opt(year, month, day))
        .collect()
}

fn default_editions() -> Vec<Edition> {
    vec![
        Edition {
            year: 2025,
            weekend_1: dates(2025, 7, [18, 19, 20]),
            weekend_2: dates(2025, 7, [25, 26, 27]),
        },
        Edition {
            year: 2026,
            weekend_1: dates(2026, 7, [17, 18, 19]),
            weekend_2: dates(2026, 7, [24, 25, 26]),
        },
    ]
}

/// Deployment-wide festival settings, overridable from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalConfig {
    /// IANA zone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
    /// "HH:MM" local
    #[serde(default = "default_placeholder_start")]
    pub placeholder_start: String,
    #[serde(default = "default_placeholder_end")]
    pub placeholder_end: String,
    #[serde(default = "default_stage_order")]
    pub stage_order: Vec<String>,
    #[serde(default = "default_year")]
    pub default_year: i32,
    #[serde(default = "default_editions")]
    pub editions: Vec<Edition>,
}

impl Default for FestivalConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            cutoff_hour: default_cutoff_hour(),
            placeholder_start: default_placeholder_start(),
            placeholder_end: default_placeholder_end(),
            stage_order: default_stage_order(),
            default_year: default_year(),
            editions: default_editions(),
        }
    }
}

fn parse_clock_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid {} '{}', expected HH:MM", field, value))
}

impl FestivalConfig {
    /// Built-in defaults, or the given TOML file layered over them
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read festival config: {}", path.display()))?;
        let config: FestivalConfig = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse festival config: {}", path.display()))?;

        tracing::info!(
            "Loaded festival config from {} ({} editions, {} stages)",
            path.display(),
            config.editions.len(),
            config.stage_order.len()
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: FestivalConfig = toml::from_str(content)?;
        config.clock()?;
        Ok(config)
    }

    /// Validated clock for this festival
    pub fn clock(&self) -> Result<FestivalClock> {
        let timezone = Tz::from_str(&self.timezone)
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", self.timezone, e))?;

        if self.cutoff_hour >= 24 {
            bail!("cutoff_hour must be below 24, got {}", self.cutoff_hour);
        }

        let placeholder_start = parse_clock_time("placeholder_start", &self.placeholder_start)?;
        let placeholder_end = parse_clock_time("placeholder_end", &self.placeholder_end)?;

        Ok(FestivalClock::new(
            timezone,
            self.cutoff_hour,
            placeholder_start,
            placeholder_end,
        ))
    }

    pub fn edition(&self, year: i32) -> Option<&Edition> {
        self.editions.iter().find(|e| e.year == year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.editions.iter().map(|e| e.year).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults_match_clock_defaults() {
        let config = FestivalConfig::default();
        assert_eq!(config.clock().unwrap(), FestivalClock::default());
        assert_eq!(config.stage_order.len(), 15);
        assert_eq!(config.stage_order[0], "MAINSTAGE");
        assert_eq!(config.years(), vec![2025, 2026]);
    }

    #[test]
    fn test_edition_weekends() {
        let config = FestivalConfig::default();
        let edition = config.edition(2026).unwrap();
        assert_eq!(
            edition.weekend_dates(Weekend::Weekend2),
            &[date(2026, 7, 24), date(2026, 7, 25), date(2026, 7, 26)]
        );
        assert_eq!(edition.weekend_for_date(date(2026, 7, 18)), Some(Weekend::Weekend1));
        assert_eq!(edition.weekend_for_date(date(2026, 7, 21)), None);
        assert_eq!(edition.all_dates().len(), 6);
        assert!(config.edition(2019).is_none());
    }

    #[test]
    fn test_weekend_parsing() {
        assert_eq!("WEEKEND_1".parse::<Weekend>().unwrap(), Weekend::Weekend1);
        assert_eq!("weekend_2".parse::<Weekend>().unwrap(), Weekend::Weekend2);
        assert_eq!("2".parse::<Weekend>().unwrap(), Weekend::Weekend2);
        assert!("WEEKEND_3".parse::<Weekend>().is_err());
        assert_eq!(serde_json::to_string(&Weekend::Weekend1).unwrap(), "\"WEEKEND_1\"");
    }

    #[test]
    fn test_toml_overrides_fields_individually() {
        let config = FestivalConfig::from_toml(
            r#"
            cutoff_hour = 5
            stage_order = ["ARENA", "TENT"]

            [[editions]]
            year = 2027
            weekend_1 = ["2027-07-16", "2027-07-17"]
            weekend_2 = []
            "#,
        )
        .unwrap();

        assert_eq!(config.cutoff_hour, 5);
        assert_eq!(config.timezone, "Europe/Stockholm");
        assert_eq!(config.stage_order, vec!["ARENA", "TENT"]);
        assert_eq!(config.editions.len(), 1);
        assert_eq!(config.edition(2027).unwrap().weekend_1[1], date(2027, 7, 17));
        assert_eq!(config.clock().unwrap().cutoff_hour(), 5);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(FestivalConfig::from_toml("cutoff_hour = 24").is_err());
        assert!(FestivalConfig::from_toml("timezone = \"Mars/Olympus\"").is_err());
        assert!(FestivalConfig::from_toml("placeholder_start = \"noon\"").is_err());
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(FestivalConfig::load(None).unwrap(), FestivalConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("festival.toml");
        std::fs::write(&path, "timezone = \"UTC\"\ndefault_year = 2026\n").unwrap();

        let config = FestivalConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_year, 2026);
        assert_eq!(config.clock().unwrap().timezone(), chrono_tz::UTC);
    }
}
