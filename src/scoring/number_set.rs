//! Number-set types, payout configurations, and the league policy table
//! deciding which configurations a league may use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{League, ValidationError};

// ---------------------------------------------------------------------------
// Set types
// ---------------------------------------------------------------------------

/// A scoring period a number set pays out on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NumberSetType {
    All,
    Q1,
    Q2,
    Q3,
    Q4,
    Half,
    Final,
}

impl NumberSetType {
    pub const ALL: [NumberSetType; 7] = [
        NumberSetType::All,
        NumberSetType::Q1,
        NumberSetType::Q2,
        NumberSetType::Q3,
        NumberSetType::Q4,
        NumberSetType::Half,
        NumberSetType::Final,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NumberSetType::All => "all",
            NumberSetType::Q1 => "q1",
            NumberSetType::Q2 => "q2",
            NumberSetType::Q3 => "q3",
            NumberSetType::Q4 => "q4",
            NumberSetType::Half => "half",
            NumberSetType::Final => "final",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            NumberSetType::All => "All",
            NumberSetType::Q1 => "1st",
            NumberSetType::Q2 => "2nd",
            NumberSetType::Q3 => "3rd",
            NumberSetType::Q4 => "4th",
            NumberSetType::Half => "Half",
            NumberSetType::Final => "Final",
        }
    }

    pub fn long_label(self) -> &'static str {
        match self {
            NumberSetType::All | NumberSetType::Final => "Final",
            NumberSetType::Q1 => "1st Quarter",
            NumberSetType::Q2 => "2nd Quarter",
            NumberSetType::Q3 => "3rd Quarter",
            NumberSetType::Q4 => "4th Quarter",
            NumberSetType::Half => "Halftime",
        }
    }

    /// Display order for a square's winning periods.
    pub fn display_priority(self) -> u8 {
        match self {
            NumberSetType::Q1 => 1,
            NumberSetType::Half => 2,
            NumberSetType::Q2 => 3,
            NumberSetType::Q3 => 4,
            NumberSetType::Final => 5,
            NumberSetType::All => 6,
            NumberSetType::Q4 => 7,
        }
    }
}

impl fmt::Display for NumberSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberSetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumberSetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidSetType(s.to_string()))
    }
}

impl TryFrom<String> for NumberSetType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Configurations
// ---------------------------------------------------------------------------

/// The bundle of set types a grid pays out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberSetConfig {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "123f")]
    Q123Final,
    #[serde(rename = "hf")]
    HalfFinal,
    #[serde(rename = "1234")]
    Quarters,
    #[serde(rename = "h4")]
    HalfQ4,
}

pub struct ConfigInfo {
    pub config: NumberSetConfig,
    pub label: &'static str,
    pub set_types: &'static [NumberSetType],
}

const CONFIGS: &[ConfigInfo] = &[
    ConfigInfo {
        config: NumberSetConfig::Standard,
        label: "Same",
        set_types: &[NumberSetType::All],
    },
    ConfigInfo {
        config: NumberSetConfig::Q123Final,
        label: "1st, 2nd, 3rd, Final",
        set_types: &[
            NumberSetType::Q1,
            NumberSetType::Q2,
            NumberSetType::Q3,
            NumberSetType::Final,
        ],
    },
    ConfigInfo {
        config: NumberSetConfig::HalfFinal,
        label: "Half, Final",
        set_types: &[NumberSetType::Half, NumberSetType::Final],
    },
    ConfigInfo {
        config: NumberSetConfig::Quarters,
        label: "1st, 2nd, 3rd, 4th",
        set_types: &[
            NumberSetType::Q1,
            NumberSetType::Q2,
            NumberSetType::Q3,
            NumberSetType::Q4,
        ],
    },
    ConfigInfo {
        config: NumberSetConfig::HalfQ4,
        label: "Half, 4th",
        set_types: &[NumberSetType::Half, NumberSetType::Q4],
    },
];

// Which configs a league may select, keyed by period structure. `1234` and
// `h4` are resolvable but not offered anywhere yet.
const QUARTER_LEAGUE_CONFIGS: &[NumberSetConfig] = &[
    NumberSetConfig::Standard,
    NumberSetConfig::Q123Final,
    NumberSetConfig::HalfFinal,
];
const HALF_LEAGUE_CONFIGS: &[NumberSetConfig] =
    &[NumberSetConfig::Standard, NumberSetConfig::HalfFinal];

impl NumberSetConfig {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberSetConfig::Standard => "standard",
            NumberSetConfig::Q123Final => "123f",
            NumberSetConfig::HalfFinal => "hf",
            NumberSetConfig::Quarters => "1234",
            NumberSetConfig::HalfQ4 => "h4",
        }
    }

    fn info(self) -> &'static ConfigInfo {
        // CONFIGS covers every variant.
        CONFIGS
            .iter()
            .find(|c| c.config == self)
            .unwrap_or(&CONFIGS[0])
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Ordered set types this config pays out on.
    pub fn set_types(self) -> &'static [NumberSetType] {
        self.info().set_types
    }

    pub fn is_allowed_for(self, league: League) -> bool {
        allowed_configs(league).contains(&self)
    }

    pub fn validate_for(self, league: League) -> Result<(), ValidationError> {
        if self.is_allowed_for(league) {
            Ok(())
        } else {
            Err(ValidationError::ConfigNotAllowed {
                config: self.as_str().to_string(),
                league: league.label().to_string(),
            })
        }
    }
}

impl fmt::Display for NumberSetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberSetConfig {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CONFIGS
            .iter()
            .map(|c| c.config)
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidNumberSetConfig(s.to_string()))
    }
}

impl TryFrom<String> for NumberSetConfig {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn allowed_configs(league: League) -> &'static [NumberSetConfig] {
    if league.uses_halves() {
        HALF_LEAGUE_CONFIGS
    } else {
        QUARTER_LEAGUE_CONFIGS
    }
}

/// Configurations a league may select, in display order.
pub fn configs_for_league(league: League) -> Vec<&'static ConfigInfo> {
    CONFIGS
        .iter()
        .filter(|c| c.config.is_allowed_for(league))
        .collect()
}

// ---------------------------------------------------------------------------
// Number sets
// ---------------------------------------------------------------------------

/// Drawn numbers for one period of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NumberSet {
    pub grid_id: i64,
    #[sqlx(try_from = "String")]
    pub set_type: NumberSetType,
    pub home_numbers: Option<Vec<i32>>,
    pub away_numbers: Option<Vec<i32>>,
    pub manual_draw: bool,
}

impl NumberSet {
    pub fn has_numbers(&self) -> bool {
        self.home_numbers.is_some() && self.away_numbers.is_some()
    }
}

/// Check that `numbers` is a permutation of 0..=9.
pub fn validate_numbers(numbers: &[i32]) -> Result<(), ValidationError> {
    if numbers.len() != 10 {
        return Err(ValidationError::InvalidNumbers(format!(
            "expected 10 numbers, got {}",
            numbers.len()
        )));
    }
    let mut seen = [false; 10];
    for &n in numbers {
        let idx = usize::try_from(n)
            .ok()
            .filter(|i| *i < 10)
            .ok_or_else(|| ValidationError::InvalidNumbers(format!("{n} is out of range")))?;
        if seen[idx] {
            return Err(ValidationError::InvalidNumbers(format!("{n} appears twice")));
        }
        seen[idx] = true;
    }
    Ok(())
}
