//! Grid geometries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridType {
    #[serde(rename = "std100")]
    Std100,
    #[serde(rename = "std50")]
    Std50,
    #[serde(rename = "std25")]
    Std25,
    #[serde(rename = "roll100")]
    Roll100,
}

impl GridType {
    pub const ALL: [GridType; 4] = [
        GridType::Std100,
        GridType::Std50,
        GridType::Std25,
        GridType::Roll100,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GridType::Std100 => "std100",
            GridType::Std50 => "std50",
            GridType::Std25 => "std25",
            GridType::Roll100 => "roll100",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GridType::Std100 => "Standard, 100 squares",
            GridType::Std50 => "Standard, 50 squares",
            GridType::Std25 => "Standard, 25 squares",
            GridType::Roll100 => "Rollover, 100 squares",
        }
    }

    /// Number of claimable squares on the board.
    pub fn squares(self) -> u32 {
        match self {
            GridType::Std25 => 25,
            GridType::Std50 => 50,
            GridType::Std100 | GridType::Roll100 => 100,
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GridType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidGridType(s.to_string()))
    }
}

impl TryFrom<String> for GridType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
