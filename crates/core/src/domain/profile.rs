use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-request user input, as received on the wire.
///
/// Categorical fields stay as raw strings here; they are validated when the
/// profile is encoded so that a bad value surfaces as `InvalidCategory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    pub knowledge_level: String,
    pub goals: Vec<String>,
    pub risk_preference: String,
    pub monthly_income: i64,
    pub monthly_expenses: i64,
    pub savings_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnowledgeLevel {
    Principiante,
    Intermedio,
    Avanzado,
}

impl KnowledgeLevel {
    pub const FIELD: &'static str = "knowledgeLevel";
    pub const ALLOWED: &'static [&'static str] = &["principiante", "intermedio", "avanzado"];

    /// Ordinal code used in the feature space (1..=3).
    pub fn code(self) -> u8 {
        match self {
            Self::Principiante => 1,
            Self::Intermedio => 2,
            Self::Avanzado => 3,
        }
    }
}

impl FromStr for KnowledgeLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "principiante" => Ok(Self::Principiante),
            "intermedio" => Ok(Self::Intermedio),
            "avanzado" => Ok(Self::Avanzado),
            other => Err(EngineError::InvalidCategory {
                field: Self::FIELD,
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskPreference {
    Bajo,
    Moderado,
    Alto,
}

impl RiskPreference {
    pub const FIELD: &'static str = "riskPreference";
    pub const ALLOWED: &'static [&'static str] = &["bajo", "moderado", "alto"];

    pub fn code(self) -> u8 {
        match self {
            Self::Bajo => 1,
            Self::Moderado => 2,
            Self::Alto => 3,
        }
    }
}

impl FromStr for RiskPreference {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bajo" => Ok(Self::Bajo),
            "moderado" => Ok(Self::Moderado),
            "alto" => Ok(Self::Alto),
            other => Err(EngineError::InvalidCategory {
                field: Self::FIELD,
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// Investment goals with a one-hot column in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    Retiro,
    Bienes,
    Proyectos,
    Vacaciones,
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retiro => "retiro",
            Self::Bienes => "bienes",
            Self::Proyectos => "proyectos",
            Self::Vacaciones => "vacaciones",
        }
    }

    /// Exact, case-sensitive membership test against free-form client goals.
    pub fn is_in(self, goals: &[String]) -> bool {
        goals.iter().any(|g| g == self.as_str())
    }
}
