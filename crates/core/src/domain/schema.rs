//! The one ordered declaration of the asset feature space.
//!
//! The encoder walks [`FEATURE_SCHEMA`] to lay out a user vector and the catalog
//! loader walks it to pick columns, so the two cannot drift apart. Reordering
//! this list reorders both sides together.

use crate::domain::profile::Goal;

/// Catalog column holding the integer surrogate key for a ticker.
pub const IDENTIFIER_COLUMN: &str = "ticker_encoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureField {
    IncomeNormalized,
    ExpensesNormalized,
    SavingsFraction,
    KnowledgeLevel,
    RiskLevel,
    Goal(Goal),
}

pub const FEATURE_SCHEMA: [FeatureField; 9] = [
    FeatureField::IncomeNormalized,
    FeatureField::ExpensesNormalized,
    FeatureField::SavingsFraction,
    FeatureField::KnowledgeLevel,
    FeatureField::RiskLevel,
    FeatureField::Goal(Goal::Retiro),
    FeatureField::Goal(Goal::Bienes),
    FeatureField::Goal(Goal::Proyectos),
    FeatureField::Goal(Goal::Vacaciones),
];

pub const FEATURE_COUNT: usize = FEATURE_SCHEMA.len();

impl FeatureField {
    /// Column name in the processed asset catalog.
    pub fn column(self) -> &'static str {
        match self {
            Self::IncomeNormalized => "income_normalized",
            Self::ExpensesNormalized => "expenses_normalized",
            Self::SavingsFraction => "savings_percentage",
            Self::KnowledgeLevel => "knowledge_level_encoded",
            Self::RiskLevel => "risk_level_encoded",
            Self::Goal(Goal::Retiro) => "goal_retiro",
            Self::Goal(Goal::Bienes) => "goal_bienes",
            Self::Goal(Goal::Proyectos) => "goal_proyectos",
            Self::Goal(Goal::Vacaciones) => "goal_vacaciones",
        }
    }
}

impl FeatureField {
    /// Profile field the value is derived from, as named on the wire.
    pub fn source_field(self) -> &'static str {
        match self {
            Self::IncomeNormalized => "monthlyIncome",
            Self::ExpensesNormalized => "monthlyExpenses",
            Self::SavingsFraction => "savingsPercentage",
            Self::KnowledgeLevel => "knowledgeLevel",
            Self::RiskLevel => "riskPreference",
            Self::Goal(_) => "goals",
        }
    }
}

pub fn feature_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_SCHEMA.iter().map(|f| f.column())
}

/// Goals in the order their one-hot flags appear in the feature space.
pub fn declared_goals() -> impl Iterator<Item = Goal> {
    FEATURE_SCHEMA.iter().filter_map(|f| match f {
        FeatureField::Goal(g) => Some(*g),
        _ => None,
    })
}
