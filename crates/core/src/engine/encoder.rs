use crate::domain::profile::{Goal, KnowledgeLevel, RawProfile, RiskPreference};
use crate::domain::schema::{FeatureField, FEATURE_COUNT, FEATURE_SCHEMA};
use crate::error::EngineError;
use anyhow::ensure;

pub const DEFAULT_INCOME_CEILING: f64 = 1_700_000.0;
pub const DEFAULT_EXPENSES_CEILING: f64 = 1_200_000.0;
pub const DEFAULT_SAVINGS_SCALE: f64 = 100.0;

/// Reference ceilings used to bring the continuous fields into roughly [0, 1].
///
/// These are tied to the data distribution the catalog was built from. They do
/// not come from the catalog itself, so they must be kept in step with it when
/// the catalog is regenerated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub income_ceiling: f64,
    pub expenses_ceiling: f64,
    pub savings_scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            income_ceiling: DEFAULT_INCOME_CEILING,
            expenses_ceiling: DEFAULT_EXPENSES_CEILING,
            savings_scale: DEFAULT_SAVINGS_SCALE,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, v) in [
            ("income_ceiling", self.income_ceiling),
            ("expenses_ceiling", self.expenses_ceiling),
            ("savings_scale", self.savings_scale),
        ] {
            ensure!(
                v.is_finite() && v > 0.0,
                "{name} must be a positive finite number (got {v})"
            );
        }
        Ok(())
    }
}

/// A user profile laid out in catalog feature order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, field: FeatureField) -> Option<f64> {
        FEATURE_SCHEMA
            .iter()
            .position(|f| *f == field)
            .map(|i| self.0[i])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileEncoder {
    calibration: Calibration,
}

impl ProfileEncoder {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    pub fn encode(&self, profile: &RawProfile) -> Result<FeatureVector, EngineError> {
        let knowledge: KnowledgeLevel = profile.knowledge_level.parse()?;
        let risk: RiskPreference = profile.risk_preference.parse()?;

        let mut out = [0.0; FEATURE_COUNT];
        for (slot, field) in out.iter_mut().zip(FEATURE_SCHEMA) {
            *slot = match field {
                FeatureField::IncomeNormalized => {
                    profile.monthly_income as f64 / self.calibration.income_ceiling
                }
                FeatureField::ExpensesNormalized => {
                    profile.monthly_expenses as f64 / self.calibration.expenses_ceiling
                }
                FeatureField::SavingsFraction => {
                    profile.savings_percentage / self.calibration.savings_scale
                }
                FeatureField::KnowledgeLevel => f64::from(knowledge.code()),
                FeatureField::RiskLevel => f64::from(risk.code()),
                FeatureField::Goal(goal) => goal_flag(goal, &profile.goals),
            };
            if !slot.is_finite() {
                return Err(EngineError::InvalidNumber {
                    field: field.source_field(),
                    value: *slot,
                });
            }
        }

        Ok(FeatureVector(out))
    }
}

// Goals outside the declared set are ignored: the goal list is free-form input.
fn goal_flag(goal: Goal, goals: &[String]) -> f64 {
    if goal.is_in(goals) {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::declared_goals;

    fn profile(knowledge: &str, risk: &str, goals: &[&str]) -> RawProfile {
        RawProfile {
            knowledge_level: knowledge.to_string(),
            goals: goals.iter().map(|g| g.to_string()).collect(),
            risk_preference: risk.to_string(),
            monthly_income: 850_000,
            monthly_expenses: 300_000,
            savings_percentage: 25.0,
        }
    }

    fn goal_flags(v: &FeatureVector) -> Vec<f64> {
        declared_goals()
            .map(|g| v.get(FeatureField::Goal(g)).unwrap())
            .collect()
    }

    #[test]
    fn output_length_matches_schema() {
        let v = ProfileEncoder::default()
            .encode(&profile("intermedio", "moderado", &[]))
            .unwrap();
        assert_eq!(v.as_slice().len(), FEATURE_SCHEMA.len());
    }

    #[test]
    fn normalizes_continuous_fields() {
        let v = ProfileEncoder::default()
            .encode(&profile("principiante", "bajo", &[]))
            .unwrap();
        assert_eq!(v.get(FeatureField::IncomeNormalized), Some(0.5));
        assert_eq!(v.get(FeatureField::ExpensesNormalized), Some(0.25));
        assert_eq!(v.get(FeatureField::SavingsFraction), Some(0.25));
    }

    #[test]
    fn encodes_ordinals() {
        let v = ProfileEncoder::default()
            .encode(&profile("avanzado", "alto", &[]))
            .unwrap();
        assert_eq!(v.get(FeatureField::KnowledgeLevel), Some(3.0));
        assert_eq!(v.get(FeatureField::RiskLevel), Some(3.0));

        let v = ProfileEncoder::default()
            .encode(&profile("principiante", "bajo", &[]))
            .unwrap();
        assert_eq!(v.get(FeatureField::KnowledgeLevel), Some(1.0));
        assert_eq!(v.get(FeatureField::RiskLevel), Some(1.0));
    }

    #[test]
    fn one_hot_goals_in_declared_order() {
        let v = ProfileEncoder::default()
            .encode(&profile("intermedio", "moderado", &["retiro", "vacaciones"]))
            .unwrap();
        assert_eq!(goal_flags(&v), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unknown_goals_are_ignored() {
        let v = ProfileEncoder::default()
            .encode(&profile("intermedio", "moderado", &["yate", "bienes"]))
            .unwrap();
        assert_eq!(goal_flags(&v), vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_categories_are_errors() {
        let enc = ProfileEncoder::default();
        assert!(matches!(
            enc.encode(&profile("experto", "bajo", &[])),
            Err(EngineError::InvalidCategory { field: "knowledgeLevel", .. })
        ));
        assert!(matches!(
            enc.encode(&profile("avanzado", "extremo", &[])),
            Err(EngineError::InvalidCategory { field: "riskPreference", .. })
        ));
    }

    #[test]
    fn non_finite_savings_are_rejected() {
        let enc = ProfileEncoder::default();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut p = profile("intermedio", "alto", &[]);
            p.savings_percentage = bad;
            assert!(matches!(
                enc.encode(&p),
                Err(EngineError::InvalidNumber { field: "savingsPercentage", .. })
            ));
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let enc = ProfileEncoder::default();
        let p = profile("intermedio", "alto", &["proyectos"]);
        assert_eq!(enc.encode(&p).unwrap(), enc.encode(&p).unwrap());
    }

    #[test]
    fn layout_follows_schema_order() {
        let v = ProfileEncoder::default()
            .encode(&profile("intermedio", "alto", &["bienes"]))
            .unwrap();
        assert_eq!(
            v.as_slice(),
            &[0.5, 0.25, 0.25, 2.0, 3.0, 0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn custom_calibration_is_applied() {
        let enc = ProfileEncoder::new(Calibration {
            income_ceiling: 1_000_000.0,
            ..Calibration::default()
        });
        let v = enc.encode(&profile("intermedio", "alto", &[])).unwrap();
        assert_eq!(v.get(FeatureField::IncomeNormalized), Some(0.85));
    }

    #[test]
    fn rejects_non_positive_calibration() {
        let cal = Calibration {
            expenses_ceiling: 0.0,
            ..Calibration::default()
        };
        assert!(cal.validate().is_err());
        assert!(Calibration::default().validate().is_ok());
    }
}
