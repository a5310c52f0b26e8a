//! Optional TOML tuning file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use outbreak_system_beam::{BeamConfig, RoleTuning};
use outbreak_system_growth_field::GrowthConfig;
use outbreak_system_round::RoundConfig;
use serde::Deserialize;

/// Tuning loaded from disk; every section falls back to its defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    pub(crate) ticks_per_second: u32,
    pub(crate) round: RoundConfig,
    pub(crate) growth: GrowthConfig,
    pub(crate) beam: BeamConfig,
    pub(crate) roles: RoleTuning,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 50,
            round: RoundConfig::default(),
            growth: GrowthConfig::default(),
            beam: BeamConfig::default(),
            roles: RoleTuning::default(),
        }
    }
}

impl SimulationConfig {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("failed to parse simulation config")?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ticks_per_second == 0 {
            anyhow::bail!("ticks_per_second must be positive");
        }
        self.round.validate().context("invalid round section")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use outbreak_core::{Role, RoleCategory};

    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let config = SimulationConfig::parse("").expect("empty config is valid");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = SimulationConfig::parse(
            r#"
ticks_per_second = 25

[round]
min_players = 4
fun_round = true

[round.category_caps]
Medic = 1

[round.infected_weights]
Smoker = 0.0
Witch = 5.0

[beam]
max_bounces = 3
"#,
        )
        .expect("valid config");

        assert_eq!(config.ticks_per_second, 25);
        assert_eq!(config.round.min_players, 4);
        assert!(config.round.fun_round);
        assert_eq!(config.round.cap(RoleCategory::Medic), 1);
        assert_eq!(config.round.cap(RoleCategory::Defender), 0);
        assert_eq!(config.round.infected_weight(Role::Witch), 5.0);
        assert_eq!(config.round.infection_delay_seconds, 10);
        assert_eq!(config.beam.max_bounces, 3);
        assert_eq!(config.growth, GrowthConfig::default());
    }

    #[test]
    fn rejects_invalid_round_rules() {
        let error = SimulationConfig::parse("[round]\nmin_players = 0\n")
            .expect_err("zero players rejected");
        assert!(format!("{error:#}").contains("minimum player count"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(SimulationConfig::parse("tick_rate = 5\n").is_err());
    }
}
