//! Bankroll settings chosen at onboarding.

use serde::{Deserialize, Serialize};

use super::error::TradeflowError;

pub const MIN_TARGET_PCT: f64 = 0.1;
pub const MAX_TARGET_PCT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub initial_bank: f64,
    /// Percentage of the bank committed per day.
    pub daily_entry_target: f64,
    /// Percentage of the bank targeted as daily profit; drives the projection.
    pub daily_profit_target: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            initial_bank: 1000.0,
            daily_entry_target: 5.0,
            daily_profit_target: 10.0,
        }
    }
}

impl UserSettings {
    pub fn validate(&self) -> Result<(), TradeflowError> {
        if !self.initial_bank.is_finite() || self.initial_bank < 0.0 {
            return Err(TradeflowError::invalid_settings(
                "initialBank",
                "must be a non-negative number",
            ));
        }
        check_target("dailyEntryTarget", self.daily_entry_target)?;
        check_target("dailyProfitTarget", self.daily_profit_target)?;
        Ok(())
    }

    /// Amount to commit today given the current bank.
    pub fn daily_entry_value(&self, current_bank: f64) -> f64 {
        current_bank * self.daily_entry_target / 100.0
    }

    /// Profit goal for today given the current bank.
    pub fn daily_profit_value(&self, current_bank: f64) -> f64 {
        current_bank * self.daily_profit_target / 100.0
    }

    pub fn daily_profit_rate(&self) -> f64 {
        self.daily_profit_target / 100.0
    }
}

fn check_target(field: &str, value: f64) -> Result<(), TradeflowError> {
    if !value.is_finite() || !(MIN_TARGET_PCT..=MAX_TARGET_PCT).contains(&value) {
        return Err(TradeflowError::invalid_settings(
            field,
            format!("must be between {MIN_TARGET_PCT}% and {MAX_TARGET_PCT}%"),
        ));
    }
    Ok(())
}
