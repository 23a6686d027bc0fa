use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub dispatch: DispatchConfig,
    pub fleet: FleetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// The length of each auction window, in seconds.
    pub bidding_time_window_secs: f64,
    /// The FIFO cap on the terminated task table.
    pub terminated_tasks_max_size: usize,
    /// The period of the ongoing-tasks publisher, in seconds.
    pub publish_ongoing_tasks_period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// The period of the fleet state publisher, in seconds.
    /// Zero disables fleet state publishing.
    pub state_publish_period_secs: u64,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        let config: Self = Figment::from(Toml::string(DEFAULT_CONFIG))
            .merge(Env::prefixed("FLEET_").map(|p| p.as_str().replace("__", ".").into()))
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CommonResult<()> {
        if self.dispatch.bidding_time_window_secs <= 0.0 {
            return Err(CommonError::InvalidArgument(
                "the bidding time window must be positive".to_string(),
            ));
        }
        if self.dispatch.terminated_tasks_max_size == 0 {
            return Err(CommonError::InvalidArgument(
                "the terminated task table must hold at least one task".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        figment::Jail::expect_with(|_| {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.dispatch.bidding_time_window_secs, 2.0);
            assert_eq!(config.dispatch.terminated_tasks_max_size, 100);
            assert_eq!(config.dispatch.publish_ongoing_tasks_period_secs, 2);
            assert_eq!(config.fleet.state_publish_period_secs, 1);
            Ok(())
        });
    }

    #[test]
    fn test_environment_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FLEET_DISPATCH__TERMINATED_TASKS_MAX_SIZE", "3");
            jail.set_env("FLEET_FLEET__STATE_PUBLISH_PERIOD_SECS", "0");
            let config = AppConfig::load().unwrap();
            assert_eq!(config.dispatch.terminated_tasks_max_size, 3);
            assert_eq!(config.fleet.state_publish_period_secs, 0);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FLEET_DISPATCH__BIDDING_TIME_WINDOW_SECS", "0.0");
            assert!(AppConfig::load().is_err());
            Ok(())
        });
    }
}
