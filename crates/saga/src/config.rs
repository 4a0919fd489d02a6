//! Saga configuration loaded from environment variables.

use domain::Money;
use fabric::FabricConfig;

/// Configuration surface consumed by the saga.
///
/// Reads from environment variables:
/// - `ORDER_MINIMUM_CHARGE_CENTS` — minimum order charge (default: `1000`, i.e. $10.00)
/// - plus the `FABRIC_*` variables read by [`FabricConfig`]
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Orders below this total are rejected by payment validation.
    pub minimum_charge: Money,
    /// Broker connection parameters.
    pub fabric: FabricConfig,
}

impl SagaConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            minimum_charge: std::env::var("ORDER_MINIMUM_CHARGE_CENTS")
                .ok()
                .and_then(|c| c.parse().ok())
                .map(Money::from_cents)
                .unwrap_or_else(|| Money::from_dollars(10)),
            fabric: FabricConfig::from_env(),
        }
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            minimum_charge: Money::from_dollars(10),
            fabric: FabricConfig::default(),
        }
    }
}
