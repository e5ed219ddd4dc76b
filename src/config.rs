use crate::error::ConfigError;
use crate::types::{Address, Amount, UNIT};
use serde::{Deserialize, Serialize};

/// Deployment parameters; loaded from JSON by the node binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Contract owner: may pause the registry and manage the caller allow-list.
    pub owner: Address,
    /// Airline registered at deployment. Defaults to the owner.
    #[serde(default)]
    pub first_airline: Option<Address>,
    /// Identity the facade presents to the data layer.
    #[serde(default = "default_app_id")]
    pub app_id: Address,
    /// Put `app_id` on the allow-list at deployment.
    #[serde(default = "default_authorize_app")]
    pub authorize_app: bool,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub rng_seed: u64,
}

fn default_app_id() -> Address {
    Address::from_low_u64(0xA99)
}

fn default_authorize_app() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default = "default_activation_fee")]
    pub activation_fee: Amount,
    #[serde(default = "default_max_insurance")]
    pub max_insurance: Amount,
    #[serde(default = "default_oracle_fee")]
    pub oracle_registration_fee: Amount,
    #[serde(default = "default_payout_num")]
    pub payout_numerator: Amount,
    #[serde(default = "default_payout_den")]
    pub payout_denominator: Amount,
}

fn default_activation_fee() -> Amount {
    10 * UNIT
}

fn default_max_insurance() -> Amount {
    UNIT
}

fn default_oracle_fee() -> Amount {
    UNIT
}

fn default_payout_num() -> Amount {
    3
}

fn default_payout_den() -> Amount {
    2
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            activation_fee: default_activation_fee(),
            max_insurance: default_max_insurance(),
            oracle_registration_fee: default_oracle_fee(),
            payout_numerator: default_payout_num(),
            payout_denominator: default_payout_den(),
        }
    }
}

impl FeeSchedule {
    /// Credit owed on a policy of `paid` once the flight resolves to an airline-fault delay.
    pub fn payout_for(&self, paid: Amount) -> Amount {
        paid.saturating_mul(self.payout_numerator) / self.payout_denominator
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Below this many registered airlines a single active sponsor suffices.
    #[serde(default = "default_bootstrap")]
    pub bootstrap_airlines: usize,
    /// Matching oracle responses needed to finalize a status request.
    #[serde(default = "default_oracle_quorum")]
    pub oracle_quorum: usize,
    /// Oracle indexes are drawn from `0..oracle_index_space`.
    #[serde(default = "default_index_space")]
    pub oracle_index_space: u8,
}

fn default_bootstrap() -> usize {
    4
}

fn default_oracle_quorum() -> usize {
    3
}

fn default_index_space() -> u8 {
    10
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            bootstrap_airlines: default_bootstrap(),
            oracle_quorum: default_oracle_quorum(),
            oracle_index_space: default_index_space(),
        }
    }
}

impl DeploymentConfig {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            first_airline: None,
            app_id: default_app_id(),
            authorize_app: default_authorize_app(),
            fees: FeeSchedule::default(),
            consensus: ConsensusConfig::default(),
            rng_seed: 0,
        }
    }

    pub fn first_airline(&self) -> Address {
        self.first_airline.unwrap_or(self.owner)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroOwner);
        }
        let per_oracle = crate::oracle::INDEXES_PER_ORACLE;
        if (self.consensus.oracle_index_space as usize) < per_oracle {
            return Err(ConfigError::IndexSpaceTooSmall {
                space: self.consensus.oracle_index_space,
                per_oracle,
            });
        }
        if self.consensus.oracle_quorum == 0 {
            return Err(ConfigError::Zero("oracle_quorum"));
        }
        if self.consensus.bootstrap_airlines == 0 {
            return Err(ConfigError::Zero("bootstrap_airlines"));
        }
        if self.fees.payout_denominator == 0 {
            return Err(ConfigError::Zero("payout_denominator"));
        }
        if self.fees.max_insurance == 0 {
            return Err(ConfigError::Zero("max_insurance"));
        }
        Ok(())
    }
}
