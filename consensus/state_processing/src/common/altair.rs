use integer_sqrt::IntegerSquareRoot;
use safe_arith::{ArithError, SafeArith};
use types::ChainSpec;

/// This type exists to avoid confusing `total_active_balance` with `base_reward_per_increment`,
/// since they are used in close proximity and the same type (`u64`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaseRewardPerIncrement(u64);

impl BaseRewardPerIncrement {
    pub fn new(total_active_balance: u64, spec: &ChainSpec) -> Result<Self, ArithError> {
        get_base_reward_per_increment(total_active_balance, spec).map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Returns the base reward for some validator.
///
/// Takes a precomputed `base_reward_per_increment`, which is shared by every validator in the
/// epoch.
pub fn get_base_reward(
    validator_effective_balance: u64,
    base_reward_per_increment: BaseRewardPerIncrement,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    validator_effective_balance
        .safe_div(spec.effective_balance_increment)?
        .safe_mul(base_reward_per_increment.as_u64())
}

fn get_base_reward_per_increment(
    total_active_balance: u64,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    spec.effective_balance_increment
        .safe_mul(spec.base_reward_factor)?
        .safe_div(total_active_balance.integer_sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_reward_uses_floored_square_root() {
        let spec = ChainSpec::mainnet();
        let increment = spec.effective_balance_increment;

        // isqrt(64 * 10^9) = 252_982
        let per_increment = BaseRewardPerIncrement::new(64 * increment, &spec).unwrap();
        assert_eq!(per_increment.as_u64(), increment * 64 / 252_982);

        let base_reward = get_base_reward(32 * increment + increment / 2, per_increment, &spec);
        assert_eq!(base_reward, Ok(32 * per_increment.as_u64()));
    }

    #[test]
    fn zero_active_balance_is_an_error() {
        let spec = ChainSpec::mainnet();
        assert_eq!(
            BaseRewardPerIncrement::new(0, &spec),
            Err(ArithError::DivisionByZero)
        );
    }
}
