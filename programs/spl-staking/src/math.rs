// ---------------------------------------------------------------------------
// Reward accumulator math
// ---------------------------------------------------------------------------
//
// acc_reward_per_share grows by `elapsed * reward_rate / total_staked` per
// accrual, scaled by PRECISION. A position earns
// `amount * (acc - reward_debt) / PRECISION` since its last settlement.

use crate::{
    error::StakingError,
    state::{Pool, StakePosition},
};

/// Fixed-point scale of `acc_reward_per_share` (1e12).
pub const PRECISION: u128 = 1_000_000_000_000;

/// Accumulator increase for `elapsed` seconds at `reward_rate` spread over
/// `total_staked` units. Nothing is distributed while nothing is staked.
pub fn reward_per_share_delta(
    elapsed: u64,
    reward_rate: u64,
    total_staked: u64,
) -> Result<u128, StakingError> {
    if total_staked == 0 {
        return Ok(0);
    }
    let scaled = (elapsed as u128)
        .checked_mul(reward_rate as u128)
        .ok_or(StakingError::ArithmeticOverflow)?
        .checked_mul(PRECISION)
        .ok_or(StakingError::ArithmeticOverflow)?;
    Ok(scaled / total_staked as u128)
}

/// Bring the pool accumulator current to `now`.
///
/// With nothing staked the accumulator is left alone but the timestamp still
/// advances, so an empty interval never pays out later. A clock reading older
/// than the last update is a no-op.
pub fn accrue(pool: &mut Pool, now: i64) -> Result<(), StakingError> {
    if now <= pool.last_update_ts {
        return Ok(());
    }

    let elapsed = now
        .checked_sub(pool.last_update_ts)
        .and_then(|d| u64::try_from(d).ok())
        .ok_or(StakingError::ArithmeticOverflow)?;

    if pool.total_staked > 0 {
        let delta = reward_per_share_delta(elapsed, pool.reward_rate, pool.total_staked)?;
        pool.acc_reward_per_share = pool
            .acc_reward_per_share
            .checked_add(delta)
            .ok_or(StakingError::ArithmeticOverflow)?;
    }
    pool.last_update_ts = now;
    Ok(())
}

/// Reward earned by `position` between its last settlement and `acc`.
pub fn pending_reward(position: &StakePosition, acc: u128) -> Result<u64, StakingError> {
    let delta = acc
        .checked_sub(position.reward_debt)
        .ok_or(StakingError::ArithmeticOverflow)?;

    let pending = (position.amount as u128)
        .checked_mul(delta)
        .ok_or(StakingError::ArithmeticOverflow)?
        / PRECISION;

    u64::try_from(pending).map_err(|_| StakingError::ArithmeticOverflow)
}

/// Move pending reward into `unclaimed_reward` and snapshot the accumulator.
/// The pool must already be accrued. Returns the amount settled.
pub fn settle(position: &mut StakePosition, pool: &Pool) -> Result<u64, StakingError> {
    let pending = pending_reward(position, pool.acc_reward_per_share)?;
    position.unclaimed_reward = position
        .unclaimed_reward
        .checked_add(pending)
        .ok_or(StakingError::ArithmeticOverflow)?;
    position.reward_debt = pool.acc_reward_per_share;
    Ok(pending)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
