// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
//
// Every record starts with a one-byte `AccountType` so a handler can refuse
// bytes that belong to a different record kind before decoding them.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::StakingError;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountType {
    Uninitialized = 0,
    Pool = 1,
    StakePosition = 2,
    Vault = 3,
    FeeConfig = 4,
}

impl TryFrom<u8> for AccountType {
    type Error = StakingError;
    fn try_from(v: u8) -> Result<Self, StakingError> {
        match v {
            0 => Ok(AccountType::Uninitialized),
            1 => Ok(AccountType::Pool),
            2 => Ok(AccountType::StakePosition),
            3 => Ok(AccountType::Vault),
            4 => Ok(AccountType::FeeConfig),
            _ => Err(StakingError::MalformedAccount),
        }
    }
}

/// What `claim_reward` does when the position has nothing to pay out.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClaimPolicy {
    /// Reject the transaction with `NoRewardAvailable`.
    #[default]
    FailOnZero = 0,
    /// Succeed without moving tokens.
    NoOpOnZero = 1,
}

/// Fixed-size record stored in a program-owned account.
pub trait StakingRecord: BorshSerialize + BorshDeserialize {
    const ACCOUNT_TYPE: AccountType;
    const SIZE: usize;

    /// Decode a record, rejecting wrong lengths and foreign discriminators.
    fn unpack(data: &[u8]) -> Result<Self, StakingError> {
        if data.len() != Self::SIZE {
            return Err(StakingError::AccountSizeMismatch);
        }
        if data[0] != Self::ACCOUNT_TYPE as u8 {
            return Err(StakingError::MalformedAccount);
        }
        Self::try_from_slice(data).map_err(|_| StakingError::MalformedAccount)
    }

    fn pack(&self, dst: &mut [u8]) -> Result<(), StakingError> {
        if dst.len() != Self::SIZE {
            return Err(StakingError::AccountSizeMismatch);
        }
        self.serialize(&mut &mut dst[..])
            .map_err(|_| StakingError::MalformedAccount)
    }
}

// ---------------------------------------------------------------------------
// State: Pool
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub account_type: AccountType,    // 1
    pub authority: Pubkey,            // 32
    pub stake_mint: Pubkey,           // 32
    pub reward_mint: Pubkey,          // 32
    pub vault: Pubkey,                // 32
    pub total_staked: u64,            // 8
    /// Reward base units released per second across the whole pool.
    pub reward_rate: u64,             // 8
    pub last_update_ts: i64,          // 8
    /// Accumulated reward per staked unit, scaled by `math::PRECISION`.
    pub acc_reward_per_share: u128,   // 16
    pub claim_policy: ClaimPolicy,    // 1
    pub bump: u8,                     // 1
}

impl StakingRecord for Pool {
    const ACCOUNT_TYPE: AccountType = AccountType::Pool;
    // 1 + 32*4 + 8 + 8 + 8 + 16 + 1 + 1 = 171
    const SIZE: usize = 171;
}

// ---------------------------------------------------------------------------
// State: StakePosition
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakePosition {
    pub account_type: AccountType,    // 1
    pub owner: Pubkey,                // 32
    pub pool: Pubkey,                 // 32
    pub amount: u64,                  // 8
    /// Pool accumulator value at the last settlement.
    pub reward_debt: u128,            // 16
    /// Settled reward waiting to be claimed.
    pub unclaimed_reward: u64,        // 8
    pub last_interaction_ts: i64,     // 8
    pub bump: u8,                     // 1
}

impl StakingRecord for StakePosition {
    const ACCOUNT_TYPE: AccountType = AccountType::StakePosition;
    // 1 + 32 + 32 + 8 + 16 + 8 + 8 + 1 = 106
    const SIZE: usize = 106;
}

impl StakePosition {
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.unclaimed_reward == 0
    }
}

// ---------------------------------------------------------------------------
// State: Vault
// ---------------------------------------------------------------------------

/// Custody record for a pool. The vault PDA is the SPL token owner of both
/// token accounts, so only this program can sign transfers out of them.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub account_type: AccountType,    // 1
    pub pool: Pubkey,                 // 32
    pub stake_token_account: Pubkey,  // 32
    pub reward_token_account: Pubkey, // 32
    /// Reward tokens funded and not yet paid out or withdrawn.
    pub reward_balance: u64,          // 8
    pub total_rewards_paid: u64,      // 8
    pub bump: u8,                     // 1
    pub stake_vault_bump: u8,         // 1
    pub reward_vault_bump: u8,        // 1
}

impl StakingRecord for Vault {
    const ACCOUNT_TYPE: AccountType = AccountType::Vault;
    // 1 + 32*3 + 8 + 8 + 1 + 1 + 1 = 116
    const SIZE: usize = 116;
}

// ---------------------------------------------------------------------------
// State: FeeConfig
// ---------------------------------------------------------------------------

/// Flat lamport fees charged to the owner on stake and unstake, paid to
/// `fee_wallet`. Optional per pool.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeeConfig {
    pub account_type: AccountType,    // 1
    pub pool: Pubkey,                 // 32
    pub fee_wallet: Pubkey,           // 32
    pub stake_fee: u64,               // 8
    pub unstake_fee: u64,             // 8
    pub bump: u8,                     // 1
}

impl StakingRecord for FeeConfig {
    const ACCOUNT_TYPE: AccountType = AccountType::FeeConfig;
    // 1 + 32 + 32 + 8 + 8 + 1 = 82
    const SIZE: usize = 82;
}

// ---------------------------------------------------------------------------
// Account dispatch
// ---------------------------------------------------------------------------

/// Any record owned by the program, selected by its discriminator byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingAccount {
    Pool(Pool),
    StakePosition(StakePosition),
    Vault(Vault),
    FeeConfig(FeeConfig),
}

impl StakingAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, StakingError> {
        let tag = data.first().ok_or(StakingError::AccountSizeMismatch)?;
        match AccountType::try_from(*tag)? {
            AccountType::Pool => Pool::unpack(data).map(StakingAccount::Pool),
            AccountType::StakePosition => {
                StakePosition::unpack(data).map(StakingAccount::StakePosition)
            }
            AccountType::Vault => Vault::unpack(data).map(StakingAccount::Vault),
            AccountType::FeeConfig => FeeConfig::unpack(data).map(StakingAccount::FeeConfig),
            AccountType::Uninitialized => Err(StakingError::MalformedAccount),
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            StakingAccount::Pool(_) => AccountType::Pool,
            StakingAccount::StakePosition(_) => AccountType::StakePosition,
            StakingAccount::Vault(_) => AccountType::Vault,
            StakingAccount::FeeConfig(_) => AccountType::FeeConfig,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> Pool {
        Pool {
            account_type: AccountType::Pool,
            authority: Pubkey::new_unique(),
            stake_mint: Pubkey::new_unique(),
            reward_mint: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            total_staked: 1_000,
            reward_rate: 100,
            last_update_ts: 1_700_000_000,
            acc_reward_per_share: 42,
            claim_policy: ClaimPolicy::FailOnZero,
            bump: 255,
        }
    }

    fn sample_position() -> StakePosition {
        StakePosition {
            account_type: AccountType::StakePosition,
            owner: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            amount: 500,
            reward_debt: 7,
            unclaimed_reward: 3,
            last_interaction_ts: 1_700_000_000,
            bump: 254,
        }
    }

    fn sample_vault() -> Vault {
        Vault {
            account_type: AccountType::Vault,
            pool: Pubkey::new_unique(),
            stake_token_account: Pubkey::new_unique(),
            reward_token_account: Pubkey::new_unique(),
            reward_balance: 10_000,
            total_rewards_paid: 0,
            bump: 253,
            stake_vault_bump: 252,
            reward_vault_bump: 251,
        }
    }

    fn sample_fee_config() -> FeeConfig {
        FeeConfig {
            account_type: AccountType::FeeConfig,
            pool: Pubkey::new_unique(),
            fee_wallet: Pubkey::new_unique(),
            stake_fee: 5_000,
            unstake_fee: 7_000,
            bump: 250,
        }
    }

    #[test]
    fn test_pool_size() {
        let serialized = borsh::to_vec(&sample_pool()).unwrap();
        assert_eq!(serialized.len(), Pool::SIZE);
    }

    #[test]
    fn test_position_size() {
        let serialized = borsh::to_vec(&sample_position()).unwrap();
        assert_eq!(serialized.len(), StakePosition::SIZE);
    }

    #[test]
    fn test_vault_size() {
        let serialized = borsh::to_vec(&sample_vault()).unwrap();
        assert_eq!(serialized.len(), Vault::SIZE);
    }

    #[test]
    fn test_fee_config_size() {
        let serialized = borsh::to_vec(&sample_fee_config()).unwrap();
        assert_eq!(serialized.len(), FeeConfig::SIZE);
    }

    #[test]
    fn test_discriminator_is_first_byte() {
        assert_eq!(borsh::to_vec(&sample_pool()).unwrap()[0], 1);
        assert_eq!(borsh::to_vec(&sample_position()).unwrap()[0], 2);
        assert_eq!(borsh::to_vec(&sample_vault()).unwrap()[0], 3);
        assert_eq!(borsh::to_vec(&sample_fee_config()).unwrap()[0], 4);
    }

    #[test]
    fn test_unpack_rejects_wrong_length() {
        let mut bytes = borsh::to_vec(&sample_pool()).unwrap();
        bytes.push(0);
        assert_eq!(Pool::unpack(&bytes), Err(StakingError::AccountSizeMismatch));
        assert_eq!(Pool::unpack(&[]), Err(StakingError::AccountSizeMismatch));
    }

    #[test]
    fn test_unpack_rejects_foreign_discriminator() {
        let mut bytes = borsh::to_vec(&sample_pool()).unwrap();
        bytes[0] = AccountType::Vault as u8;
        assert_eq!(Pool::unpack(&bytes), Err(StakingError::MalformedAccount));

        // A zeroed buffer of the right size is still not a pool.
        let zeroed = vec![0u8; Pool::SIZE];
        assert_eq!(Pool::unpack(&zeroed), Err(StakingError::MalformedAccount));
    }

    #[test]
    fn test_unpack_rejects_bad_enum_payload() {
        let mut bytes = borsh::to_vec(&sample_pool()).unwrap();
        // claim_policy sits one byte before the trailing bump.
        bytes[Pool::SIZE - 2] = 9;
        assert_eq!(Pool::unpack(&bytes), Err(StakingError::MalformedAccount));
    }

    #[test]
    fn test_pack_into_wrong_size_buffer() {
        let mut small = vec![0u8; Vault::SIZE - 1];
        assert_eq!(
            sample_vault().pack(&mut small),
            Err(StakingError::AccountSizeMismatch)
        );
    }

    #[test]
    fn test_pack_then_unpack() {
        let position = sample_position();
        let mut buf = vec![0u8; StakePosition::SIZE];
        position.pack(&mut buf).unwrap();
        assert_eq!(StakePosition::unpack(&buf).unwrap(), position);
    }

    #[test]
    fn test_staking_account_dispatch() {
        let bytes = borsh::to_vec(&sample_vault()).unwrap();
        let account = StakingAccount::unpack(&bytes).unwrap();
        assert_eq!(account.account_type(), AccountType::Vault);

        let fees = sample_fee_config();
        let bytes = borsh::to_vec(&fees).unwrap();
        assert_eq!(StakingAccount::unpack(&bytes).unwrap(), StakingAccount::FeeConfig(fees));

        let bytes = borsh::to_vec(&sample_position()).unwrap();
        assert!(matches!(
            StakingAccount::unpack(&bytes).unwrap(),
            StakingAccount::StakePosition(p) if p.amount == 500
        ));

        assert_eq!(
            StakingAccount::unpack(&[0u8; Pool::SIZE]),
            Err(StakingError::MalformedAccount)
        );
        assert_eq!(StakingAccount::unpack(&[]), Err(StakingError::AccountSizeMismatch));
        assert_eq!(StakingAccount::unpack(&[77]), Err(StakingError::MalformedAccount));
    }

    #[test]
    fn test_account_type_roundtrip() {
        assert_eq!(AccountType::try_from(1).unwrap(), AccountType::Pool);
        assert_eq!(AccountType::try_from(2).unwrap(), AccountType::StakePosition);
        assert_eq!(AccountType::try_from(3).unwrap(), AccountType::Vault);
        assert_eq!(AccountType::try_from(4).unwrap(), AccountType::FeeConfig);
        assert!(AccountType::try_from(5).is_err());
    }
}
