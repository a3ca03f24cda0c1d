//! Instruction encoding and builders.
//!
//! Wire format: `[discriminator: u8] ++ borsh(args)`.
//!
//!   0 = Initialize
//!   1 = Stake
//!   2 = Unstake
//!   3 = ClaimReward
//!   4 = UpdatePool
//!   5 = FundRewards
//!   6 = WithdrawRewards
//!   7 = ClosePosition
//!   8 = InitializeFeeConfig
//!   9 = UpdateFeeConfig

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    error::StakingError,
    find_fee_config_address, find_pool_address, find_position_address, find_reward_vault_address,
    find_stake_vault_address, find_vault_address,
    state::ClaimPolicy,
};

// ── Instruction Discriminators ──────────────────────────────────────────────

pub const IX_INITIALIZE: u8 = 0;
pub const IX_STAKE: u8 = 1;
pub const IX_UNSTAKE: u8 = 2;
pub const IX_CLAIM_REWARD: u8 = 3;
pub const IX_UPDATE_POOL: u8 = 4;
pub const IX_FUND_REWARDS: u8 = 5;
pub const IX_WITHDRAW_REWARDS: u8 = 6;
pub const IX_CLOSE_POSITION: u8 = 7;
pub const IX_INITIALIZE_FEE_CONFIG: u8 = 8;
pub const IX_UPDATE_FEE_CONFIG: u8 = 9;

// ── Args ────────────────────────────────────────────────────────────────────

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeArgs {
    pub reward_rate: u64,
    pub claim_policy: ClaimPolicy,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AmountArgs {
    pub amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdatePoolArgs {
    pub new_reward_rate: u64,
    pub new_authority: Option<Pubkey>,
    pub new_claim_policy: Option<ClaimPolicy>,
}

/// Lamport fees charged to the owner, paid to `fee_wallet`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeeConfigArgs {
    pub fee_wallet: Pubkey,
    pub stake_fee: u64,
    pub unstake_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingInstruction {
    /// Accounts:
    ///   0. [signer, writable] authority (payer)
    ///   1. [writable] pool PDA
    ///   2. [writable] vault PDA
    ///   3. [writable] stake vault token account PDA
    ///   4. [writable] reward vault token account PDA
    ///   5. []         stake mint
    ///   6. []         reward mint
    ///   7. []         token program
    ///   8. []         system program
    Initialize(InitializeArgs),
    /// Accounts:
    ///   0. [signer, writable] owner (payer)
    ///   1. [writable] pool PDA
    ///   2. [writable] position PDA
    ///   3. []         vault PDA
    ///   4. [writable] owner stake token account
    ///   5. [writable] stake vault token account
    ///   6. []         token program
    ///   7. []         system program
    ///   8. []         fee config PDA (may be uninitialized)
    ///   9. [writable] fee wallet, only when the fee config exists
    Stake(AmountArgs),
    /// Accounts:
    ///   0. [signer, writable] owner (pays the unstake fee)
    ///   1. [writable] pool PDA
    ///   2. [writable] position PDA
    ///   3. []         vault PDA
    ///   4. [writable] owner stake token account
    ///   5. [writable] stake vault token account
    ///   6. []         token program
    ///   7. []         system program
    ///   8. []         fee config PDA (may be uninitialized)
    ///   9. [writable] fee wallet, only when the fee config exists
    Unstake(AmountArgs),
    /// Accounts:
    ///   0. [signer]   owner
    ///   1. [writable] pool PDA
    ///   2. [writable] position PDA
    ///   3. [writable] vault PDA
    ///   4. [writable] owner reward token account
    ///   5. [writable] reward vault token account
    ///   6. []         token program
    ClaimReward,
    /// Accounts:
    ///   0. [signer]   authority
    ///   1. [writable] pool PDA
    UpdatePool(UpdatePoolArgs),
    /// Accounts:
    ///   0. [signer]   funder
    ///   1. []         pool PDA
    ///   2. [writable] vault PDA
    ///   3. [writable] funder reward token account
    ///   4. [writable] reward vault token account
    ///   5. []         token program
    FundRewards(AmountArgs),
    /// Accounts:
    ///   0. [signer]   authority
    ///   1. []         pool PDA
    ///   2. [writable] vault PDA
    ///   3. [writable] authority reward token account
    ///   4. [writable] reward vault token account
    ///   5. []         token program
    WithdrawRewards(AmountArgs),
    /// Accounts:
    ///   0. [signer, writable] owner (receives the rent)
    ///   1. [writable] pool PDA
    ///   2. [writable] position PDA
    ClosePosition,
    /// Accounts:
    ///   0. [signer, writable] pool authority (payer)
    ///   1. []         pool PDA
    ///   2. [writable] fee config PDA
    ///   3. []         system program
    InitializeFeeConfig(FeeConfigArgs),
    /// Accounts:
    ///   0. [signer]   pool authority
    ///   1. []         pool PDA
    ///   2. [writable] fee config PDA
    UpdateFeeConfig(FeeConfigArgs),
}

impl StakingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.is_empty() {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (discriminator, data) = input.split_at(1);

        Ok(match discriminator[0] {
            IX_INITIALIZE => Self::Initialize(decode(data)?),
            IX_STAKE => Self::Stake(decode(data)?),
            IX_UNSTAKE => Self::Unstake(decode(data)?),
            IX_CLAIM_REWARD => {
                no_args(data)?;
                Self::ClaimReward
            }
            IX_UPDATE_POOL => Self::UpdatePool(decode(data)?),
            IX_FUND_REWARDS => Self::FundRewards(decode(data)?),
            IX_WITHDRAW_REWARDS => Self::WithdrawRewards(decode(data)?),
            IX_CLOSE_POSITION => {
                no_args(data)?;
                Self::ClosePosition
            }
            IX_INITIALIZE_FEE_CONFIG => Self::InitializeFeeConfig(decode(data)?),
            IX_UPDATE_FEE_CONFIG => Self::UpdateFeeConfig(decode(data)?),
            _ => return Err(StakingError::InvalidInstruction.into()),
        })
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut buf = Vec::new();
        match self {
            Self::Initialize(args) => encode(&mut buf, IX_INITIALIZE, args)?,
            Self::Stake(args) => encode(&mut buf, IX_STAKE, args)?,
            Self::Unstake(args) => encode(&mut buf, IX_UNSTAKE, args)?,
            Self::ClaimReward => buf.push(IX_CLAIM_REWARD),
            Self::UpdatePool(args) => encode(&mut buf, IX_UPDATE_POOL, args)?,
            Self::FundRewards(args) => encode(&mut buf, IX_FUND_REWARDS, args)?,
            Self::WithdrawRewards(args) => encode(&mut buf, IX_WITHDRAW_REWARDS, args)?,
            Self::ClosePosition => buf.push(IX_CLOSE_POSITION),
            Self::InitializeFeeConfig(args) => encode(&mut buf, IX_INITIALIZE_FEE_CONFIG, args)?,
            Self::UpdateFeeConfig(args) => encode(&mut buf, IX_UPDATE_FEE_CONFIG, args)?,
        }
        Ok(buf)
    }
}

fn decode<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::try_from_slice(data).map_err(|_| ProgramError::InvalidInstructionData)
}

fn no_args(data: &[u8]) -> Result<(), ProgramError> {
    if !data.is_empty() {
        return Err(ProgramError::InvalidInstructionData);
    }
    Ok(())
}

fn encode<T: BorshSerialize>(buf: &mut Vec<u8>, discriminator: u8, args: &T) -> Result<(), ProgramError> {
    buf.push(discriminator);
    args.serialize(buf)
        .map_err(|_| ProgramError::InvalidInstructionData)
}

// ── Instruction Builders ────────────────────────────────────────────────────

pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    stake_mint: &Pubkey,
    reward_mint: &Pubkey,
    reward_rate: u64,
    claim_policy: ClaimPolicy,
) -> Result<Instruction, ProgramError> {
    let (pool, _) = find_pool_address(program_id, stake_mint, reward_mint);
    let (vault, _) = find_vault_address(program_id, &pool);
    let (stake_vault, _) = find_stake_vault_address(program_id, &pool);
    let (reward_vault, _) = find_reward_vault_address(program_id, &pool);
    let data = StakingInstruction::Initialize(InitializeArgs {
        reward_rate,
        claim_policy,
    })
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(pool, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(stake_vault, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(*stake_mint, false),
            AccountMeta::new_readonly(*reward_mint, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data,
    })
}

pub fn stake(
    program_id: &Pubkey,
    owner: &Pubkey,
    pool: &Pubkey,
    owner_stake_token: &Pubkey,
    fee_wallet: Option<&Pubkey>,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (position, _) = find_position_address(program_id, pool, owner);
    let (vault, _) = find_vault_address(program_id, pool);
    let (stake_vault, _) = find_stake_vault_address(program_id, pool);
    let data = StakingInstruction::Stake(AmountArgs { amount }).pack()?;

    let mut accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*pool, false),
        AccountMeta::new(position, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new(*owner_stake_token, false),
        AccountMeta::new(stake_vault, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    push_fee_accounts(&mut accounts, program_id, pool, fee_wallet);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Pass `fee_wallet` when the pool has a fee config.
fn push_fee_accounts(
    accounts: &mut Vec<AccountMeta>,
    program_id: &Pubkey,
    pool: &Pubkey,
    fee_wallet: Option<&Pubkey>,
) {
    let (fee_config, _) = find_fee_config_address(program_id, pool);
    accounts.push(AccountMeta::new_readonly(fee_config, false));
    if let Some(wallet) = fee_wallet {
        accounts.push(AccountMeta::new(*wallet, false));
    }
}

pub fn unstake(
    program_id: &Pubkey,
    owner: &Pubkey,
    pool: &Pubkey,
    owner_stake_token: &Pubkey,
    fee_wallet: Option<&Pubkey>,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (position, _) = find_position_address(program_id, pool, owner);
    let (vault, _) = find_vault_address(program_id, pool);
    let (stake_vault, _) = find_stake_vault_address(program_id, pool);
    let data = StakingInstruction::Unstake(AmountArgs { amount }).pack()?;

    let mut accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*pool, false),
        AccountMeta::new(position, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new(*owner_stake_token, false),
        AccountMeta::new(stake_vault, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    push_fee_accounts(&mut accounts, program_id, pool, fee_wallet);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn claim_reward(
    program_id: &Pubkey,
    owner: &Pubkey,
    pool: &Pubkey,
    owner_reward_token: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (position, _) = find_position_address(program_id, pool, owner);
    let (vault, _) = find_vault_address(program_id, pool);
    let (reward_vault, _) = find_reward_vault_address(program_id, pool);
    let data = StakingInstruction::ClaimReward.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*pool, false),
            AccountMeta::new(position, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(*owner_reward_token, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data,
    })
}

pub fn update_pool(
    program_id: &Pubkey,
    authority: &Pubkey,
    pool: &Pubkey,
    args: UpdatePoolArgs,
) -> Result<Instruction, ProgramError> {
    let data = StakingInstruction::UpdatePool(args).pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*pool, false),
        ],
        data,
    })
}

pub fn fund_rewards(
    program_id: &Pubkey,
    funder: &Pubkey,
    pool: &Pubkey,
    funder_reward_token: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (vault, _) = find_vault_address(program_id, pool);
    let (reward_vault, _) = find_reward_vault_address(program_id, pool);
    let data = StakingInstruction::FundRewards(AmountArgs { amount }).pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new_readonly(*pool, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(*funder_reward_token, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data,
    })
}

pub fn withdraw_rewards(
    program_id: &Pubkey,
    authority: &Pubkey,
    pool: &Pubkey,
    authority_reward_token: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (vault, _) = find_vault_address(program_id, pool);
    let (reward_vault, _) = find_reward_vault_address(program_id, pool);
    let data = StakingInstruction::WithdrawRewards(AmountArgs { amount }).pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new_readonly(*pool, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(*authority_reward_token, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data,
    })
}

pub fn close_position(
    program_id: &Pubkey,
    owner: &Pubkey,
    pool: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (position, _) = find_position_address(program_id, pool, owner);
    let data = StakingInstruction::ClosePosition.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(*pool, false),
            AccountMeta::new(position, false),
        ],
        data,
    })
}

pub fn initialize_fee_config(
    program_id: &Pubkey,
    authority: &Pubkey,
    pool: &Pubkey,
    args: FeeConfigArgs,
) -> Result<Instruction, ProgramError> {
    let (fee_config, _) = find_fee_config_address(program_id, pool);
    let data = StakingInstruction::InitializeFeeConfig(args).pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(*pool, false),
            AccountMeta::new(fee_config, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data,
    })
}

pub fn update_fee_config(
    program_id: &Pubkey,
    authority: &Pubkey,
    pool: &Pubkey,
    args: FeeConfigArgs,
) -> Result<Instruction, ProgramError> {
    let (fee_config, _) = find_fee_config_address(program_id, pool);
    let data = StakingInstruction::UpdateFeeConfig(args).pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new_readonly(*pool, false),
            AccountMeta::new(fee_config, false),
        ],
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_rejects_empty_and_unknown() {
        assert_eq!(
            StakingInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            StakingInstruction::unpack(&[255]),
            Err(StakingError::InvalidInstruction.into())
        );
    }

    #[test]
    fn test_unpack_rejects_truncated_args() {
        assert_eq!(
            StakingInstruction::unpack(&[IX_STAKE, 1, 2, 3]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_stake_wire_layout() {
        let data = StakingInstruction::Stake(AmountArgs { amount: 1_000 }).pack().unwrap();
        assert_eq!(data[0], IX_STAKE);
        assert_eq!(&data[1..], &1_000u64.to_le_bytes());
    }

    #[test]
    fn test_update_pool_decodes_options() {
        let ix = StakingInstruction::UpdatePool(UpdatePoolArgs {
            new_reward_rate: 5,
            new_authority: None,
            new_claim_policy: Some(ClaimPolicy::NoOpOnZero),
        });
        let data = ix.pack().unwrap();
        assert_eq!(StakingInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_argless_instructions_reject_trailing_bytes() {
        assert_eq!(
            StakingInstruction::unpack(&[IX_CLAIM_REWARD, 0]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            StakingInstruction::unpack(&[IX_CLOSE_POSITION, 1, 2]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_fee_config_decodes() {
        let ix = StakingInstruction::UpdateFeeConfig(FeeConfigArgs {
            fee_wallet: Pubkey::new_unique(),
            stake_fee: 10,
            unstake_fee: 0,
        });
        let data = ix.pack().unwrap();
        assert_eq!(data[0], IX_UPDATE_FEE_CONFIG);
        assert_eq!(data.len(), 1 + 32 + 8 + 8);
        assert_eq!(StakingInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_stake_builder_appends_fee_wallet() {
        let program_id = Pubkey::new_unique();
        let (owner, pool, token, wallet) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let without = stake(&program_id, &owner, &pool, &token, None, 5).unwrap();
        assert_eq!(without.accounts.len(), 9);
        assert_eq!(without.accounts[8].pubkey, find_fee_config_address(&program_id, &pool).0);

        let with = unstake(&program_id, &owner, &pool, &token, Some(&wallet), 5).unwrap();
        assert_eq!(with.accounts.len(), 10);
        assert!(with.accounts[0].is_writable);
        assert_eq!(with.accounts[9].pubkey, wallet);
        assert!(with.accounts[9].is_writable);
    }

    #[test]
    fn test_argless_instructions_are_one_byte() {
        assert_eq!(StakingInstruction::ClaimReward.pack().unwrap(), vec![IX_CLAIM_REWARD]);
        assert_eq!(
            StakingInstruction::unpack(&[IX_CLOSE_POSITION]).unwrap(),
            StakingInstruction::ClosePosition
        );
    }
}
