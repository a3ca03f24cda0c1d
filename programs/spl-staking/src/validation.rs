//! Account checks shared by every handler. All of them run before a handler
//! mutates anything, so a failed check leaves no trace.

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};
use spl_token::state::Account as TokenAccount;

use crate::{
    error::StakingError,
    find_fee_config_address, find_pool_address, find_position_address, find_vault_address,
    state::{FeeConfig, Pool, StakePosition, StakingRecord, Vault},
};

// ---------------------------------------------------------------------------
// Signer / writable / owner
// ---------------------------------------------------------------------------

pub fn assert_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(StakingError::Unauthorized.into());
    }
    Ok(())
}

pub fn assert_writable(account: &AccountInfo) -> ProgramResult {
    if !account.is_writable {
        return Err(StakingError::AccountNotWritable.into());
    }
    Ok(())
}

pub fn assert_owned_by(account: &AccountInfo, owner: &Pubkey) -> ProgramResult {
    if account.owner != owner {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    Ok(())
}

pub fn assert_token_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != spl_token::ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

pub fn assert_system_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != system_program::ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

/// Two accounts passed for different roles must not be the same account.
pub fn assert_distinct(a: &AccountInfo, b: &AccountInfo) -> ProgramResult {
    if a.key == b.key {
        return Err(StakingError::PoolMismatch.into());
    }
    Ok(())
}

/// Check `account` is the PDA for `seeds` and return its bump.
pub fn assert_pda(account: &AccountInfo, seeds: &[&[u8]], program_id: &Pubkey) -> Result<u8, ProgramError> {
    let (expected, bump) = Pubkey::find_program_address(seeds, program_id);
    if *account.key != expected {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    Ok(bump)
}

// ---------------------------------------------------------------------------
// Record loading
// ---------------------------------------------------------------------------

/// Decode a program-owned record of type `T`.
pub fn load<T: StakingRecord>(account: &AccountInfo, program_id: &Pubkey) -> Result<T, ProgramError> {
    assert_owned_by(account, program_id)?;
    let data = account.try_borrow_data()?;
    Ok(T::unpack(&data)?)
}

pub fn store<T: StakingRecord>(record: &T, account: &AccountInfo) -> ProgramResult {
    let mut data = account.try_borrow_mut_data()?;
    record.pack(&mut data)?;
    Ok(())
}

/// Load the pool and confirm the account sits at the PDA of its own mints.
pub fn load_pool(account: &AccountInfo, program_id: &Pubkey) -> Result<Pool, ProgramError> {
    let pool: Pool = load(account, program_id)?;
    let (expected, _) = find_pool_address(program_id, &pool.stake_mint, &pool.reward_mint);
    if *account.key != expected {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    Ok(pool)
}

/// Load the vault of `pool`. The address must be both the pool's recorded
/// vault and the vault PDA; the record must point back at the pool.
pub fn load_vault(
    account: &AccountInfo,
    pool_key: &Pubkey,
    pool: &Pool,
    program_id: &Pubkey,
) -> Result<Vault, ProgramError> {
    let (expected, _) = find_vault_address(program_id, pool_key);
    if *account.key != expected || *account.key != pool.vault {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    let vault: Vault = load(account, program_id)?;
    if vault.pool != *pool_key {
        return Err(StakingError::PoolMismatch.into());
    }
    Ok(vault)
}

/// Load an existing position of `owner` in `pool_key`.
pub fn load_position(
    account: &AccountInfo,
    pool_key: &Pubkey,
    owner: &Pubkey,
    program_id: &Pubkey,
) -> Result<StakePosition, ProgramError> {
    let (expected, _) = find_position_address(program_id, pool_key, owner);
    if *account.key != expected {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    let position: StakePosition = load(account, program_id)?;
    assert_position_matches(&position, pool_key, owner)?;
    Ok(position)
}

/// Load the pool's fee config, or `None` when it was never created.
pub fn load_fee_config(
    account: &AccountInfo,
    pool_key: &Pubkey,
    program_id: &Pubkey,
) -> Result<Option<FeeConfig>, ProgramError> {
    let (expected, _) = find_fee_config_address(program_id, pool_key);
    if *account.key != expected {
        return Err(StakingError::InvalidAccountOwner.into());
    }
    if account.data_is_empty() && *account.owner == system_program::ID {
        return Ok(None);
    }
    let config: FeeConfig = load(account, program_id)?;
    if config.pool != *pool_key {
        return Err(StakingError::PoolMismatch.into());
    }
    Ok(Some(config))
}

pub fn assert_position_matches(
    position: &StakePosition,
    pool_key: &Pubkey,
    owner: &Pubkey,
) -> ProgramResult {
    if position.pool != *pool_key {
        return Err(StakingError::PoolMismatch.into());
    }
    if position.owner != *owner {
        return Err(StakingError::Unauthorized.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Token accounts
// ---------------------------------------------------------------------------

/// The vault token account passed must be the one recorded on the vault.
pub fn assert_vault_token_account(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        return Err(StakingError::PoolMismatch.into());
    }
    Ok(())
}

/// Unpack a user token account and check it holds `mint`.
pub fn unpack_token_account(account: &AccountInfo, mint: &Pubkey) -> Result<TokenAccount, ProgramError> {
    assert_owned_by(account, &spl_token::ID)?;
    let token_account = TokenAccount::unpack(&account.try_borrow_data()?)?;
    if token_account.mint != *mint {
        return Err(StakingError::PoolMismatch.into());
    }
    Ok(token_account)
}
