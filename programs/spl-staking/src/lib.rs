// SPL Staking Program
// Stake an SPL token into a program-owned vault and earn a second SPL token
// through a reward-per-share accumulator.

pub mod error;
pub mod instruction;
pub mod math;
pub mod processor;
pub mod state;
pub mod validation;

use solana_program::pubkey::Pubkey;

pub use processor::process_instruction;

// ---------------------------------------------------------------------------
// Program ID
// ---------------------------------------------------------------------------

solana_program::declare_id!("9GAsSHWvHoHoqbk8tqHYCq3fcpyGmovgXD5GBkSo4p3f");

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

// ---------------------------------------------------------------------------
// PDA seeds
// ---------------------------------------------------------------------------

pub const POOL_SEED: &[u8] = b"pool";
pub const POSITION_SEED: &[u8] = b"position";
pub const VAULT_SEED: &[u8] = b"vault";
pub const STAKE_VAULT_SEED: &[u8] = b"stake_vault";
pub const REWARD_VAULT_SEED: &[u8] = b"reward_vault";
pub const FEE_CONFIG_SEED: &[u8] = b"fee_config";

/// Pool for one (stake mint, reward mint) pair.
pub fn find_pool_address(
    program_id: &Pubkey,
    stake_mint: &Pubkey,
    reward_mint: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[POOL_SEED, stake_mint.as_ref(), reward_mint.as_ref()],
        program_id,
    )
}

pub fn find_position_address(program_id: &Pubkey, pool: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POSITION_SEED, pool.as_ref(), owner.as_ref()], program_id)
}

/// Vault record; also the token owner of both vault token accounts.
pub fn find_vault_address(program_id: &Pubkey, pool: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, pool.as_ref()], program_id)
}

pub fn find_stake_vault_address(program_id: &Pubkey, pool: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_VAULT_SEED, pool.as_ref()], program_id)
}

pub fn find_reward_vault_address(program_id: &Pubkey, pool: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REWARD_VAULT_SEED, pool.as_ref()], program_id)
}

pub fn find_fee_config_address(program_id: &Pubkey, pool: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[FEE_CONFIG_SEED, pool.as_ref()], program_id)
}
