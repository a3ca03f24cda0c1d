// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------
//
// Each handler: parse accounts, run every validation check, load state once,
// apply a pure transition (accrual first), write state back, then move
// tokens. Any error aborts the transaction before anything is committed.

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::{
    error::StakingError,
    instruction::{AmountArgs, FeeConfigArgs, InitializeArgs, StakingInstruction, UpdatePoolArgs},
    math::{accrue, settle},
    state::{AccountType, ClaimPolicy, FeeConfig, Pool, StakePosition, StakingRecord, Vault},
    validation::{
        assert_distinct, assert_owned_by, assert_pda, assert_position_matches, assert_signer,
        assert_system_program, assert_token_program, assert_vault_token_account,
        assert_writable, load, load_fee_config, load_pool, load_position, load_vault, store,
        unpack_token_account,
    },
    FEE_CONFIG_SEED, POOL_SEED, POSITION_SEED, REWARD_VAULT_SEED, STAKE_VAULT_SEED, VAULT_SEED,
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    match StakingInstruction::unpack(instruction_data)? {
        StakingInstruction::Initialize(args) => process_initialize(program_id, accounts, args),
        StakingInstruction::Stake(args) => process_stake(program_id, accounts, args),
        StakingInstruction::Unstake(args) => process_unstake(program_id, accounts, args),
        StakingInstruction::ClaimReward => process_claim_reward(program_id, accounts),
        StakingInstruction::UpdatePool(args) => process_update_pool(program_id, accounts, args),
        StakingInstruction::FundRewards(args) => process_fund_rewards(program_id, accounts, args),
        StakingInstruction::WithdrawRewards(args) => {
            process_withdraw_rewards(program_id, accounts, args)
        }
        StakingInstruction::ClosePosition => process_close_position(program_id, accounts),
        StakingInstruction::InitializeFeeConfig(args) => {
            process_initialize_fee_config(program_id, accounts, args)
        }
        StakingInstruction::UpdateFeeConfig(args) => {
            process_update_fee_config(program_id, accounts, args)
        }
    }
}

// ---------------------------------------------------------------------------
// State transitions
// ---------------------------------------------------------------------------
//
// Pure functions over decoded records. Every one accrues the pool before it
// touches total_staked, a position amount, a reward_debt or the rate.

pub(crate) fn apply_stake(
    pool: &mut Pool,
    position: &mut StakePosition,
    is_new: bool,
    amount: u64,
    now: i64,
) -> Result<(), StakingError> {
    if amount == 0 {
        return Err(StakingError::InvalidAmount);
    }

    accrue(pool, now)?;
    if is_new {
        position.reward_debt = pool.acc_reward_per_share;
    } else {
        settle(position, pool)?;
    }

    position.amount = position
        .amount
        .checked_add(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    pool.total_staked = pool
        .total_staked
        .checked_add(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    position.last_interaction_ts = now;
    Ok(())
}

pub(crate) fn apply_unstake(
    pool: &mut Pool,
    position: &mut StakePosition,
    amount: u64,
    now: i64,
) -> Result<(), StakingError> {
    if amount == 0 || amount > position.amount {
        return Err(StakingError::InsufficientStake);
    }

    accrue(pool, now)?;
    settle(position, pool)?;

    position.amount = position
        .amount
        .checked_sub(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    pool.total_staked = pool
        .total_staked
        .checked_sub(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    position.last_interaction_ts = now;
    Ok(())
}

/// Settle and pay out everything the position has earned. Returns the
/// payout, which is zero only under `ClaimPolicy::NoOpOnZero`.
pub(crate) fn apply_claim(
    pool: &mut Pool,
    position: &mut StakePosition,
    vault: &mut Vault,
    now: i64,
) -> Result<u64, StakingError> {
    accrue(pool, now)?;
    settle(position, pool)?;

    let payout = position.unclaimed_reward;
    if payout == 0 && pool.claim_policy == ClaimPolicy::FailOnZero {
        return Err(StakingError::NoRewardAvailable);
    }
    if payout > vault.reward_balance {
        return Err(StakingError::InsufficientRewardFunds);
    }

    vault.reward_balance -= payout;
    vault.total_rewards_paid = vault
        .total_rewards_paid
        .checked_add(payout)
        .ok_or(StakingError::ArithmeticOverflow)?;
    position.unclaimed_reward = 0;
    position.last_interaction_ts = now;
    Ok(payout)
}

/// Accrue at the old rate, then commit the new settings.
pub(crate) fn apply_pool_update(
    pool: &mut Pool,
    args: &UpdatePoolArgs,
    now: i64,
) -> Result<(), StakingError> {
    accrue(pool, now)?;
    pool.reward_rate = args.new_reward_rate;
    if let Some(new_authority) = args.new_authority {
        pool.authority = new_authority;
    }
    if let Some(policy) = args.new_claim_policy {
        pool.claim_policy = policy;
    }
    Ok(())
}

pub(crate) fn apply_close(
    pool: &mut Pool,
    position: &mut StakePosition,
    now: i64,
) -> Result<(), StakingError> {
    accrue(pool, now)?;
    settle(position, pool)?;
    if !position.is_empty() {
        return Err(StakingError::PositionNotEmpty);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Create a PDA owned by `owner`. An address that already holds lamports
/// cannot go through `create_account`, so it is topped up to rent exemption
/// and then allocated and assigned in place.
fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let required = rent.minimum_balance(space).max(1);

    if new_account.lamports() > 0 {
        let top_up = required.saturating_sub(new_account.lamports());
        if top_up > 0 {
            transfer_lamports(payer, new_account, top_up, system_program)?;
        }

        invoke_signed(
            &system_instruction::allocate(new_account.key, space as u64),
            &[new_account.clone(), system_program.clone()],
            &[seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(new_account.key, owner),
            &[new_account.clone(), system_program.clone()],
            &[seeds],
        )
    } else {
        invoke_signed(
            &system_instruction::create_account(payer.key, new_account.key, required, space as u64, owner),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        )
    }
}

fn transfer_lamports<'a>(
    from: &AccountInfo<'a>,
    to: &AccountInfo<'a>,
    amount: u64,
    system_program: &AccountInfo<'a>,
) -> ProgramResult {
    invoke(
        &system_instruction::transfer(from.key, to.key, amount),
        &[from.clone(), to.clone(), system_program.clone()],
    )
}

/// Read the fee config slot that follows the fixed accounts. When the pool
/// has a fee config, the fee wallet must come next.
fn resolve_fee<'a, 'b, I>(
    account_iter: &mut I,
    pool_key: &Pubkey,
    program_id: &Pubkey,
    fee_of: fn(&FeeConfig) -> u64,
) -> Result<Option<(&'a AccountInfo<'b>, u64)>, ProgramError>
where
    I: Iterator<Item = &'a AccountInfo<'b>>,
{
    let fee_config_account = next_account_info(account_iter)?;
    let config = match load_fee_config(fee_config_account, pool_key, program_id)? {
        Some(config) => config,
        None => return Ok(None),
    };

    let fee_wallet = next_account_info(account_iter)?;
    if *fee_wallet.key != config.fee_wallet {
        return Err(StakingError::FeeWalletMismatch.into());
    }
    assert_writable(fee_wallet)?;
    Ok(Some((fee_wallet, fee_of(&config))))
}

fn charge_fee<'a>(
    owner: &AccountInfo<'a>,
    fee: Option<(&AccountInfo<'a>, u64)>,
    system_program: &AccountInfo<'a>,
) -> Result<u64, ProgramError> {
    match fee {
        Some((fee_wallet, amount)) if amount > 0 => {
            transfer_lamports(owner, fee_wallet, amount, system_program)?;
            Ok(amount)
        }
        _ => Ok(0),
    }
}

/// Create a PDA token account for `mint` whose token owner is `owner`.
fn create_token_vault<'a>(
    payer: &AccountInfo<'a>,
    token_account: &AccountInfo<'a>,
    mint: &AccountInfo<'a>,
    owner: &Pubkey,
    token_program: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    create_pda_account(
        payer,
        spl_token::state::Account::LEN,
        &spl_token::ID,
        system_program,
        token_account,
        seeds,
    )?;

    invoke(
        &spl_token::instruction::initialize_account3(
            &spl_token::ID,
            token_account.key,
            mint.key,
            owner,
        )?,
        &[token_account.clone(), mint.clone(), token_program.clone()],
    )
}

fn transfer_spl_tokens<'a>(
    source: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    token_program: &AccountInfo<'a>,
    amount: u64,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    let ix = spl_token::instruction::transfer(
        token_program.key,
        source.key,
        destination.key,
        authority.key,
        &[],
        amount,
    )?;

    if signer_seeds.is_empty() {
        invoke(&ix, &[source.clone(), destination.clone(), authority.clone(), token_program.clone()])
    } else {
        invoke_signed(
            &ix,
            &[source.clone(), destination.clone(), authority.clone(), token_program.clone()],
            &[signer_seeds],
        )
    }
}

/// Drain a program account into `destination` and hand it back to the
/// system program with zeroed data.
fn close_program_account<'a>(account: &AccountInfo<'a>, destination: &AccountInfo<'a>) -> ProgramResult {
    let lamports = account.lamports();
    **destination.try_borrow_mut_lamports()? = destination
        .lamports()
        .checked_add(lamports)
        .ok_or(StakingError::ArithmeticOverflow)?;
    **account.try_borrow_mut_lamports()? = 0;

    account.try_borrow_mut_data()?.fill(0);
    account.assign(&system_program::ID);
    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Initialize (discriminator 0)
// ---------------------------------------------------------------------------

fn process_initialize(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: InitializeArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let authority = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let stake_mint = next_account_info(account_iter)?;
    let reward_mint = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(authority)?;
    assert_writable(authority)?;
    assert_writable(pool_account)?;
    assert_writable(vault_account)?;
    assert_writable(stake_vault)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;
    assert_system_program(system_program)?;
    assert_owned_by(stake_mint, &spl_token::ID)?;
    assert_owned_by(reward_mint, &spl_token::ID)?;

    let pool_bump = assert_pda(
        pool_account,
        &[POOL_SEED, stake_mint.key.as_ref(), reward_mint.key.as_ref()],
        program_id,
    )?;
    if !pool_account.data_is_empty() {
        return Err(StakingError::AlreadyInitialized.into());
    }

    let pool_key = *pool_account.key;
    let vault_bump = assert_pda(vault_account, &[VAULT_SEED, pool_key.as_ref()], program_id)?;
    let stake_vault_bump =
        assert_pda(stake_vault, &[STAKE_VAULT_SEED, pool_key.as_ref()], program_id)?;
    let reward_vault_bump =
        assert_pda(reward_vault, &[REWARD_VAULT_SEED, pool_key.as_ref()], program_id)?;
    if !vault_account.data_is_empty() {
        return Err(StakingError::AlreadyInitialized.into());
    }

    create_pda_account(
        authority,
        Pool::SIZE,
        program_id,
        system_program,
        pool_account,
        &[POOL_SEED, stake_mint.key.as_ref(), reward_mint.key.as_ref(), &[pool_bump]],
    )?;
    create_pda_account(
        authority,
        Vault::SIZE,
        program_id,
        system_program,
        vault_account,
        &[VAULT_SEED, pool_key.as_ref(), &[vault_bump]],
    )?;
    create_token_vault(
        authority,
        stake_vault,
        stake_mint,
        vault_account.key,
        token_program,
        system_program,
        &[STAKE_VAULT_SEED, pool_key.as_ref(), &[stake_vault_bump]],
    )?;
    create_token_vault(
        authority,
        reward_vault,
        reward_mint,
        vault_account.key,
        token_program,
        system_program,
        &[REWARD_VAULT_SEED, pool_key.as_ref(), &[reward_vault_bump]],
    )?;

    let clock = Clock::get()?;

    let pool = Pool {
        account_type: AccountType::Pool,
        authority: *authority.key,
        stake_mint: *stake_mint.key,
        reward_mint: *reward_mint.key,
        vault: *vault_account.key,
        total_staked: 0,
        reward_rate: args.reward_rate,
        last_update_ts: clock.unix_timestamp,
        acc_reward_per_share: 0,
        claim_policy: args.claim_policy,
        bump: pool_bump,
    };
    let vault = Vault {
        account_type: AccountType::Vault,
        pool: pool_key,
        stake_token_account: *stake_vault.key,
        reward_token_account: *reward_vault.key,
        reward_balance: 0,
        total_rewards_paid: 0,
        bump: vault_bump,
        stake_vault_bump,
        reward_vault_bump,
    };

    store(&pool, pool_account)?;
    store(&vault, vault_account)?;

    msg!(
        "EVENT:PoolInitialized:{{\"pool\":\"{}\",\"authority\":\"{}\",\"reward_rate\":{},\"claim_policy\":\"{:?}\"}}",
        pool_key,
        authority.key,
        args.reward_rate,
        args.claim_policy,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Stake (discriminator 1)
// ---------------------------------------------------------------------------

fn process_stake(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: AmountArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let position_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(pool_account)?;
    assert_writable(position_account)?;
    assert_writable(owner_token)?;
    assert_writable(stake_vault)?;
    assert_token_program(token_program)?;
    assert_system_program(system_program)?;

    let pool_key = *pool_account.key;
    let mut pool = load_pool(pool_account, program_id)?;
    let vault = load_vault(vault_account, &pool_key, &pool, program_id)?;
    assert_vault_token_account(stake_vault, &vault.stake_token_account)?;
    assert_distinct(owner_token, stake_vault)?;
    unpack_token_account(owner_token, &pool.stake_mint)?;
    let fee = resolve_fee(account_iter, &pool_key, program_id, |c| c.stake_fee)?;

    let position_bump = assert_pda(
        position_account,
        &[POSITION_SEED, pool_key.as_ref(), owner.key.as_ref()],
        program_id,
    )?;

    let clock = Clock::get()?;
    let is_new = position_account.data_is_empty();
    let mut position = if is_new {
        StakePosition {
            account_type: AccountType::StakePosition,
            owner: *owner.key,
            pool: pool_key,
            amount: 0,
            reward_debt: 0,
            unclaimed_reward: 0,
            last_interaction_ts: clock.unix_timestamp,
            bump: position_bump,
        }
    } else {
        let position: StakePosition = load(position_account, program_id)?;
        assert_position_matches(&position, &pool_key, owner.key)?;
        position
    };

    apply_stake(&mut pool, &mut position, is_new, args.amount, clock.unix_timestamp)?;

    if is_new {
        create_pda_account(
            owner,
            StakePosition::SIZE,
            program_id,
            system_program,
            position_account,
            &[POSITION_SEED, pool_key.as_ref(), owner.key.as_ref(), &[position_bump]],
        )?;
    }

    store(&position, position_account)?;
    store(&pool, pool_account)?;

    transfer_spl_tokens(owner_token, stake_vault, owner, token_program, args.amount, &[])?;
    let fee_paid = charge_fee(owner, fee, system_program)?;

    msg!(
        "EVENT:Staked:{{\"owner\":\"{}\",\"pool\":\"{}\",\"amount\":{},\"position_amount\":{},\"total_staked\":{},\"fee\":{}}}",
        owner.key,
        pool_key,
        args.amount,
        position.amount,
        pool.total_staked,
        fee_paid,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Unstake (discriminator 2)
// ---------------------------------------------------------------------------

fn process_unstake(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: AmountArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let position_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(pool_account)?;
    assert_writable(position_account)?;
    assert_writable(owner_token)?;
    assert_writable(stake_vault)?;
    assert_token_program(token_program)?;
    assert_system_program(system_program)?;

    let pool_key = *pool_account.key;
    let mut pool = load_pool(pool_account, program_id)?;
    let vault = load_vault(vault_account, &pool_key, &pool, program_id)?;
    assert_vault_token_account(stake_vault, &vault.stake_token_account)?;
    assert_distinct(owner_token, stake_vault)?;
    unpack_token_account(owner_token, &pool.stake_mint)?;
    let mut position = load_position(position_account, &pool_key, owner.key, program_id)?;
    let fee = resolve_fee(account_iter, &pool_key, program_id, |c| c.unstake_fee)?;

    let clock = Clock::get()?;
    apply_unstake(&mut pool, &mut position, args.amount, clock.unix_timestamp)?;

    store(&position, position_account)?;
    store(&pool, pool_account)?;

    transfer_spl_tokens(
        stake_vault,
        owner_token,
        vault_account,
        token_program,
        args.amount,
        &[VAULT_SEED, pool_key.as_ref(), &[vault.bump]],
    )?;
    let fee_paid = charge_fee(owner, fee, system_program)?;

    msg!(
        "EVENT:Unstaked:{{\"owner\":\"{}\",\"pool\":\"{}\",\"amount\":{},\"position_amount\":{},\"unclaimed_reward\":{},\"total_staked\":{},\"fee\":{}}}",
        owner.key,
        pool_key,
        args.amount,
        position.amount,
        position.unclaimed_reward,
        pool.total_staked,
        fee_paid,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: ClaimReward (discriminator 3)
// ---------------------------------------------------------------------------

fn process_claim_reward(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let position_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(pool_account)?;
    assert_writable(position_account)?;
    assert_writable(vault_account)?;
    assert_writable(owner_token)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;

    let pool_key = *pool_account.key;
    let mut pool = load_pool(pool_account, program_id)?;
    let mut vault = load_vault(vault_account, &pool_key, &pool, program_id)?;
    assert_vault_token_account(reward_vault, &vault.reward_token_account)?;
    assert_distinct(owner_token, reward_vault)?;
    unpack_token_account(owner_token, &pool.reward_mint)?;
    let mut position = load_position(position_account, &pool_key, owner.key, program_id)?;

    let clock = Clock::get()?;
    let payout = apply_claim(&mut pool, &mut position, &mut vault, clock.unix_timestamp)?;

    store(&position, position_account)?;
    store(&pool, pool_account)?;
    store(&vault, vault_account)?;

    if payout > 0 {
        transfer_spl_tokens(
            reward_vault,
            owner_token,
            vault_account,
            token_program,
            payout,
            &[VAULT_SEED, pool_key.as_ref(), &[vault.bump]],
        )?;
    }

    msg!(
        "EVENT:RewardClaimed:{{\"owner\":\"{}\",\"pool\":\"{}\",\"amount\":{}}}",
        owner.key,
        pool_key,
        payout,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: UpdatePool (discriminator 4)
// ---------------------------------------------------------------------------

fn process_update_pool(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: UpdatePoolArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let authority = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;

    assert_signer(authority)?;
    assert_writable(pool_account)?;

    let mut pool = load_pool(pool_account, program_id)?;
    if authority.key != &pool.authority {
        return Err(StakingError::Unauthorized.into());
    }

    let old_rate = pool.reward_rate;
    let clock = Clock::get()?;
    apply_pool_update(&mut pool, &args, clock.unix_timestamp)?;

    store(&pool, pool_account)?;

    msg!(
        "EVENT:PoolUpdated:{{\"pool\":\"{}\",\"old_rate\":{},\"new_rate\":{},\"authority\":\"{}\",\"claim_policy\":\"{:?}\"}}",
        pool_account.key,
        old_rate,
        pool.reward_rate,
        pool.authority,
        pool.claim_policy,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: FundRewards (discriminator 5)
// ---------------------------------------------------------------------------

fn process_fund_rewards(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: AmountArgs,
) -> ProgramResult {
    if args.amount == 0 {
        return Err(StakingError::InvalidAmount.into());
    }

    let account_iter = &mut accounts.iter();
    let funder = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let funder_token = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(funder)?;
    assert_writable(vault_account)?;
    assert_writable(funder_token)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;

    let pool_key = *pool_account.key;
    let pool = load_pool(pool_account, program_id)?;
    let mut vault = load_vault(vault_account, &pool_key, &pool, program_id)?;
    assert_vault_token_account(reward_vault, &vault.reward_token_account)?;
    assert_distinct(funder_token, reward_vault)?;
    unpack_token_account(funder_token, &pool.reward_mint)?;

    vault.reward_balance = vault
        .reward_balance
        .checked_add(args.amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    store(&vault, vault_account)?;

    transfer_spl_tokens(funder_token, reward_vault, funder, token_program, args.amount, &[])?;

    msg!(
        "EVENT:RewardsFunded:{{\"funder\":\"{}\",\"pool\":\"{}\",\"amount\":{},\"reward_balance\":{}}}",
        funder.key,
        pool_key,
        args.amount,
        vault.reward_balance,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: WithdrawRewards (discriminator 6)
// ---------------------------------------------------------------------------

fn process_withdraw_rewards(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: AmountArgs,
) -> ProgramResult {
    if args.amount == 0 {
        return Err(StakingError::InvalidAmount.into());
    }

    let account_iter = &mut accounts.iter();
    let authority = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let vault_account = next_account_info(account_iter)?;
    let authority_token = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(authority)?;
    assert_writable(vault_account)?;
    assert_writable(authority_token)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;

    let pool_key = *pool_account.key;
    let pool = load_pool(pool_account, program_id)?;
    if authority.key != &pool.authority {
        return Err(StakingError::Unauthorized.into());
    }
    let mut vault = load_vault(vault_account, &pool_key, &pool, program_id)?;
    assert_vault_token_account(reward_vault, &vault.reward_token_account)?;
    assert_distinct(authority_token, reward_vault)?;
    unpack_token_account(authority_token, &pool.reward_mint)?;

    vault.reward_balance = vault
        .reward_balance
        .checked_sub(args.amount)
        .ok_or(StakingError::InsufficientRewardFunds)?;
    store(&vault, vault_account)?;

    transfer_spl_tokens(
        reward_vault,
        authority_token,
        vault_account,
        token_program,
        args.amount,
        &[VAULT_SEED, pool_key.as_ref(), &[vault.bump]],
    )?;

    msg!(
        "EVENT:RewardsWithdrawn:{{\"authority\":\"{}\",\"pool\":\"{}\",\"amount\":{},\"reward_balance\":{}}}",
        authority.key,
        pool_key,
        args.amount,
        vault.reward_balance,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: ClosePosition (discriminator 7)
// ---------------------------------------------------------------------------

fn process_close_position(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let position_account = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(pool_account)?;
    assert_writable(position_account)?;

    let pool_key = *pool_account.key;
    let mut pool = load_pool(pool_account, program_id)?;
    let mut position = load_position(position_account, &pool_key, owner.key, program_id)?;

    let clock = Clock::get()?;
    apply_close(&mut pool, &mut position, clock.unix_timestamp)?;

    store(&pool, pool_account)?;
    close_program_account(position_account, owner)?;

    msg!(
        "EVENT:PositionClosed:{{\"owner\":\"{}\",\"pool\":\"{}\"}}",
        owner.key,
        pool_key,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: InitializeFeeConfig (discriminator 8)
// ---------------------------------------------------------------------------

fn process_initialize_fee_config(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: FeeConfigArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let authority = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let fee_config_account = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(authority)?;
    assert_writable(authority)?;
    assert_writable(fee_config_account)?;
    assert_system_program(system_program)?;

    let pool_key = *pool_account.key;
    let pool = load_pool(pool_account, program_id)?;
    if authority.key != &pool.authority {
        return Err(StakingError::Unauthorized.into());
    }

    let bump = assert_pda(fee_config_account, &[FEE_CONFIG_SEED, pool_key.as_ref()], program_id)?;
    if !fee_config_account.data_is_empty() {
        return Err(StakingError::AlreadyInitialized.into());
    }

    create_pda_account(
        authority,
        FeeConfig::SIZE,
        program_id,
        system_program,
        fee_config_account,
        &[FEE_CONFIG_SEED, pool_key.as_ref(), &[bump]],
    )?;

    let config = FeeConfig {
        account_type: AccountType::FeeConfig,
        pool: pool_key,
        fee_wallet: args.fee_wallet,
        stake_fee: args.stake_fee,
        unstake_fee: args.unstake_fee,
        bump,
    };
    store(&config, fee_config_account)?;

    msg!(
        "EVENT:FeeConfigInitialized:{{\"pool\":\"{}\",\"fee_wallet\":\"{}\",\"stake_fee\":{},\"unstake_fee\":{}}}",
        pool_key,
        config.fee_wallet,
        config.stake_fee,
        config.unstake_fee,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: UpdateFeeConfig (discriminator 9)
// ---------------------------------------------------------------------------

fn process_update_fee_config(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: FeeConfigArgs,
) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let authority = next_account_info(account_iter)?;
    let pool_account = next_account_info(account_iter)?;
    let fee_config_account = next_account_info(account_iter)?;

    assert_signer(authority)?;
    assert_writable(fee_config_account)?;

    let pool_key = *pool_account.key;
    let pool = load_pool(pool_account, program_id)?;
    if authority.key != &pool.authority {
        return Err(StakingError::Unauthorized.into());
    }

    let mut config = load_fee_config(fee_config_account, &pool_key, program_id)?
        .ok_or(StakingError::InvalidAccountOwner)?;
    config.fee_wallet = args.fee_wallet;
    config.stake_fee = args.stake_fee;
    config.unstake_fee = args.unstake_fee;
    store(&config, fee_config_account)?;

    msg!(
        "EVENT:FeeConfigUpdated:{{\"pool\":\"{}\",\"fee_wallet\":\"{}\",\"stake_fee\":{},\"unstake_fee\":{}}}",
        pool_key,
        config.fee_wallet,
        config.stake_fee,
        config.unstake_fee,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
