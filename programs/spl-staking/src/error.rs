// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

use solana_program::program_error::ProgramError;

/// Every failure a staking instruction can report. The discriminant is the
/// `ProgramError::Custom` code seen by clients, so variants are append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("Invalid instruction discriminator")]
    InvalidInstruction,
    #[error("Pool account already initialized")]
    AlreadyInitialized,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Insufficient stake balance")]
    InsufficientStake,
    #[error("No reward available to claim")]
    NoRewardAvailable,
    #[error("Unauthorized signer")]
    Unauthorized,
    #[error("Account is not the expected program-derived address or owner")]
    InvalidAccountOwner,
    #[error("Account does not belong to the declared pool")]
    PoolMismatch,
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Account data does not match the expected layout")]
    MalformedAccount,
    #[error("Account data length does not match the record size")]
    AccountSizeMismatch,
    #[error("Account not writable")]
    AccountNotWritable,
    #[error("Reward vault cannot cover the payout")]
    InsufficientRewardFunds,
    #[error("Position still holds stake or unclaimed reward")]
    PositionNotEmpty,
    #[error("Fee wallet does not match the pool fee config")]
    FeeWalletMismatch,
}

impl From<StakingError> for ProgramError {
    fn from(e: StakingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
