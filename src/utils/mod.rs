use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Token;

pub fn remove_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Router deadline `minutes` from now, in unix seconds.
pub fn deadline(minutes: u64) -> u64 {
    unix_now() + minutes * 60
}

/// Parse user input into a positive amount of `token`, in raw units.
///
/// Rejects non-numeric and non-positive input, and more fractional digits
/// than `token` carries. Trailing fractional zeros do not count.
pub fn parse_amount(input: &str, token: &Token) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_amount("amount is empty"));
    }
    let not_a_number = || Error::invalid_amount(format!("'{}' is not a number", trimmed));
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(not_a_number());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(not_a_number());
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > token.decimals as usize {
        return Err(Error::invalid_amount(format!(
            "{} supports at most {} decimals",
            token.symbol, token.decimals
        )));
    }

    let digits = format!("0{}{:0<width$}", whole, fraction, width = token.decimals as usize);
    let too_large = || Error::invalid_amount(format!("{} is too large", trimmed));
    let raw = U256::from_str_radix(&digits, 10).map_err(|_| too_large())?;
    if raw.is_zero() {
        return Err(Error::invalid_amount(format!(
            "{} amount must be positive",
            token.symbol
        )));
    }
    Ok(raw)
}

/// Validate an already-numeric amount against `token`'s precision.
pub fn check_amount(amount: Decimal, token: &Token) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_amount(format!(
            "{} amount must be positive",
            token.symbol
        )));
    }
    if amount.normalize().scale() > token.decimals as u32 {
        return Err(Error::invalid_amount(format!(
            "{} supports at most {} decimals",
            token.symbol, token.decimals
        )));
    }
    Ok(())
}

/// Fail with `InvalidAmount` when `amount` exceeds `balance`. Both are raw.
pub fn ensure_balance(amount: U256, balance: U256, token: &Token) -> Result<()> {
    if amount > balance {
        return Err(Error::invalid_amount(format!(
            "insufficient {} balance: need {}, have {}",
            token.symbol,
            format_units(amount, token.decimals),
            format_units(balance, token.decimals)
        )));
    }
    Ok(())
}

/// Convert a whole-token amount into the raw integer units contracts expect.
///
/// Fails on negative amounts, on more fractional digits than `decimals`, and
/// when the result does not fit in 256 bits.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<U256> {
    let amount = amount.normalize();
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::invalid_amount(format!("{} is negative", amount)));
    }
    let scale = amount.scale();
    if scale > decimals as u32 {
        return Err(Error::invalid_amount(format!(
            "{} has more than {} decimals",
            amount, decimals
        )));
    }
    let too_large = || Error::invalid_amount(format!("{} is too large", amount));
    let factor = U256::from(10u8)
        .checked_pow(U256::from(decimals as u32 - scale))
        .ok_or_else(too_large)?;
    U256::from(amount.mantissa().unsigned_abs())
        .checked_mul(factor)
        .ok_or_else(too_large)
}

/// Like [`to_raw_units`], but drops digits beyond `decimals` instead of
/// failing. For quotes and reserves reported with extra precision.
pub fn floor_raw_units(amount: Decimal, decimals: u8) -> Result<U256> {
    let floored = amount.round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero);
    to_raw_units(floored, decimals)
}

/// Render raw units as a whole-token amount without trailing zeros.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Minimum acceptable raw output after applying `slippage` (a fraction, e.g.
/// 0.005 for 0.5%), rounded down.
pub fn apply_slippage(raw: U256, slippage: Decimal) -> Result<U256> {
    let keep = (Decimal::ONE - slippage).normalize();
    if keep.is_sign_negative() || keep > Decimal::ONE {
        return Err(Error::invalid_amount(format!(
            "slippage {} must be between 0 and 1",
            slippage
        )));
    }
    let denominator = U256::from(10u8)
        .checked_pow(U256::from(keep.scale()))
        .ok_or_else(|| Error::invalid_amount(format!("slippage {} is too precise", slippage)))?;
    let numerator = U256::from(keep.mantissa().unsigned_abs());
    raw.checked_mul(numerator)
        .map(|scaled| scaled / denominator)
        .ok_or_else(|| Error::invalid_amount(format!("{} is too large", raw)))
}

pub async fn retry<T, E, F, Fut>(mut retries: u32, base_delay_ms: u64, mut f: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if retries == 0 => return Err(e),
            Err(e) => {
                // Exponential backoff: base_delay * 2^attempt, capped at 30s
                let delay = (base_delay_ms * (1u64 << attempt.min(5))).min(30_000);
                warn!("[retry] attempt {} failed ({:?}), retrying in {}ms...", attempt + 1, e, delay);
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                retries -= 1;
                attempt += 1;
            }
        }
    }
}
