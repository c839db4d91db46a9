//! Converts a discount ceiling into the lowest offer the policy allows.
//!
//! Offers are quoted in whole hundreds and may never fall below
//! `principal * (1 - discount_ceiling)`, so the raw floor is always rounded
//! *up* to the next hundred unless it already is one.

use serde::Serialize;

/// Granularity every quoted offer is a multiple of.
pub const OFFER_INCREMENT: u64 = 100;

/// Floating-point noise tolerated above an exact multiple of the increment,
/// relative to the size of the floor.
const SNAP_RELATIVE_TOLERANCE: f64 = 1e-14;

/// Inputs that indicate a classifier or roster bug upstream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OfferError {
    #[error("discount ceiling {0} is outside [0, 1]")]
    DiscountOutOfRange(f64),
    #[error("principal {0} must be a finite, non-negative amount")]
    InvalidPrincipal(f64),
    #[error("offer floor {0} is too large to quote in whole units")]
    OfferTooLarge(f64),
}

/// Calculator output, keeping the unrounded floor for audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OfferQuote {
    pub raw_floor: f64,
    pub minimum_acceptable_offer: u64,
}

/// Minimum acceptable offer, in whole currency units.
pub fn compute_offer(principal: f64, discount_ceiling: f64) -> Result<u64, OfferError> {
    quote(principal, discount_ceiling).map(|quote| quote.minimum_acceptable_offer)
}

pub fn quote(principal: f64, discount_ceiling: f64) -> Result<OfferQuote, OfferError> {
    if !discount_ceiling.is_finite() || !(0.0..=1.0).contains(&discount_ceiling) {
        return Err(OfferError::DiscountOutOfRange(discount_ceiling));
    }
    if !principal.is_finite() || principal < 0.0 {
        return Err(OfferError::InvalidPrincipal(principal));
    }

    let raw_floor = principal * (1.0 - discount_ceiling);

    Ok(OfferQuote {
        raw_floor,
        minimum_acceptable_offer: round_up_to_increment(raw_floor)?,
    })
}

fn round_up_to_increment(raw_floor: f64) -> Result<u64, OfferError> {
    let increment = OFFER_INCREMENT as f64;
    let lower = (raw_floor / increment).floor();
    let units = if raw_floor - lower * increment <= raw_floor * SNAP_RELATIVE_TOLERANCE {
        lower
    } else {
        (raw_floor / increment).ceil()
    };

    if units >= u64::MAX as f64 {
        return Err(OfferError::OfferTooLarge(raw_floor));
    }
    (units as u64)
        .checked_mul(OFFER_INCREMENT)
        .ok_or(OfferError::OfferTooLarge(raw_floor))
}
