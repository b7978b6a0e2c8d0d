//! Exact BTC formatting for satoshi amounts
//!
//! Amounts are kept as integer satoshis (`bitcoin::Amount`) everywhere; this
//! module renders them as fixed eight-decimal BTC strings without going
//! through floating point.

use bitcoin::Amount;

/// Satoshis per Bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Format an amount as a plain BTC decimal with satoshi precision
///
/// # Examples
/// ```
/// use bitcoin::Amount;
/// use btc_custody_sync::utils::currency::format_btc;
///
/// assert_eq!(format_btc(Amount::from_sat(28125351850)), "281.25351850");
/// assert_eq!(format_btc(Amount::from_sat(5471)), "0.00005471");
/// ```
pub fn format_btc(amount: Amount) -> String {
    let sats = amount.to_sat();
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

/// Format an amount as dual BTC + sats display
///
/// # Examples
/// ```
/// use bitcoin::Amount;
/// use btc_custody_sync::utils::currency::format_sats_as_btc;
///
/// assert_eq!(
///     format_sats_as_btc(Amount::from_sat(5471)),
///     "0.00005471 BTC (5471 sats)"
/// );
/// ```
pub fn format_sats_as_btc(amount: Amount) -> String {
    format!("{} BTC ({} sats)", format_btc(amount), amount.to_sat())
}

/// Serde helper writing an `Amount` as an exact BTC decimal string
pub mod as_btc_string {
    use bitcoin::Amount;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_btc(*amount))
    }
}
