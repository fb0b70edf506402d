//! Revenue share splitting.

use relaycraft_aggregator::{ClaimSettlementResult, SettlementOpReason};
use relaycraft_core::{Address, Coin, RevShare, Supplier};

use crate::{Result, SettlementError};

/// Split `total` across shareholders by whole percent.
///
/// Each share is floored. The rounding remainder goes to the first
/// shareholder in configuration order.
pub fn split_by_rev_share(total: u64, shares: &[RevShare]) -> Result<Vec<(Address, u64)>> {
    if shares.is_empty() {
        return Err(SettlementError::DataIntegrity(
            "revenue share list is empty".to_string(),
        ));
    }
    let percent_total: u128 = shares.iter().map(|s| s.rev_share_percentage as u128).sum();
    if percent_total != 100 {
        return Err(SettlementError::DataIntegrity(format!(
            "revenue shares sum to {}%, expected 100%",
            percent_total
        )));
    }

    let mut out: Vec<(Address, u64)> = shares
        .iter()
        .map(|s| {
            let amount = (total as u128 * s.rev_share_percentage as u128 / 100) as u64;
            (s.address.clone(), amount)
        })
        .collect();

    let distributed: u64 = out.iter().map(|(_, a)| a).sum();
    out[0].1 += total - distributed;
    Ok(out)
}

/// Append module-to-account transfers paying `coin` out to the supplier's
/// shareholders for `service_id`.
pub fn distribute_supplier_rewards(
    result: &mut ClaimSettlementResult,
    supplier: &Supplier,
    service_id: &str,
    sender_module: &str,
    reason: SettlementOpReason,
    coin: &Coin,
) -> Result<()> {
    let shares = supplier.rev_share_for(service_id).ok_or_else(|| {
        SettlementError::DataIntegrity(format!(
            "supplier {} has no configuration for service {}",
            supplier.operator_address, service_id
        ))
    })?;

    for (address, amount) in split_by_rev_share(coin.amount, shares)? {
        result.append_mod_to_acct(reason, sender_module, &address, Coin::new(coin.denom.clone(), amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(percentages: &[u64]) -> Vec<RevShare> {
        percentages
            .iter()
            .enumerate()
            .map(|(i, p)| RevShare {
                address: format!("holder{}", i),
                rev_share_percentage: *p,
            })
            .collect()
    }

    #[test]
    fn test_even_split() {
        let out = split_by_rev_share(1_000, &shares(&[50, 50])).unwrap();
        assert_eq!(out, vec![("holder0".to_string(), 500), ("holder1".to_string(), 500)]);
    }

    #[test]
    fn test_remainder_goes_to_first_shareholder() {
        let out = split_by_rev_share(100, &shares(&[33, 33, 34])).unwrap();
        assert_eq!(out[0].1, 33);
        assert_eq!(out[1].1, 33);
        assert_eq!(out[2].1, 34);

        let out = split_by_rev_share(10, &shares(&[33, 33, 34])).unwrap();
        // floors: 3, 3, 3 -> remainder 1 to holder0
        assert_eq!(out.iter().map(|(_, a)| *a).collect::<Vec<_>>(), vec![4, 3, 3]);
    }

    #[test]
    fn test_split_always_sums_to_total() {
        for total in [0u64, 1, 7, 99, 1_000_001, u64::MAX] {
            let out = split_by_rev_share(total, &shares(&[10, 20, 30, 40])).unwrap();
            let sum: u128 = out.iter().map(|(_, a)| *a as u128).sum();
            assert_eq!(sum, total as u128);
        }
    }

    #[test]
    fn test_bad_percentages_rejected() {
        assert!(split_by_rev_share(10, &shares(&[50, 40])).is_err());
        assert!(split_by_rev_share(10, &[]).is_err());
    }

    #[test]
    fn test_overflowing_percentages_are_data_integrity_errors() {
        let err = split_by_rev_share(10, &shares(&[u64::MAX, u64::MAX])).unwrap_err();
        assert!(matches!(err, SettlementError::DataIntegrity(_)));

        let err = split_by_rev_share(10, &shares(&[u64::MAX, 101])).unwrap_err();
        assert!(matches!(err, SettlementError::DataIntegrity(_)));
    }
}
