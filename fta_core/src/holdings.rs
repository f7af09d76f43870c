// Key holdings listing - which traders' keys a wallet holds, and which of
// those traders have gone quiet

use crate::format::compare_hashes;
use crate::models::KeyHolding;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Keep the holdings worth listing for `owner`.
///
/// Empty positions and the owner's own keys are dropped. With
/// `inactive_days`, only traders last seen more than that many days before
/// `now_ms` are kept, longest-quiet first.
pub fn filter_holdings(
    holdings: Vec<KeyHolding>,
    owner: &str,
    inactive_days: Option<u32>,
    now_ms: i64,
) -> Vec<KeyHolding> {
    let mut kept: Vec<KeyHolding> = holdings
        .into_iter()
        .filter(|h| h.balance > 0 && !compare_hashes(&h.address, owner))
        .collect();

    if let Some(days) = inactive_days {
        let cutoff = now_ms.saturating_sub(i64::from(days).saturating_mul(MS_PER_DAY));
        kept.retain(|h| h.last_online > 0 && h.last_online < cutoff);
        kept.sort_by_key(|h| h.last_online);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn holding(address: &str, balance: u64, last_online: i64) -> KeyHolding {
        KeyHolding {
            address: address.to_string(),
            twitter_username: None,
            twitter_name: None,
            balance,
            last_online,
        }
    }

    #[test]
    fn drops_empty_and_own_positions() {
        let kept = filter_holdings(
            vec![holding("0xAA", 2, NOW), holding("0xbb", 0, NOW), holding("0xcc", 1, NOW)],
            "0xaa",
            None,
            NOW,
        );
        let addresses: Vec<_> = kept.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(addresses, vec!["0xcc"]);
    }

    #[test]
    fn inactive_filter_sorts_quietest_first() {
        let kept = filter_holdings(
            vec![
                holding("0x01", 1, NOW - 10 * MS_PER_DAY),
                holding("0x02", 1, NOW - MS_PER_DAY),
                holding("0x03", 1, NOW - 30 * MS_PER_DAY),
                // Never seen online
                holding("0x04", 1, 0),
            ],
            "0xme",
            Some(7),
            NOW,
        );
        let addresses: Vec<_> = kept.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(addresses, vec!["0x03", "0x01"]);
    }
}
