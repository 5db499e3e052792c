//! Bet detection on decoded transaction outputs

use crate::amount::Amount;
use crate::node::RawOutput;

/// An output paying the house
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetEvent {
    pub amount: Amount,
    pub vout: u32,
}

/// First output (in transaction order) paying `house_address`.
///
/// Only the first match counts; further outputs to the house in the same
/// transaction are never paid out.
pub fn parse_bet(outputs: &[RawOutput], house_address: &str) -> Option<BetEvent> {
    outputs
        .iter()
        .find(|out| out.pays_to(house_address))
        .map(|out| BetEvent {
            amount: out.value,
            vout: out.n,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSE: &str = "bchreg:house";

    fn output(n: u32, sats: u64, addresses: &[&str]) -> RawOutput {
        RawOutput::new(n, Amount::from_sat(sats), addresses.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_no_house_output() {
        let outputs = vec![output(0, 100, &["bchreg:alice"]), output(1, 200, &[])];
        assert_eq!(parse_bet(&outputs, HOUSE), None);
        assert_eq!(parse_bet(&[], HOUSE), None);
    }

    #[test]
    fn test_first_match_wins() {
        let outputs = vec![
            output(0, 100, &["bchreg:alice"]),
            output(1, 1_000_000, &["bchreg:bob", HOUSE]),
            output(2, 5_000_000, &[HOUSE]),
        ];

        let bet = parse_bet(&outputs, HOUSE).unwrap();
        assert_eq!(bet.vout, 1);
        assert_eq!(bet.amount, Amount::from_sat(1_000_000));
    }

    #[test]
    fn test_vout_comes_from_output_index_field() {
        // Outputs carry their own index; the list position is not used.
        let outputs = vec![output(7, 42, &[HOUSE])];
        assert_eq!(parse_bet(&outputs, HOUSE).unwrap().vout, 7);
    }

    #[test]
    fn test_address_must_match_exactly() {
        let outputs = vec![output(0, 100, &["bchreg:house2", "BCHREG:HOUSE"])];
        assert_eq!(parse_bet(&outputs, HOUSE), None);
    }
}
