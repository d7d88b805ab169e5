//! Outcome selector (C11): picks the winning card from a round's per-card
//! bet totals, biased away from the heaviest-bet card(s) so house profit is
//! non-negative in expectation, with a 10% dither that bounds how far a
//! bettor could exploit the bias by concentrating stakes on one card.

use rand::seq::IteratorRandom;
use rand::Rng;

const FAIRNESS_DITHER_PROBABILITY: f64 = 0.10;
const CARD_COUNT: i32 = 12;

/// Chooses a winning card in `1..=12` given each card's total wagered
/// amount, indexed `totals[i]` = total on card `i + 1`. Exactly implements
/// the seven-step selection algorithm: skew away from the best-covered
/// card(s), then below-average among the rest, with a fairness dither that
/// occasionally opens the draw back up to all twelve cards.
pub fn choose_winning_card(totals: &[rust_decimal::Decimal; 12]) -> i32 {
    let mut rng = rand::thread_rng();

    let sum: rust_decimal::Decimal = totals.iter().sum();
    if sum.is_zero() {
        return (1..=CARD_COUNT).choose(&mut rng).expect("1..=12 is non-empty");
    }

    let max = *totals.iter().max().expect("totals is non-empty");
    let heaviest: Vec<i32> = totals
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == max)
        .map(|(i, _)| i as i32 + 1)
        .collect();

    let rest: Vec<i32> = (1..=CARD_COUNT).filter(|c| !heaviest.contains(c)).collect();
    if rest.is_empty() {
        return (1..=CARD_COUNT).choose(&mut rng).expect("1..=12 is non-empty");
    }

    let rest_sum: rust_decimal::Decimal = rest.iter().map(|&c| totals[(c - 1) as usize]).sum();
    let avg = rest_sum / rust_decimal::Decimal::from(rest.len() as i64);

    let mut below_avg: Vec<i32> = rest
        .iter()
        .copied()
        .filter(|&c| totals[(c - 1) as usize] < avg)
        .collect();
    if below_avg.is_empty() {
        below_avg = rest;
    }

    if rng.gen_bool(FAIRNESS_DITHER_PROBABILITY) {
        return (1..=CARD_COUNT).choose(&mut rng).expect("1..=12 is non-empty");
    }

    below_avg.into_iter().choose(&mut rng).expect("below_avg is non-empty by construction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn totals(values: [i64; 12]) -> [Decimal; 12] {
        let mut out = [Decimal::ZERO; 12];
        for (i, v) in values.iter().enumerate() {
            out[i] = Decimal::from(*v);
        }
        out
    }

    #[test]
    fn zero_wagers_picks_uniformly_among_all_cards() {
        let t = totals([0; 12]);
        for _ in 0..200 {
            let card = choose_winning_card(&t);
            assert!((1..=12).contains(&card));
        }
    }

    #[test]
    fn all_equal_wagers_never_panics_and_stays_in_range() {
        let t = totals([100; 12]);
        for _ in 0..200 {
            let card = choose_winning_card(&t);
            assert!((1..=12).contains(&card));
        }
    }

    /// S5: a single card (12) carries the entire round's action. Without the
    /// dither the selector must never land on it; with many draws it should
    /// land there only close to the dither's 10% share (spread over 12
    /// cards once opened, so roughly 10%/12 per draw — but the card-12 rate
    /// across many draws should approximate the dither probability divided
    /// by the draw pool size only when dither reopens the full 1..=12 set,
    /// i.e. the empirical rate should be well below 50% and clearly above 0%).
    #[test]
    fn skewed_distribution_keeps_heaviest_card_rare_but_reachable() {
        let t = totals([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1000]);
        let draws = 20_000;
        let mut card_12_hits = 0u32;
        for _ in 0..draws {
            if choose_winning_card(&t) == 12 {
                card_12_hits += 1;
            }
        }
        let rate = f64::from(card_12_hits) / f64::from(draws);
        // Expected ~ dither_probability / 12 ≈ 0.0083; allow generous slack.
        assert!(rate > 0.0, "card 12 must be reachable via the dither");
        assert!(rate < 0.05, "card 12 should be rare without being impossible, got {rate}");
    }

    /// P8: the selector never returns the uniquely heaviest card outside the
    /// dither path, so repeated non-dithered draws should show the heaviest
    /// card losing far more often than an even 1-in-12 share would predict.
    #[test]
    fn heaviest_card_is_avoided_more_than_uniform_baseline() {
        let t = totals([10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 500]);
        let draws = 5_000;
        let mut card_12_hits = 0u32;
        for _ in 0..draws {
            if choose_winning_card(&t) == 12 {
                card_12_hits += 1;
            }
        }
        let rate = f64::from(card_12_hits) / f64::from(draws);
        assert!(rate < 1.0 / 12.0, "heaviest card rate {rate} should be below the uniform baseline");
    }

    #[test]
    fn single_nonzero_card_below_average_set_is_everything_else() {
        // Card 1 carries all the action; cards 2..12 are tied at zero, so
        // they're both "rest" and "below average" (avg of rest is zero, and
        // zero is not < zero) — exercising the `below_avg.is_empty()` fallback.
        let t = totals([1000, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        for _ in 0..500 {
            let card = choose_winning_card(&t);
            assert!((1..=12).contains(&card));
        }
    }
}
