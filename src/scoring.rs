//! Valuation scoring.
//!
//! Classifies every instrument against the market-average P/E and P/B, then
//! turns the combined undervaluation distance into a strictly positive
//! weighted score. The weighted scores are the only signal the allocator sees.

use crate::config::Multipliers;
use crate::error::AllocationError;
use crate::stocks::StockQuote;

/// Relative valuation of an instrument against the batch averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valuation {
    BothUndervalued,
    PeUndervalued,
    PbUndervalued,
    BothOvervalued,
}

impl Valuation {
    /// Classify one instrument. "Below average" is a strict comparison: a
    /// ratio exactly equal to the average counts as not undervalued.
    pub fn classify(quote: &StockQuote, avg_pe: f64, avg_pb: f64) -> Self {
        match (quote.pe_ratio < avg_pe, quote.pb_ratio < avg_pb) {
            (true, true) => Valuation::BothUndervalued,
            (true, false) => Valuation::PeUndervalued,
            (false, true) => Valuation::PbUndervalued,
            (false, false) => Valuation::BothOvervalued,
        }
    }

    /// Policy multiplier for this category.
    pub fn multiplier(self, table: &Multipliers) -> f64 {
        match self {
            Valuation::BothUndervalued => table.both_undervalued,
            Valuation::PeUndervalued => table.pe_undervalued,
            Valuation::PbUndervalued => table.pb_undervalued,
            Valuation::BothOvervalued => table.both_overvalued,
        }
    }

    /// Stable label used in the report and the CSV export.
    pub fn label(self) -> &'static str {
        match self {
            Valuation::BothUndervalued => "both_undervalued",
            Valuation::PeUndervalued => "pe_undervalued",
            Valuation::PbUndervalued => "pb_undervalued",
            Valuation::BothOvervalued => "both_overvalued",
        }
    }

    /// All categories in display order.
    pub fn all() -> [Valuation; 4] {
        [
            Valuation::BothUndervalued,
            Valuation::PeUndervalued,
            Valuation::PbUndervalued,
            Valuation::BothOvervalued,
        ]
    }
}

/// A quote plus everything the allocator needs to weight it.
#[derive(Debug, Clone)]
pub struct ScoredStock {
    pub quote: StockQuote,
    pub valuation: Valuation,
    pub base_score: f64,
    pub multiplier: f64,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub weighted_score: f64,
}

/// Score a batch of quotes.
///
/// Base score is the combined distance below the market averages,
/// `(avg_pe - pe) + (avg_pb - pb)`; the category multiplier rewards names that
/// are cheap on both axes. The whole batch is then shifted by the minimum base
/// score so every score is strictly positive before exponentiation. The shift
/// is applied after the multiplier, not before.
pub fn score_stocks(
    quotes: Vec<StockQuote>,
    multipliers: &Multipliers,
    weight_exponent: u32,
) -> Result<Vec<ScoredStock>, AllocationError> {
    if quotes.is_empty() {
        return Err(AllocationError::InsufficientData);
    }

    let n = quotes.len() as f64;
    let avg_pe = quotes.iter().map(|q| q.pe_ratio).sum::<f64>() / n;
    let avg_pb = quotes.iter().map(|q| q.pb_ratio).sum::<f64>() / n;

    let mut scored: Vec<ScoredStock> = quotes
        .into_iter()
        .map(|quote| {
            let valuation = Valuation::classify(&quote, avg_pe, avg_pb);
            let multiplier = valuation.multiplier(multipliers);
            let base_score = (avg_pe - quote.pe_ratio) + (avg_pb - quote.pb_ratio);
            let raw_score = base_score * multiplier;
            ScoredStock {
                quote,
                valuation,
                base_score,
                multiplier,
                raw_score,
                adjusted_score: 0.0,
                weighted_score: 0.0,
            }
        })
        .collect();

    let min_base = scored
        .iter()
        .map(|s| s.base_score)
        .fold(f64::INFINITY, f64::min);
    let shift = if min_base < 0.0 { 1.0 - min_base } else { 1.0 };

    for s in scored.iter_mut() {
        s.adjusted_score = s.raw_score + shift;
        s.weighted_score = s.adjusted_score.powi(weight_exponent as i32);
    }

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(ticker: &str, pe: f64, pb: f64) -> StockQuote {
        StockQuote {
            ticker: ticker.to_string(),
            price: 100.0,
            pe_ratio: pe,
            pb_ratio: pb,
        }
    }

    #[test]
    fn empty_batch_is_insufficient_data() {
        let err = score_stocks(vec![], &Multipliers::default(), 3).unwrap_err();
        assert!(matches!(err, AllocationError::InsufficientData));
    }

    #[test]
    fn classification_covers_all_quadrants() {
        // avg_pe = 20, avg_pb = 3
        let quotes = vec![
            quote("CHEAP", 10.0, 1.0),
            quote("EARN", 10.0, 5.0),
            quote("BOOK", 30.0, 1.0),
            quote("RICH", 30.0, 5.0),
        ];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();

        assert_eq!(scored[0].valuation, Valuation::BothUndervalued);
        assert_eq!(scored[1].valuation, Valuation::PeUndervalued);
        assert_eq!(scored[2].valuation, Valuation::PbUndervalued);
        assert_eq!(scored[3].valuation, Valuation::BothOvervalued);

        assert_eq!(scored[0].multiplier, 2.0);
        assert_eq!(scored[1].multiplier, 1.2);
        assert_eq!(scored[2].multiplier, 1.2);
        assert_eq!(scored[3].multiplier, 1.0);
    }

    #[test]
    fn ratio_equal_to_average_is_not_undervalued() {
        // Both ratios of "AT_AVG" land exactly on the averages.
        let quotes = vec![quote("AT_AVG", 20.0, 3.0), quote("OTHER", 20.0, 3.0)];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();
        assert_eq!(scored[0].valuation, Valuation::BothOvervalued);
        assert_eq!(scored[1].valuation, Valuation::BothOvervalued);
    }

    #[test]
    fn base_score_is_combined_distance_below_average() {
        // avg_pe = 15, avg_pb = 2
        let quotes = vec![quote("A", 10.0, 1.0), quote("B", 20.0, 3.0)];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();
        assert!((scored[0].base_score - 6.0).abs() < 1e-12); // (15-10)+(2-1)
        assert!((scored[1].base_score - (-6.0)).abs() < 1e-12);
    }

    #[test]
    fn negative_minimum_shifts_after_multiplication() {
        // avg_pe = 15, avg_pb = 2; B has base -6, min_base = -6.
        // A: base 6, both undervalued, raw 12, adjusted 12 - (-6) + 1 = 19.
        // B: base -6, both overvalued, raw -6, adjusted -6 + 6 + 1 = 1.
        let quotes = vec![quote("A", 10.0, 1.0), quote("B", 20.0, 3.0)];
        let scored = score_stocks(quotes, &Multipliers::default(), 1).unwrap();

        assert!((scored[0].raw_score - 12.0).abs() < 1e-12);
        assert!((scored[0].adjusted_score - 19.0).abs() < 1e-12);
        assert!((scored[1].adjusted_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_negative_minimum_shifts_by_one() {
        // Identical ratios: every base score is 0, min_base = 0, so each
        // adjusted score is raw + 1 = 1.
        let quotes = vec![quote("A", 15.0, 2.0), quote("B", 15.0, 2.0)];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();
        for s in &scored {
            assert!((s.adjusted_score - 1.0).abs() < 1e-12);
            assert!((s.weighted_score - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn exponent_amplifies_separation() {
        let quotes = vec![quote("A", 10.0, 1.0), quote("B", 20.0, 3.0)];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();
        let expected = scored[0].adjusted_score.powi(3);
        assert!((scored[0].weighted_score - expected).abs() < 1e-9);
        assert!(scored[0].weighted_score > scored[1].weighted_score);
    }

    #[test]
    fn weighted_scores_are_strictly_positive() {
        let quotes = vec![
            quote("A", 8.0, 0.9),
            quote("B", 35.0, 6.0),
            quote("C", 21.0, 2.4),
            quote("D", 14.0, 3.3),
        ];
        let scored = score_stocks(quotes, &Multipliers::default(), 3).unwrap();
        for s in &scored {
            assert!(s.weighted_score > 0.0, "{} not positive", s.quote.ticker);
        }
    }

    #[test]
    fn single_instrument_scores_to_one() {
        // A lone instrument sits exactly on the averages: base 0, adjusted 1.
        let scored = score_stocks(
            vec![quote("ONLY", 12.0, 1.5)],
            &Multipliers::default(),
            3,
        )
        .unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].valuation, Valuation::BothOvervalued);
        assert!((scored[0].weighted_score - 1.0).abs() < 1e-12);
    }
}
