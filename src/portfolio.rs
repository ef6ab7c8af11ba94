//! Budget allocation and residual refinement.
//!
//! Converts weighted scores into whole-share purchase counts under a hard
//! budget ceiling, then works the leftover cash down with a greedy top-up pass
//! and a capped swap-refinement pass. Invariant throughout: total invested
//! never exceeds the budget and the residual never goes negative.

use crate::error::AllocationError;
use crate::scoring::ScoredStock;
use tracing::debug;

/// One instrument's slice of the budget. Mutated in place by the allocator
/// and then by the refiner.
#[derive(Debug, Clone)]
pub struct AllocationLine {
    pub stock: ScoredStock,
    /// Weighted score over the batch total. Fractions sum to 1.
    pub fraction: f64,
    /// Cash earmarked for this instrument (fraction x budget).
    pub allocation: f64,
    pub shares: u32,
    pub investment: f64,
}

/// The full allocation result: every line (including zero-share lines), the
/// run budget and the unspent residual.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub lines: Vec<AllocationLine>,
    pub budget: f64,
    pub residual: f64,
}

impl Portfolio {
    /// Total cash actually committed to shares.
    pub fn invested(&self) -> f64 {
        self.lines.iter().map(|l| l.investment).sum()
    }

    /// Lines ordered for display: biggest position first, ties stable.
    pub fn lines_by_investment(&self) -> Vec<&AllocationLine> {
        let mut ordered: Vec<&AllocationLine> = self.lines.iter().collect();
        ordered.sort_by(|a, b| b.investment.total_cmp(&a.investment));
        ordered
    }
}

/// Convert weighted scores into an initial whole-share allocation.
///
/// Each instrument gets a budget slice proportional to its weighted score and
/// buys as many whole shares as the slice covers; the flooring leaves a
/// non-negative residual. An instrument whose slice is below its own price
/// keeps zero shares but stays in the portfolio.
pub fn build_portfolio(
    scored: Vec<ScoredStock>,
    budget: f64,
) -> Result<Portfolio, AllocationError> {
    let total: f64 = scored.iter().map(|s| s.weighted_score).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(AllocationError::ArithmeticDegeneracy { sum: total });
    }

    let mut lines = Vec::with_capacity(scored.len());
    for stock in scored {
        let fraction = stock.weighted_score / total;
        let allocation = fraction * budget;
        let shares = (allocation / stock.quote.price).floor() as u32;
        let investment = shares as f64 * stock.quote.price;
        lines.push(AllocationLine {
            stock,
            fraction,
            allocation,
            shares,
            investment,
        });
    }

    let invested: f64 = lines.iter().map(|l| l.investment).sum();
    Ok(Portfolio {
        lines,
        budget,
        residual: budget - invested,
    })
}

/// Work the residual toward zero without ever exceeding the budget.
///
/// The top-up pass greedily buys into the best-ranked affordable instrument
/// until no instrument's price fits the residual; the swap pass then looks
/// for sell/rebuy exchanges that strictly shrink what is left. Neither pass
/// is exact optimization; both converge quickly and never break the budget
/// ceiling.
pub fn refine(portfolio: &mut Portfolio, swap_iteration_cap: u32) {
    top_up(portfolio);
    if portfolio.residual > 0.0 {
        swap_refine(portfolio, swap_iteration_cap);
    }
}

/// Repeatedly buy one more share of the highest-scored instrument the
/// residual still covers, restarting the scan from the top after every buy.
///
/// Scores never change during refinement, so ranking once up front is
/// identical to re-sorting before each scan; the sort is stable, so tied
/// scores keep insertion order. Terminates because every purchase strictly
/// decreases the residual by a positive price.
fn top_up(portfolio: &mut Portfolio) {
    let mut rank: Vec<usize> = (0..portfolio.lines.len()).collect();
    rank.sort_by(|&a, &b| {
        portfolio.lines[b]
            .stock
            .weighted_score
            .total_cmp(&portfolio.lines[a].stock.weighted_score)
    });

    let mut bought = 0u32;
    'scan: loop {
        for &i in &rank {
            let price = portfolio.lines[i].stock.quote.price;
            if price <= portfolio.residual {
                portfolio.lines[i].shares += 1;
                portfolio.lines[i].investment += price;
                portfolio.residual -= price;
                bought += 1;
                continue 'scan;
            }
        }
        break;
    }

    debug!(
        "top-up bought {} shares, residual {:.2}",
        bought, portfolio.residual
    );
}

/// Exchange one share of a low-scored holding for one share of a
/// higher-priced instrument whenever that strictly shrinks the residual.
///
/// Sell candidates are scanned in ascending score order (holdings only), buy
/// candidates in descending order, both stable on ties. A swap is accepted
/// only on strict improvement, never on feasibility alone, and nets out to a
/// pure cash-ledger rebalance: the sold share is immediately re-bought at the
/// buy candidate's price, so the share count stays put and only the
/// investment and residual move. The iteration cap guarantees termination
/// even if no improving swap exists.
fn swap_refine(portfolio: &mut Portfolio, iteration_cap: u32) {
    let n = portfolio.lines.len();

    let mut sell_order: Vec<usize> = (0..n).collect();
    sell_order.sort_by(|&a, &b| {
        portfolio.lines[a]
            .stock
            .weighted_score
            .total_cmp(&portfolio.lines[b].stock.weighted_score)
    });

    let mut buy_order: Vec<usize> = (0..n).collect();
    buy_order.sort_by(|&a, &b| {
        portfolio.lines[b]
            .stock
            .weighted_score
            .total_cmp(&portfolio.lines[a].stock.weighted_score)
    });

    let mut iterations = 0u32;
    'iteration: while iterations < iteration_cap {
        iterations += 1;

        for &s in &sell_order {
            if portfolio.lines[s].shares == 0 {
                continue;
            }
            let sell_price = portfolio.lines[s].stock.quote.price;
            let potential = portfolio.residual + sell_price;

            for &b in &buy_order {
                let buy_price = portfolio.lines[b].stock.quote.price;
                if buy_price <= potential {
                    let new_residual = potential - buy_price;
                    if new_residual < portfolio.residual {
                        portfolio.lines[s].investment += buy_price - sell_price;
                        portfolio.residual = new_residual;
                        debug!(
                            "swap {} -> {}: residual {:.2}",
                            portfolio.lines[s].stock.quote.ticker,
                            portfolio.lines[b].stock.quote.ticker,
                            new_residual
                        );
                        continue 'iteration;
                    }
                }
            }
        }

        break; // full pass without an accepted swap
    }
}
