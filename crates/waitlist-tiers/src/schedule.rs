//! Tier band table.
//!
//! Bands are ascending by upper bound; bounds are inclusive, so with the
//! reference table position 100 is tier 1 and position 101 is tier 2. The
//! last band has no upper bound, which makes [`TierSchedule::quote`] total.
//!
//! | tier | positions | price |
//! |------|-----------|-------|
//! | 1 | 0–100 | $19 |
//! | 2 | 101–200 | $24 |
//! | 3 | 201–300 | $29 |
//! | 4 | 301–400 | $34 |
//! | 5 | 401–500 | $39 |
//! | 6 | 501+ | $49 |

use serde::{Deserialize, Serialize};
use waitlist_types::tier::{CounterSnapshot, TierQuote};
use waitlist_types::{PriceCents, TierNumber};

use crate::{Result, TierError};

/// One priced band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBand {
    /// Inclusive upper bound. `None` for the final band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<u64>,
    pub price_cents: PriceCents,
}

/// Validated, ascending band table. Tier `n` is `bands[n - 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierSchedule {
    bands: Vec<TierBand>,
}

impl TierSchedule {
    /// Validate and build a schedule.
    ///
    /// # Errors
    ///
    /// - [`TierError::EmptySchedule`] if `bands` is empty
    /// - [`TierError::MisplacedUnboundedBand`] unless exactly the last band is unbounded
    /// - [`TierError::BoundsNotAscending`] if bounds do not strictly increase
    /// - [`TierError::PriceNotMonotonic`] if a later band is cheaper
    pub fn new(bands: Vec<TierBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(TierError::EmptySchedule);
        }
        let last = bands.len() - 1;
        let mut previous_bound: Option<u64> = None;
        for (index, band) in bands.iter().enumerate() {
            let tier = index as TierNumber + 1;
            match (band.upper_bound, index == last) {
                (None, true) => {}
                (Some(_), true) | (None, false) => {
                    return Err(TierError::MisplacedUnboundedBand(tier));
                }
                (Some(bound), false) => {
                    if let Some(previous) = previous_bound {
                        if bound <= previous {
                            return Err(TierError::BoundsNotAscending {
                                tier,
                                bound,
                                previous,
                            });
                        }
                    }
                    previous_bound = Some(bound);
                }
            }
            if index > 0 && band.price_cents < bands[index - 1].price_cents {
                return Err(TierError::PriceNotMonotonic {
                    tier,
                    price: band.price_cents,
                    previous_tier: tier - 1,
                });
            }
        }
        Ok(Self { bands })
    }

    /// The six-band table of the reference product.
    pub fn reference() -> Self {
        Self {
            bands: vec![
                TierBand { upper_bound: Some(100), price_cents: 1900 },
                TierBand { upper_bound: Some(200), price_cents: 2400 },
                TierBand { upper_bound: Some(300), price_cents: 2900 },
                TierBand { upper_bound: Some(400), price_cents: 3400 },
                TierBand { upper_bound: Some(500), price_cents: 3900 },
                TierBand { upper_bound: None, price_cents: 4900 },
            ],
        }
    }

    /// The bands, cheapest first.
    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Always false for a validated schedule.
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// The (tier, price) for a position.
    ///
    /// # Errors
    ///
    /// - [`TierError::NegativePosition`] if `position < 0`
    pub fn tier_for(&self, position: i64) -> Result<TierQuote> {
        let position = u64::try_from(position).map_err(|_| TierError::NegativePosition(position))?;
        Ok(self.quote(position))
    }

    /// Total version of [`tier_for`](Self::tier_for) over unsigned positions.
    pub fn quote(&self, position: u64) -> TierQuote {
        let index = self.band_index(position);
        TierQuote {
            tier: index as TierNumber + 1,
            price_cents: self.bands[index].price_cents,
        }
    }

    /// Price of a tier.
    ///
    /// # Errors
    ///
    /// - [`TierError::UnknownTier`] if the tier is outside the schedule
    pub fn price_of(&self, tier: TierNumber) -> Result<PriceCents> {
        self.band(tier).map(|band| band.price_cents)
    }

    /// Counter widget state after `total_signups` positions have been taken.
    ///
    /// Pure: the caller supplies the count, this does no allocation.
    pub fn snapshot(&self, total_signups: u64) -> CounterSnapshot {
        let next = total_signups.saturating_add(1);
        let index = self.band_index(next);
        let band = &self.bands[index];
        CounterSnapshot {
            tier: index as TierNumber + 1,
            price_cents: band.price_cents,
            spots_remaining_in_tier: band
                .upper_bound
                .map(|bound| bound.saturating_sub(total_signups)),
            total_signups,
        }
    }

    fn band(&self, tier: TierNumber) -> Result<&TierBand> {
        (tier as usize)
            .checked_sub(1)
            .and_then(|index| self.bands.get(index))
            .ok_or(TierError::UnknownTier(tier))
    }

    fn band_index(&self, position: u64) -> usize {
        self.bands
            .iter()
            .position(|band| band.upper_bound.map_or(true, |bound| position <= bound))
            .unwrap_or(self.bands.len() - 1)
    }
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self::reference()
    }
}
