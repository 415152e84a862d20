//! Retail feed ranking and price comparison.
//!
//! Both operate on listings already loaded from the store (active products
//! joined with their sellers, newest first) and never touch the database.

use std::cmp::Ordering;

use crate::geo::Coordinates;
use crate::models::product::{Product, ProductListing};

#[derive(Debug, Clone, PartialEq)]
pub struct RankedListing {
    pub listing: ProductListing,
    /// Kilometres from the query point; `None` when either end is unknown.
    pub distance: Option<f64>,
}

/// Annotates listings with their distance from `origin`, drops those known to
/// be farther than `radius_km`, and sorts ascending by distance.
///
/// Without an origin the input order is returned untouched. Listings with no
/// known location sort after every located listing and keep their relative
/// order.
pub fn rank_by_distance(
    listings: Vec<ProductListing>,
    origin: Option<Coordinates>,
    radius_km: Option<f64>,
) -> Vec<RankedListing> {
    let Some(origin) = origin else {
        return listings
            .into_iter()
            .map(|listing| RankedListing { listing, distance: None })
            .collect();
    };

    let mut ranked: Vec<RankedListing> = listings
        .into_iter()
        .map(|listing| {
            let distance = listing.effective_location().map(|loc| origin.distance_km(&loc));
            RankedListing { listing, distance }
        })
        .filter(|r| match (r.distance, radius_km) {
            (Some(d), Some(radius)) => d <= radius,
            _ => true,
        })
        .collect();

    // sort_by is stable, so equal keys keep feed order.
    ranked.sort_by(|a, b| compare_distance(a.distance, b.distance));
    ranked
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive name containment, or exact equality of non-empty categories.
pub fn is_comparable(reference: &Product, candidate: &Product) -> bool {
    let name_match = candidate
        .name
        .to_lowercase()
        .contains(&reference.name.to_lowercase());

    let category_match = match (non_empty(&reference.category), non_empty(&candidate.category)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    name_match || category_match
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Keeps the feed entries comparable to `reference`, in feed order.
pub fn comparable_listings(reference: &Product, feed: Vec<RankedListing>) -> Vec<RankedListing> {
    feed.into_iter()
        .filter(|r| is_comparable(reference, &r.listing.product))
        .collect()
}
