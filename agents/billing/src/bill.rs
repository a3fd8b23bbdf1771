//! Bill assembly: join trucks, sessions, produce and rates into a
//! per-provider statement for a window.
//!
//! Every weighbridge call can individually fail; a failed call removes its
//! slice of data from the bill and nothing else. The produce mapping is
//! best-effort too: sessions with no known produce are billed under
//! "unknown", which normally carries no rate.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::future::join_all;
use tracing::{instrument, warn};

use gatehouse_base::ApiError;
use gatehouse_core::api::{BillReport, ProductLine};
use gatehouse_core::timefmt;

use crate::db::{BillingDb, Rate};
use crate::weigh_client::{Fetched, WeighClient, Window};

/// Produce bucket used when the weighbridge gave us no mapping.
const UNKNOWN_PRODUCE: &str = "unknown";

/// Assemble the bill for `provider_id` over `window`.
#[instrument(skip(db, weigh))]
pub async fn assemble(
    db: &BillingDb,
    weigh: &WeighClient,
    provider_id: i32,
    window: Window,
) -> Result<BillReport, ApiError> {
    let provider = db
        .provider_by_id(provider_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no provider with id {provider_id}")))?;

    // Fan out per truck; a truck whose history cannot be fetched simply
    // contributes no sessions.
    let trucks = db.trucks_for_provider(provider_id).await?;
    let histories = join_all(
        trucks
            .iter()
            .map(|truck| weigh.item(&truck.id, &window)),
    )
    .await;

    let mut session_ids = BTreeSet::new();
    for (truck, fetched) in trucks.iter().zip(histories) {
        match fetched {
            Fetched::Hit(history) => session_ids.extend(history.sessions),
            Fetched::Missing => {
                // Registered here but never weighed; nothing to bill.
            }
            Fetched::Unreachable => {
                warn!(truck = %truck.id, "skipping truck, weighbridge unreachable");
            }
        }
    }

    // Only sessions with a determinate neto are billable.
    let details = join_all(session_ids.iter().map(|id| weigh.session(*id))).await;
    let mut sessions: Vec<(i64, i64)> = Vec::new();
    for (id, fetched) in session_ids.iter().zip(details) {
        if let Fetched::Hit(detail) = fetched {
            if let Some(amount) = detail.amount() {
                sessions.push((*id, amount));
            }
        }
    }

    let produce_by_session: HashMap<i64, String> = match weigh.weighings(&window).await {
        Fetched::Hit(rows) => rows.into_iter().map(|row| (row.id, row.produce)).collect(),
        _ => {
            warn!("produce mapping unavailable, billing under 'unknown'");
            HashMap::new()
        }
    };

    let rates = db.all_rates().await?;
    let (products, total) = aggregate(&sessions, &produce_by_session, &rates, provider_id);

    Ok(BillReport {
        id: provider.id,
        name: provider.name,
        from: timefmt::format(window.from),
        to: timefmt::format(window.to),
        truck_count: trucks.len(),
        session_count: sessions.len(),
        products,
        total,
    })
}

/// The rate for `product` as seen by `provider_id`: a provider-scoped rate
/// overrides the global one; an unlisted product is free.
pub(crate) fn rate_for(rates: &[Rate], product: &str, provider_id: i32) -> i64 {
    let mut global = None;
    let mut scoped = None;
    for rate in rates.iter().filter(|rate| rate.product == product) {
        match rate.scope {
            None => global = Some(rate.rate),
            Some(scope) if scope == provider_id => scoped = Some(rate.rate),
            Some(_) => {}
        }
    }
    scoped.or(global).unwrap_or(0)
}

/// Fold billable sessions into per-product lines, sorted by product.
pub(crate) fn aggregate(
    sessions: &[(i64, i64)],
    produce_by_session: &HashMap<i64, String>,
    rates: &[Rate],
    provider_id: i32,
) -> (Vec<ProductLine>, i64) {
    let mut buckets: BTreeMap<&str, (u64, i64)> = BTreeMap::new();
    for (session_id, amount) in sessions {
        let product = produce_by_session
            .get(session_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_PRODUCE);
        let bucket = buckets.entry(product).or_default();
        bucket.0 += 1;
        bucket.1 += amount;
    }

    let products: Vec<ProductLine> = buckets
        .into_iter()
        .map(|(product, (count, amount))| {
            let rate = rate_for(rates, product, provider_id);
            ProductLine {
                product: product.to_owned(),
                count,
                amount,
                rate,
                pay: amount * rate,
            }
        })
        .collect();
    let total = products.iter().map(|line| line.pay).sum();
    (products, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(product: &str, value: i64, scope: Option<i32>) -> Rate {
        Rate {
            id: 0,
            product: product.to_owned(),
            rate: value,
            scope,
        }
    }

    #[test]
    fn provider_scoped_rates_override_global_ones() {
        let rates = vec![
            rate("tomato", 5, None),
            rate("tomato", 8, Some(3)),
            rate("orange", 4, Some(9)),
        ];
        assert_eq!(rate_for(&rates, "tomato", 3), 8);
        assert_eq!(rate_for(&rates, "tomato", 4), 5);
        assert_eq!(rate_for(&rates, "orange", 3), 0, "scoped to someone else");
        assert_eq!(rate_for(&rates, "cucumber", 3), 0, "unlisted is free");
    }

    #[test]
    fn sessions_fold_into_product_lines() {
        let rates = vec![rate("tomato", 5, None)];
        let produce = HashMap::from([(1, "tomato".to_owned())]);

        let (products, total) = aggregate(&[(1, 6000)], &produce, &rates, 7);
        assert_eq!(
            products,
            vec![ProductLine {
                product: "tomato".to_owned(),
                count: 1,
                amount: 6000,
                rate: 5,
                pay: 30000,
            }]
        );
        assert_eq!(total, 30000);
    }

    #[test]
    fn unmapped_sessions_bill_under_unknown_at_rate_zero() {
        let rates = vec![rate("tomato", 5, None)];
        let produce = HashMap::from([(1, "tomato".to_owned())]);

        let (products, total) = aggregate(&[(1, 6000), (2, 1000), (3, 500)], &produce, &rates, 7);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product, "tomato");
        assert_eq!(products[1].product, "unknown");
        assert_eq!(products[1].count, 2);
        assert_eq!(products[1].amount, 1500);
        assert_eq!(products[1].pay, 0);
        assert_eq!(total, 30000);
    }

    #[test]
    fn empty_windows_produce_an_empty_bill() {
        let (products, total) = aggregate(&[], &HashMap::new(), &[], 7);
        assert!(products.is_empty());
        assert_eq!(total, 0);
    }
}
