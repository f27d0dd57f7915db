use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{products, sellers};

/// Stock at or below this count is surfaced as "low stock" in listings.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// The fields of a product that visibility depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub active: bool,
    pub stock_qty: i32,
}

impl ProductSnapshot {
    pub fn of(model: &products::Model) -> Self {
        Self {
            active: model.is_active,
            stock_qty: model.stock_qty,
        }
    }
}

/// The fields of a seller that its products' visibility depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellerSnapshot {
    pub active: bool,
    pub subscription_end_at: Option<DateTime<Utc>>,
}

impl SellerSnapshot {
    pub fn of(model: &sellers::Model) -> Self {
        Self {
            active: model.is_active,
            subscription_end_at: model.subscription_end_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Derived display state of a product. Never persisted; recomputed on every
/// read because it depends on the seller's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    Visible,
    LowStock,
    OutOfStock,
    HiddenInactiveProduct,
    HiddenSellerInactive,
    HiddenSubscriptionExpired,
}

impl VisibilityState {
    /// Hidden states are excluded from buyer-facing listings entirely.
    pub fn is_hidden(self) -> bool {
        matches!(
            self,
            VisibilityState::HiddenInactiveProduct
                | VisibilityState::HiddenSellerInactive
                | VisibilityState::HiddenSubscriptionExpired
        )
    }

    /// Listable means it may appear in the storefront, possibly labeled
    /// out-of-stock.
    pub fn is_listable(self) -> bool {
        !self.is_hidden()
    }

    /// Out-of-stock products are listable but cannot be ordered.
    pub fn is_purchasable(self) -> bool {
        matches!(self, VisibilityState::Visible | VisibilityState::LowStock)
    }

    pub fn label(self) -> &'static str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::LowStock => "low_stock",
            VisibilityState::OutOfStock => "out_of_stock",
            VisibilityState::HiddenInactiveProduct => "hidden_inactive_product",
            VisibilityState::HiddenSellerInactive => "hidden_seller_inactive",
            VisibilityState::HiddenSubscriptionExpired => "hidden_subscription_expired",
        }
    }
}

/// Compute a product's visibility from its own flags and its seller's,
/// checked in priority order. A missing seller counts as inactive.
///
/// Note the ordering: seller deactivation also flips the owned products'
/// active flags, so those products report `HiddenInactiveProduct` here, not
/// `HiddenSellerInactive`. `HiddenSellerInactive` is reached when only
/// `sellers.is_active` was flipped (the subscription sweep does exactly
/// that).
pub fn evaluate(
    product: ProductSnapshot,
    seller: Option<SellerSnapshot>,
    now: DateTime<Utc>,
) -> VisibilityState {
    if !product.active {
        return VisibilityState::HiddenInactiveProduct;
    }
    let seller = match seller {
        Some(s) if s.active => s,
        _ => return VisibilityState::HiddenSellerInactive,
    };
    if let Some(end) = seller.subscription_end_at {
        if end < now {
            return VisibilityState::HiddenSubscriptionExpired;
        }
    }
    // Negative stock is rejected at the mutation boundary; treat it as empty
    // here so the evaluator stays total.
    if product.stock_qty <= 0 {
        return VisibilityState::OutOfStock;
    }
    if product.stock_qty <= LOW_STOCK_THRESHOLD {
        return VisibilityState::LowStock;
    }
    VisibilityState::Visible
}

/// The listing-side translation of the rule above: a SQL predicate that
/// keeps exactly the non-hidden products, so bulk reads never evaluate rows
/// in application memory. Requires the seller table to be joined.
pub fn storefront_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(products::Column::IsActive.eq(true))
        .add(sellers::Column::IsActive.eq(true))
        .add(
            Condition::any()
                .add(sellers::Column::SubscriptionEndAt.is_null())
                .add(sellers::Column::SubscriptionEndAt.gte(now)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn product(active: bool, stock_qty: i32) -> ProductSnapshot {
        ProductSnapshot { active, stock_qty }
    }

    fn seller(active: bool, end: Option<DateTime<Utc>>) -> Option<SellerSnapshot> {
        Some(SellerSnapshot {
            active,
            subscription_end_at: end,
        })
    }

    #[test]
    fn inactive_product_wins_over_everything() {
        let state = evaluate(product(false, 50), seller(false, Some(at(0))), at(12));
        assert_eq!(state, VisibilityState::HiddenInactiveProduct);
    }

    #[test]
    fn missing_seller_counts_as_inactive() {
        assert_eq!(
            evaluate(product(true, 50), None, at(12)),
            VisibilityState::HiddenSellerInactive
        );
    }

    #[test]
    fn inactive_seller_hides_active_product() {
        assert_eq!(
            evaluate(product(true, 50), seller(false, None), at(12)),
            VisibilityState::HiddenSellerInactive
        );
    }

    #[test]
    fn expired_subscription_hides_even_with_stale_active_flag() {
        // Seller flag still true, subscription lapsed: the expiry overrides.
        assert_eq!(
            evaluate(product(true, 20), seller(true, Some(at(0))), at(12)),
            VisibilityState::HiddenSubscriptionExpired
        );
    }

    #[test]
    fn subscription_ending_exactly_now_is_not_expired() {
        assert_eq!(
            evaluate(product(true, 50), seller(true, Some(at(12))), at(12)),
            VisibilityState::Visible
        );
    }

    #[test]
    fn stock_levels_map_to_states() {
        let s = seller(true, None);
        assert_eq!(evaluate(product(true, 0), s, at(12)), VisibilityState::OutOfStock);
        assert_eq!(evaluate(product(true, 1), s, at(12)), VisibilityState::LowStock);
        assert_eq!(
            evaluate(product(true, LOW_STOCK_THRESHOLD), s, at(12)),
            VisibilityState::LowStock
        );
        assert_eq!(
            evaluate(product(true, LOW_STOCK_THRESHOLD + 1), s, at(12)),
            VisibilityState::Visible
        );
    }

    #[test]
    fn negative_stock_degrades_to_out_of_stock() {
        assert_eq!(
            evaluate(product(true, -3), seller(true, None), at(12)),
            VisibilityState::OutOfStock
        );
    }

    #[test]
    fn out_of_stock_is_listable_but_not_purchasable() {
        let state = evaluate(product(true, 0), seller(true, None), at(12));
        assert!(state.is_listable());
        assert!(!state.is_purchasable());
    }

    /// Mirrors the WHERE clause `storefront_condition` builds, over the same
    /// snapshots the evaluator sees.
    fn storefront_accepts(
        product: ProductSnapshot,
        seller: Option<SellerSnapshot>,
        now: DateTime<Utc>,
    ) -> bool {
        product.active
            && seller.is_some_and(|s| {
                s.active && s.subscription_end_at.is_none_or(|end| end >= now)
            })
    }

    fn arb_seller() -> impl Strategy<Value = Option<SellerSnapshot>> {
        proptest::option::of((any::<bool>(), proptest::option::of(-1000i64..1000)).prop_map(
            |(active, end_hours)| SellerSnapshot {
                active,
                subscription_end_at: end_hours
                    .map(|h| at(12) + chrono::Duration::hours(h)),
            },
        ))
    }

    proptest! {
        // The SQL predicate and the row-level evaluator must agree on which
        // products the storefront shows, for any catalog shape.
        #[test]
        fn listing_predicate_matches_evaluator(
            active in any::<bool>(),
            stock_qty in -5i32..200,
            seller in arb_seller(),
        ) {
            let now = at(12);
            let p = ProductSnapshot { active, stock_qty };
            let state = evaluate(p, seller, now);
            prop_assert_eq!(storefront_accepts(p, seller, now), state.is_listable());
        }

        // Purchasable is strictly stronger than listable.
        #[test]
        fn purchasable_implies_listable(
            active in any::<bool>(),
            stock_qty in -5i32..200,
            seller in arb_seller(),
        ) {
            let state = evaluate(ProductSnapshot { active, stock_qty }, seller, at(12));
            if state.is_purchasable() {
                prop_assert!(state.is_listable());
            }
        }
    }
}
