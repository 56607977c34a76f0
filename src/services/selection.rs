//! Add-on selection state and checkout totals.
//!
//! Totals are always derived from the selection on demand; nothing caches
//! them, so a displayed total can never lag behind the selection.

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::catalog::{AddOn, BillingType, Catalog, Service};
use crate::models::OrderAddOn;

/// How recurring add-ons are treated at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FuturePaymentPolicy {
    /// Monthly add-ons are billed later and excluded from today's charge.
    #[default]
    RecurringLater,
    /// No future payments: everything selected is collected now.
    CollectUpfront,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectedAddOn {
    pub addon: AddOn,
    pub selected: bool,
    #[schema(value_type = String)]
    pub selected_price: Decimal,
}

impl SelectedAddOn {
    fn new(addon: AddOn) -> Self {
        let selected_price = addon.price.min();
        Self {
            addon,
            selected: false,
            selected_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutTotals {
    #[schema(value_type = String, example = "44998")]
    pub one_time_total: Decimal,
    #[schema(value_type = String, example = "9999")]
    pub monthly_total: Decimal,
}

/// Wire form of one selected add-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOnChoice {
    pub id: String,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("service '{0}' is not in the catalog")]
    UnknownService(String),

    #[error("add-on '{0}' is not offered with this service")]
    UnknownAddOn(String),

    #[error("amount {0} cannot be expressed in minor units")]
    AmountOutOfRange(Decimal),
}

/// Computes totals for a service and its add-on selection.
///
/// Pure: the same inputs always give the same totals.
pub fn compute_totals(
    service: &Service,
    addons: &[SelectedAddOn],
    policy: FuturePaymentPolicy,
) -> CheckoutTotals {
    let mut one_time_total = service.base_price();
    let mut monthly_total = Decimal::ZERO;

    for choice in addons.iter().filter(|a| a.selected) {
        match choice.addon.billing_type {
            BillingType::OneTime | BillingType::PerDay => one_time_total += choice.selected_price,
            BillingType::Monthly => {
                monthly_total += choice.selected_price;
                if policy == FuturePaymentPolicy::CollectUpfront {
                    one_time_total += choice.selected_price;
                }
            }
        }
    }

    CheckoutTotals {
        one_time_total,
        monthly_total,
    }
}

/// Converts a major-unit amount to minor units (x100), rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, SelectionError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(SelectionError::AmountOutOfRange(amount))
}

/// One buyer's selection for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    service: Service,
    addons: Vec<SelectedAddOn>,
    policy: FuturePaymentPolicy,
}

impl Selection {
    /// Every add-on offered with `service`, unselected, at its minimum price.
    pub fn for_service(service: &Service, catalog: &Catalog, policy: FuturePaymentPolicy) -> Self {
        Self {
            service: service.clone(),
            addons: catalog
                .addons_for(service)
                .into_iter()
                .map(SelectedAddOn::new)
                .collect(),
            policy,
        }
    }

    /// Rebuilds a selection from its wire form, re-pricing from the catalog.
    pub fn from_choices(
        catalog: &Catalog,
        service_id: &str,
        choices: &[AddOnChoice],
        policy: FuturePaymentPolicy,
    ) -> Result<Self, SelectionError> {
        let service = catalog
            .service(service_id)
            .ok_or_else(|| SelectionError::UnknownService(service_id.to_string()))?;
        let mut selection = Self::for_service(service, catalog, policy);
        for choice in choices {
            selection.toggle_addon(&choice.id, true)?;
            if let Some(price) = choice.price {
                selection.set_addon_price(&choice.id, price)?;
            }
        }
        Ok(selection)
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn policy(&self) -> FuturePaymentPolicy {
        self.policy
    }

    pub fn addons(&self) -> &[SelectedAddOn] {
        &self.addons
    }

    pub fn selected(&self) -> impl Iterator<Item = &SelectedAddOn> {
        self.addons.iter().filter(|a| a.selected)
    }

    fn find_mut(&mut self, addon_id: &str) -> Result<&mut SelectedAddOn, SelectionError> {
        self.addons
            .iter_mut()
            .find(|a| a.addon.id == addon_id)
            .ok_or_else(|| SelectionError::UnknownAddOn(addon_id.to_string()))
    }

    /// Selecting an add-on always starts it at its minimum price, so an
    /// off-then-on round trip discards any negotiated price.
    pub fn toggle_addon(
        &mut self,
        addon_id: &str,
        selected: bool,
    ) -> Result<&[SelectedAddOn], SelectionError> {
        let entry = self.find_mut(addon_id)?;
        if selected && !entry.selected {
            entry.selected_price = entry.addon.price.min();
        }
        entry.selected = selected;
        Ok(&self.addons)
    }

    /// Sets a negotiated price, clamped into the add-on's range. Fixed-price
    /// add-ons keep their price.
    pub fn set_addon_price(
        &mut self,
        addon_id: &str,
        price: Decimal,
    ) -> Result<&[SelectedAddOn], SelectionError> {
        let entry = self.find_mut(addon_id)?;
        entry.selected_price = entry.addon.price.clamp(price);
        Ok(&self.addons)
    }

    pub fn totals(&self) -> CheckoutTotals {
        compute_totals(&self.service, &self.addons, self.policy)
    }

    pub fn to_choices(&self) -> Vec<AddOnChoice> {
        self.selected()
            .map(|a| AddOnChoice {
                id: a.addon.id.clone(),
                price: a.addon.price.is_negotiable().then_some(a.selected_price),
            })
            .collect()
    }

    pub fn order_addons(&self) -> Vec<OrderAddOn> {
        self.selected()
            .map(|a| OrderAddOn {
                id: a.addon.id.clone(),
                name: a.addon.name.clone(),
                price: a.selected_price,
                billing_type: a.addon.billing_type,
            })
            .collect()
    }
}
