//! Static pricing catalog: the services the firm sells and the add-ons
//! offered alongside them. Entries are built in at compile time and never
//! mutated.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BillingType {
    OneTime,
    Monthly,
    PerDay,
}

/// A fixed price, or a negotiable range whose floor is the default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSpec {
    Fixed {
        #[schema(value_type = String)]
        amount: Decimal,
    },
    Range {
        #[schema(value_type = String)]
        min: Decimal,
        #[schema(value_type = String)]
        max: Decimal,
    },
}

impl PriceSpec {
    pub fn min(&self) -> Decimal {
        match self {
            PriceSpec::Fixed { amount } => *amount,
            PriceSpec::Range { min, .. } => *min,
        }
    }

    pub fn max(&self) -> Decimal {
        match self {
            PriceSpec::Fixed { amount } => *amount,
            PriceSpec::Range { max, .. } => *max,
        }
    }

    pub fn is_negotiable(&self) -> bool {
        matches!(self, PriceSpec::Range { .. })
    }

    /// Brings `price` into `[min, max]`; boundary values are kept as-is.
    pub fn clamp(&self, price: Decimal) -> Decimal {
        price.max(self.min()).min(self.max())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub price: PriceSpec,
    pub billing_type: BillingType,
    /// Add-ons offered with this service, in display order.
    pub addon_ids: Vec<String>,
}

impl Service {
    /// What the service itself contributes to the one-time total.
    pub fn base_price(&self) -> Decimal {
        self.price.min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOn {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: PriceSpec,
    pub billing_type: BillingType,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<Service>,
    addons: Vec<AddOn>,
}

fn fixed(amount: Decimal) -> PriceSpec {
    PriceSpec::Fixed { amount }
}

fn range(min: Decimal, max: Decimal) -> PriceSpec {
    PriceSpec::Range { min, max }
}

fn addon(id: &str, name: &str, description: &str, price: PriceSpec, billing_type: BillingType) -> AddOn {
    AddOn {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        price,
        billing_type,
    }
}

fn service(id: &str, name: &str, description: &str, price: PriceSpec, addon_ids: &[&str]) -> Service {
    Service {
        id: id.into(),
        display_name: name.into(),
        description: description.into(),
        price,
        billing_type: BillingType::OneTime,
        addon_ids: addon_ids.iter().map(|id| id.to_string()).collect(),
    }
}

impl Catalog {
    pub fn new(services: Vec<Service>, addons: Vec<AddOn>) -> Self {
        Self { services, addons }
    }

    /// The catalog shipped with the site.
    pub fn builtin() -> Self {
        let addons = vec![
            addon(
                "monthly-retainer",
                "Monthly Advisory Retainer",
                "Two strategy calls a month and async support",
                fixed(dec!(9999)),
                BillingType::Monthly,
            ),
            addon(
                "competitor-deep-dive",
                "Competitor Deep Dive",
                "Positioning and pricing teardown of five competitors",
                fixed(dec!(29999)),
                BillingType::OneTime,
            ),
            addon(
                "onsite-workshop",
                "On-site Workshop",
                "A facilitated day with your leadership team",
                fixed(dec!(19999)),
                BillingType::PerDay,
            ),
            addon(
                "content-calendar",
                "Content Calendar",
                "Monthly editorial plan, scoped to your channel mix",
                range(dec!(4999), dec!(14999)),
                BillingType::Monthly,
            ),
            addon(
                "seo-foundations",
                "SEO Foundations",
                "Technical audit fixes and keyword architecture",
                range(dec!(9999), dec!(24999)),
                BillingType::OneTime,
            ),
            addon(
                "priority-support",
                "Priority Support",
                "Same-day responses from a named consultant",
                fixed(dec!(7499)),
                BillingType::Monthly,
            ),
        ];

        let services = vec![
            service(
                "digital-presence-audit",
                "Digital Presence Audit",
                "Website, search and social review with a prioritised action plan",
                fixed(dec!(14999)),
                &[
                    "monthly-retainer",
                    "competitor-deep-dive",
                    "seo-foundations",
                    "priority-support",
                ],
            ),
            service(
                "growth-strategy-sprint",
                "Growth Strategy Sprint",
                "Four-week sprint producing a go-to-market and channel plan",
                fixed(dec!(49999)),
                &[
                    "monthly-retainer",
                    "competitor-deep-dive",
                    "onsite-workshop",
                    "content-calendar",
                ],
            ),
            service(
                "brand-identity-package",
                "Brand Identity Package",
                "Naming, visual identity and brand guidelines",
                range(dec!(24999), dec!(74999)),
                &["onsite-workshop", "content-calendar", "priority-support"],
            ),
            service(
                "web-platform-build",
                "Web Platform Build",
                "Design and build of a marketing site with CMS handover",
                fixed(dec!(99999)),
                &[
                    "seo-foundations",
                    "content-calendar",
                    "priority-support",
                    "monthly-retainer",
                ],
            ),
        ];

        Self::new(services, addons)
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn addon(&self, id: &str) -> Option<&AddOn> {
        self.addons.iter().find(|a| a.id == id)
    }

    /// Add-ons offered with `service`, skipping ids with no catalog entry.
    pub fn addons_for(&self, service: &Service) -> Vec<AddOn> {
        service
            .addon_ids
            .iter()
            .filter_map(|id| self.addon(id).cloned())
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
