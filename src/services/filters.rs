//! List filtering for the admin views: case-insensitive substring search
//! AND exact status match.

use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::models::{ConsultationRequest, Order, UserAccount};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    /// Substring matched against names, emails and ids
    pub search: Option<String>,
    /// Exact status value
    pub status: Option<String>,
}

impl ListFilter {
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn wanted_status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "all")
    }

    pub fn matches<T: Searchable>(&self, item: &T) -> bool {
        let search_ok = match self.needle() {
            Some(needle) => item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        };
        let status_ok = match self.wanted_status() {
            Some(status) => item.status_value() == status,
            None => true,
        };
        search_ok && status_ok
    }

    pub fn apply<T: Searchable>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

pub trait Searchable {
    fn search_fields(&self) -> Vec<String>;
    fn status_value(&self) -> String;
}

impl Searchable for Order {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.to_string(),
            self.customer_email.clone(),
            self.service_name.clone(),
            self.gateway_order_id.clone(),
        ];
        fields.extend(self.customer_name.clone());
        fields.extend(self.gateway_payment_id.clone());
        fields
    }

    fn status_value(&self) -> String {
        self.status.to_string()
    }
}

impl Searchable for ConsultationRequest {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.id.to_string(), self.full_name(), self.email.clone()];
        fields.extend(self.company_name.clone());
        fields
    }

    fn status_value(&self) -> String {
        self.status.to_string()
    }
}

impl Searchable for UserAccount {
    fn search_fields(&self) -> Vec<String> {
        vec![self.id.clone(), self.email.clone()]
    }

    /// `suspended` while a ban is in force, otherwise `active`.
    fn status_value(&self) -> String {
        match self.banned_until {
            Some(until) if until > Utc::now() => "suspended".into(),
            _ => "active".into(),
        }
    }
}
