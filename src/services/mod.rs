// Pricing and selection
pub mod catalog;
pub mod selection;

// Checkout
pub mod checkout;
pub mod checkout_session;

// Leads and back office
pub mod admin;
pub mod consultations;
pub mod filters;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Basic `local@domain.tld` shape; deliverability is the email provider's problem.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub(crate) fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("email must look like local@domain.tld".into());
        Err(err)
    }
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

pub(crate) fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("currency must be a 3-letter ISO code".into());
        Err(err)
    }
}
