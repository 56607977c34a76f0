use super::EmailMessage;
use crate::models::ConsultationRequest;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn optional_row(label: &str, value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => format!("<tr><td><strong>{}</strong></td><td>{}</td></tr>", label, escape(v)),
        None => String::new(),
    }
}

pub fn customer_confirmation(from: &str, request: &ConsultationRequest) -> EmailMessage {
    let services = if request.selected_services.is_empty() {
        String::new()
    } else {
        format!(
            "<p>You asked us about: {}.</p>",
            escape(&request.selected_services.join(", "))
        )
    };

    EmailMessage {
        from: from.to_string(),
        to: vec![request.email.clone()],
        subject: "We received your consultation request".to_string(),
        html: format!(
            "<p>Hi {},</p>\
             <p>Thanks for reaching out. A consultant will contact you within one business day.</p>\
             {}\
             <p>Reference: {}</p>",
            escape(&request.first_name),
            services,
            request.id
        ),
    }
}

pub fn internal_alert(from: &str, to: &str, request: &ConsultationRequest) -> EmailMessage {
    let rows = [
        optional_row("Name", Some(&request.full_name())),
        optional_row("Email", Some(&request.email)),
        optional_row("Designation", request.designation.as_deref()),
        optional_row("Company", request.company_name.as_deref()),
        optional_row("Business field", request.business_field.as_deref()),
        optional_row(
            "Services",
            Some(&request.selected_services.join(", ")),
        ),
        optional_row("Other", request.other_service_description.as_deref()),
    ]
    .concat();

    EmailMessage {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("New consultation request from {}", request.full_name()),
        html: format!(
            "<p>A new lead came in via the {} form.</p><table>{}</table><p>Id: {}</p>",
            request.source, rows, request.id
        ),
    }
}
