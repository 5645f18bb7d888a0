//! Case conversion for generated text: identifiers to display labels and to lowercase code names.

/// Convert an identifier to a human label.
/// e.g. "EVENT_DATE" -> "Event Date", "incident_id" -> "Incident Id"
pub fn to_display_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out.trim_end().to_string()
}

/// Convert an identifier to a lowercase snake name usable as a code symbol or file stem.
/// e.g. "ADVERSE_EVENTS" -> "adverse_events"
pub fn to_code_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
