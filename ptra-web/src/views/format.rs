//! Display formatting helpers

use chrono::{NaiveDate, NaiveDateTime};
use ptra_common::progress::round_to_tenth;

/// Escape text for an HTML element body
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape text for a double-quoted attribute value
pub fn attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// `1234567.5` -> `1,234,567.50`
pub fn thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // No sign when the value rounds to zero
    let sign = if value <= -0.005 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

pub fn naira(value: f64) -> String {
    format!("₦{}", thousands(value))
}

pub fn dollars(value: f64) -> String {
    format!("${}", thousands(value))
}

/// One decimal place with a percent sign
pub fn percent(value: f64) -> String {
    format!("{:.1}%", round_to_tenth(value))
}

pub fn date(value: Option<NaiveDate>) -> String {
    match value {
        Some(d) => d.format("%b %-d, %Y").to_string(),
        None => "Not set".to_string(),
    }
}

pub fn timestamp(value: NaiveDateTime) -> String {
    value.format("%b %-d, %Y %H:%M").to_string()
}

/// `2025-06` -> `June 2025`
pub fn month_label(month_year: &str) -> String {
    NaiveDate::parse_from_str(&format!("{}-01", month_year), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| month_year.to_string())
}

/// Inline progress bar
pub fn progress_bar(value: f64) -> String {
    let band = ptra_common::progress::ProgressBand::for_percentage(value);
    let width = value.clamp(0.0, 100.0);
    format!(
        r#"<div class="progress"><div class="progress-bar bg-{}" style="width: {:.1}%">{}</div></div>"#,
        band.css_class(),
        width,
        percent(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0.0), "0.00");
        assert_eq!(thousands(999.0), "999.00");
        assert_eq!(thousands(1000.0), "1,000.00");
        assert_eq!(thousands(1_234_567.5), "1,234,567.50");
        assert_eq!(thousands(-2500.0), "-2,500.00");
    }

    #[test]
    fn test_currency() {
        assert_eq!(naira(1_500_000.0), "₦1,500,000.00");
        assert_eq!(dollars(12.345), "$12.35");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(attr("a\"b"), "a&quot;b");
    }

    #[test]
    fn test_dates() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2025, 3, 1)), "Mar 1, 2025");
        assert_eq!(date(None), "Not set");
        assert_eq!(month_label("2025-06"), "June 2025");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(33.333), "33.3%");
        assert_eq!(percent(100.0), "100.0%");
    }
}
