use chrono::{DateTime, Utc};
use rand::Rng;

/// Generates human-readable quote numbers: `{prefix}-{yyyyMMdd}-{000..999}`.
///
/// The random suffix is not collision free; the unique index on
/// `quoteNumber` catches duplicates and the service regenerates.
#[derive(Debug, Clone)]
pub struct QuoteNumberGenerator {
    prefix: String,
}

impl QuoteNumberGenerator {
    pub fn new<T: Into<String>>(prefix: T) -> Self {
        QuoteNumberGenerator { prefix: prefix.into() }
    }

    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::thread_rng().gen_range(0..1000);
        self.format(now, suffix)
    }

    pub fn format(&self, now: DateTime<Utc>, suffix: u16) -> String {
        format!("{}-{}-{:03}", self.prefix, now.format("%Y%m%d"), suffix % 1000)
    }
}

impl Default for QuoteNumberGenerator {
    fn default() -> Self {
        QuoteNumberGenerator::new("QT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn looks_like_quote_number(value: &str, date: &str) -> bool {
        let parts: Vec<&str> = value.split('-').collect();
        parts.len() == 3
            && parts[0] == "QT"
            && parts[1] == date
            && parts[2].len() == 3
            && parts[2].chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_generated_number_embeds_utc_date() {
        let generator = QuoteNumberGenerator::default();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 0).unwrap();
        for _ in 0..50 {
            let number = generator.generate(now);
            assert!(looks_like_quote_number(&number, "20261016"), "bad number {number}");
        }
    }

    #[test]
    fn test_suffix_is_zero_padded() {
        let generator = QuoteNumberGenerator::default();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(generator.format(now, 7), "QT-20260105-007");
        assert_eq!(generator.format(now, 999), "QT-20260105-999");
    }

    #[test]
    fn test_custom_prefix() {
        let generator = QuoteNumberGenerator::new("HS");
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(generator.format(now, 42), "HS-20260105-042");
    }
}
