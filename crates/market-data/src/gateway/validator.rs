//! Payload validation.
//!
//! Checks normalised upstream payloads before they are cached:
//! - Non-empty identifiers
//! - Finite, non-negative prices
//! - Non-empty price series and index readings
//! - Fear & Greed values within 0..=100

use log::warn;

use crate::errors::MarketDataError;
use crate::models::{PricePoint, ResourceData};

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Reject the payload; the gateway classifies it as invalid data.
    Hard,
    /// Accept the payload but log a warning.
    Soft,
}

/// A single validation finding.
#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
}

impl ValidationIssue {
    fn hard(message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Hard,
            message: message.into(),
        }
    }

    fn soft(message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Soft,
            message: message.into(),
        }
    }
}

/// Structural validator for [`ResourceData`].
#[derive(Clone, Debug, Default)]
pub struct PayloadValidator;

impl PayloadValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a payload from `provider`.
    ///
    /// Soft issues are logged; any hard issue rejects the payload with
    /// [`MarketDataError::InvalidPayload`].
    pub fn validate(&self, provider: &str, data: &ResourceData) -> Result<(), MarketDataError> {
        let issues = self.issues(data);

        let errors: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();
        if !errors.is_empty() {
            return Err(MarketDataError::InvalidPayload {
                provider: provider.to_string(),
                message: errors.join("; "),
            });
        }

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!("{} payload warning ({}): {}", provider, data.kind_name(), issue.message);
        }
        Ok(())
    }

    /// All findings for a payload.
    pub fn issues(&self, data: &ResourceData) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        match data {
            ResourceData::Markets(coins) => {
                if coins.is_empty() {
                    issues.push(ValidationIssue::soft("Empty market listing"));
                }
                for coin in coins {
                    check_id(&coin.id, &mut issues);
                    check_price(&coin.id, coin.current_price, &mut issues);
                }
            }
            ResourceData::CoinDetail(detail) => {
                check_id(&detail.id, &mut issues);
                check_price(&detail.id, detail.current_price, &mut issues);
            }
            ResourceData::Trending(coins) => {
                if coins.is_empty() {
                    issues.push(ValidationIssue::soft("Empty trending list"));
                }
                for coin in coins {
                    check_id(&coin.id, &mut issues);
                }
            }
            ResourceData::Historical(points) => check_series(points, &mut issues),
            ResourceData::FearGreed(entries) => {
                if entries.is_empty() {
                    issues.push(ValidationIssue::hard("No Fear & Greed readings"));
                }
                for entry in entries.iter().filter(|e| e.value > 100) {
                    issues.push(ValidationIssue::hard(format!(
                        "Fear & Greed value {} out of range",
                        entry.value
                    )));
                }
            }
        }
        issues
    }
}

fn check_id(id: &str, issues: &mut Vec<ValidationIssue>) {
    if id.trim().is_empty() {
        issues.push(ValidationIssue::hard("Empty coin id"));
    }
}

fn check_price(id: &str, price: f64, issues: &mut Vec<ValidationIssue>) {
    if !price.is_finite() || price < 0.0 {
        issues.push(ValidationIssue::hard(format!("Invalid price {} for '{}'", price, id)));
    } else if price == 0.0 {
        issues.push(ValidationIssue::soft(format!("Zero price for '{}'", id)));
    }
}

fn check_series(points: &[PricePoint], issues: &mut Vec<ValidationIssue>) {
    if points.is_empty() {
        issues.push(ValidationIssue::hard("Empty price series"));
        return;
    }
    if let Some(bad) = points.iter().find(|p| !p.price.is_finite() || p.price < 0.0) {
        issues.push(ValidationIssue::hard(format!(
            "Invalid price {} at {}",
            bad.price, bad.timestamp
        )));
    }
    if points.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        issues.push(ValidationIssue::hard("Price series is not in ascending order"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FearGreedEntry, TrendingCoin};

    #[test]
    fn test_valid_series() {
        let data = ResourceData::Historical(vec![PricePoint::new(0, 1.0), PricePoint::new(1, 2.0)]);
        assert!(PayloadValidator::new().validate("TEST", &data).is_ok());
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let err = PayloadValidator::new()
            .validate("TEST", &ResourceData::Historical(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidPayload { .. }));
    }

    #[test]
    fn test_nan_and_negative_prices_are_rejected() {
        let validator = PayloadValidator::new();
        for price in [f64::NAN, f64::INFINITY, -1.0] {
            let data = ResourceData::Historical(vec![PricePoint::new(0, price)]);
            assert!(validator.validate("TEST", &data).is_err(), "{}", price);
        }
    }

    #[test]
    fn test_unsorted_series_is_rejected() {
        let data =
            ResourceData::Historical(vec![PricePoint::new(10, 1.0), PricePoint::new(5, 1.0)]);
        assert!(PayloadValidator::new().validate("TEST", &data).is_err());
    }

    #[test]
    fn test_fear_greed_range() {
        let entry = |value| FearGreedEntry {
            value,
            classification: String::new(),
            timestamp: 0,
        };
        let validator = PayloadValidator::new();
        assert!(validator
            .validate("TEST", &ResourceData::FearGreed(vec![entry(100)]))
            .is_ok());
        assert!(validator
            .validate("TEST", &ResourceData::FearGreed(vec![entry(101)]))
            .is_err());
        assert!(validator
            .validate("TEST", &ResourceData::FearGreed(Vec::new()))
            .is_err());
    }

    #[test]
    fn test_empty_trending_is_only_a_warning() {
        let validator = PayloadValidator::new();
        let issues = validator.issues(&ResourceData::Trending(Vec::new()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ValidationSeverity::Soft);

        let blank = ResourceData::Trending(vec![TrendingCoin {
            id: " ".into(),
            name: "x".into(),
            symbol: "x".into(),
            image: String::new(),
            market_cap_rank: None,
            score: 0,
        }]);
        assert!(validator.validate("TEST", &blank).is_err());
    }
}
