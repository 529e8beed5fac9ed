//! Client-side form validation
//!
//! Input failing these rules never reaches the network.

use rust_decimal::Decimal;
use thiserror::Error;

/// Minimum accepted destination address length
pub const MIN_DESTINATION_LEN: usize = 10;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount is required")]
    AmountRequired,

    #[error("Amount must be a valid number")]
    AmountNotANumber,

    #[error("Amount must be greater than 0")]
    AmountNotPositive,

    #[error("Destination address is required")]
    DestinationRequired,

    #[error("Destination address is too short")]
    DestinationTooShort,

    #[error("Confirmation is required")]
    ConfirmationRequired,
}

/// Raw form input as collected by the presentation layer
#[derive(Debug, Clone, Default)]
pub struct WithdrawForm {
    pub amount: String,
    pub destination: String,
    pub confirm: bool,
}

/// Validated, network-ready withdrawal parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWithdraw {
    pub amount: Decimal,
    pub destination: String,
}

/// Validate the amount field on its own (for per-field UI feedback)
pub fn validate_amount(value: &str) -> Result<Decimal, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::AmountRequired);
    }
    let amount: Decimal = trimmed
        .parse()
        .map_err(|_| ValidationError::AmountNotANumber)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }
    Ok(amount)
}

/// Validate the destination field on its own (for per-field UI feedback)
pub fn validate_destination(value: &str) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::DestinationRequired);
    }
    if trimmed.len() < MIN_DESTINATION_LEN {
        return Err(ValidationError::DestinationTooShort);
    }
    Ok(trimmed)
}

impl WithdrawForm {
    /// Validate the whole form; submission is only enabled when this passes
    pub fn validate(&self) -> Result<ValidatedWithdraw, ValidationError> {
        let amount = validate_amount(&self.amount)?;
        let destination = validate_destination(&self.destination)?;
        if !self.confirm {
            return Err(ValidationError::ConfirmationRequired);
        }
        Ok(ValidatedWithdraw {
            amount,
            destination: destination.to_string(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(amount: &str, destination: &str, confirm: bool) -> WithdrawForm {
        WithdrawForm {
            amount: amount.to_string(),
            destination: destination.to_string(),
            confirm,
        }
    }

    #[test]
    fn test_amount_rules() {
        assert_eq!(validate_amount(""), Err(ValidationError::AmountRequired));
        assert_eq!(
            validate_amount("abc"),
            Err(ValidationError::AmountNotANumber)
        );
        assert_eq!(validate_amount("0"), Err(ValidationError::AmountNotPositive));
        assert_eq!(
            validate_amount("-5"),
            Err(ValidationError::AmountNotPositive)
        );
        assert_eq!(validate_amount("100.5").unwrap().to_string(), "100.5");
    }

    #[test]
    fn test_destination_rules() {
        assert_eq!(
            validate_destination(""),
            Err(ValidationError::DestinationRequired)
        );
        assert_eq!(
            validate_destination("0x1234"),
            Err(ValidationError::DestinationTooShort)
        );
        assert!(validate_destination("0x12345678901234567890").is_ok());
    }

    #[test]
    fn test_confirmation_required() {
        let unconfirmed = form("100.5", "0x12345678901234567890", false);
        assert_eq!(
            unconfirmed.validate(),
            Err(ValidationError::ConfirmationRequired)
        );
        assert!(!unconfirmed.is_valid());
    }

    #[test]
    fn test_valid_form() {
        let valid = form("100.5", "0x12345678901234567890", true);
        let checked = valid.validate().unwrap();
        assert_eq!(checked.destination, "0x12345678901234567890");
        assert!(valid.is_valid());
    }

    #[test]
    fn test_amount_checked_before_destination() {
        // First failing field wins, matching the form's error priority
        let bad = form("", "", false);
        assert_eq!(bad.validate(), Err(ValidationError::AmountRequired));
    }
}
