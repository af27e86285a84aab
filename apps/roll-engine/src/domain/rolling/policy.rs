//! Roll policy parameters.

use serde::{Deserialize, Serialize};

use crate::domain::option_position::OptionRight;
use crate::domain::shared::DomainError;

/// Strike-selection and timing parameters shared by both roll cadences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollPolicy {
    /// Minimum absolute delta a strike must reach (0.10 = 10 delta).
    pub target_delta: f64,
    /// Contracts sold per opening order.
    pub contracts: u32,
    /// Days after the prior earnings date for the monthly expiry.
    pub monthly_offset_days: u32,
    /// Days after today for the weekly expiry.
    pub weekly_offset_days: u32,
    /// Right of the options being sold.
    pub right: OptionRight,
}

impl Default for RollPolicy {
    fn default() -> Self {
        Self {
            target_delta: 0.10,
            contracts: 1,
            monthly_offset_days: 30,
            weekly_offset_days: 7,
            right: OptionRight::Put,
        }
    }
}

impl RollPolicy {
    /// Validate policy values.
    ///
    /// # Errors
    ///
    /// Returns error if the delta is outside (0, 1) or a count is zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_target_delta(self.target_delta)?;
        if self.contracts == 0 {
            return Err(DomainError::invalid_value(
                "contracts",
                "must be at least 1",
            ));
        }
        if self.monthly_offset_days == 0 {
            return Err(DomainError::invalid_value(
                "monthly_offset_days",
                "must be at least 1",
            ));
        }
        if self.weekly_offset_days == 0 {
            return Err(DomainError::invalid_value(
                "weekly_offset_days",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Check that a delta target lies strictly between 0 and 1.
///
/// # Errors
///
/// Returns error for values outside (0, 1), including NaN.
pub fn validate_target_delta(target_delta: f64) -> Result<(), DomainError> {
    if target_delta > 0.0 && target_delta < 1.0 {
        Ok(())
    } else {
        Err(DomainError::invalid_value(
            "target_delta",
            format!("must be in (0, 1), got {target_delta}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_policy_is_valid() {
        let policy = RollPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.monthly_offset_days, 30);
        assert_eq!(policy.weekly_offset_days, 7);
        assert_eq!(policy.right, OptionRight::Put);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(1.0 ; "one")]
    #[test_case(-0.1 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    fn invalid_target_delta(delta: f64) {
        assert!(validate_target_delta(delta).is_err());
    }

    #[test]
    fn zero_contracts_rejected() {
        let policy = RollPolicy {
            contracts: 0,
            ..RollPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("contracts"));
    }
}
