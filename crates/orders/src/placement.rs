//! Placement request: what a caller submits to turn a cart into an order.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Money, UserId};

use crate::order::{NewOrder, OrderLine};

/// Payment channel the caller intends to use once the order is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Mpesa,
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "MPESA",
            PaymentMethod::Stripe => "STRIPE",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MPESA" => Ok(PaymentMethod::Mpesa),
            "STRIPE" => Ok(PaymentMethod::Stripe),
            _ => Err(DomainError::validation(
                "payment_method must be one of: MPESA, STRIPE",
            )),
        }
    }
}

/// Command: PlaceOrder.
///
/// `amount` is taken as submitted; it is not recomputed from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub amount: Money,
    pub shipping_amount: Money,
    pub shipping_address: String,
    pub lines: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    /// Structural checks that must pass before any storage work starts.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.amount.is_positive() {
            return Err(DomainError::validation("amount must be greater than 0"));
        }
        if self.shipping_amount.is_negative() {
            return Err(DomainError::validation(
                "shipping_amount must be greater than or equal to 0",
            ));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping_address is required"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        for line in &self.lines {
            line.validate()?;
        }
        Ok(())
    }

    /// Sum of `price * quantity` over the lines; `None` on overflow.
    ///
    /// Informational only: `amount` is not checked against it.
    pub fn lines_total(&self) -> Option<Money> {
        self.lines.iter().try_fold(Money::ZERO, |total, line| {
            line.price
                .checked_mul(i64::from(line.quantity))
                .and_then(|subtotal| total.checked_add(subtotal))
        })
    }

    /// Header to insert for this request.
    pub fn header(&self) -> NewOrder {
        NewOrder {
            user_id: self.user_id,
            amount: self.amount,
            shipping_amount: self.shipping_amount,
            shipping_address: self.shipping_address.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storefront_core::ProductId;

    fn valid_request() -> PlaceOrder {
        PlaceOrder {
            user_id: UserId::new(1),
            amount: Money::from_minor(4000),
            shipping_amount: Money::from_minor(500),
            shipping_address: "Nairobi".to_string(),
            lines: vec![OrderLine::new(ProductId::new(10), 2, Money::from_minor(2000))],
            payment_method: PaymentMethod::Mpesa,
        }
    }

    fn validation_message(req: &PlaceOrder) -> String {
        match req.validate() {
            Err(DomainError::Validation(msg)) => msg,
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn zero_shipping_is_allowed() {
        let mut req = valid_request();
        req.shipping_amount = Money::ZERO;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut req = valid_request();
        req.amount = Money::ZERO;
        assert!(validation_message(&req).contains("amount"));
    }

    #[test]
    fn negative_shipping_is_rejected() {
        let mut req = valid_request();
        req.shipping_amount = Money::from_minor(-1);
        assert!(validation_message(&req).contains("shipping_amount"));
    }

    #[test]
    fn blank_address_is_rejected() {
        let mut req = valid_request();
        req.shipping_address = "   ".to_string();
        assert!(validation_message(&req).contains("shipping_address"));
    }

    #[test]
    fn empty_lines_are_rejected() {
        let mut req = valid_request();
        req.lines.clear();
        assert!(validation_message(&req).contains("at least one item"));
    }

    #[test]
    fn bad_line_is_rejected() {
        let mut req = valid_request();
        req.lines.push(OrderLine::new(ProductId::new(11), 0, Money::from_minor(100)));
        assert!(validation_message(&req).contains("product 11"));
    }

    #[test]
    fn header_trims_address() {
        let mut req = valid_request();
        req.shipping_address = "  Nairobi ".to_string();
        assert_eq!(req.header().shipping_address, "Nairobi");
    }

    #[test]
    fn lines_total_sums_price_times_quantity() {
        let mut req = valid_request();
        req.lines.push(OrderLine::new(ProductId::new(11), 3, Money::from_minor(150)));
        assert_eq!(req.lines_total(), Some(Money::from_minor(4450)));

        req.lines.push(OrderLine::new(ProductId::new(12), 2, Money::from_minor(i64::MAX)));
        assert_eq!(req.lines_total(), None);
    }

    #[test]
    fn payment_method_parsing() {
        assert_eq!("mpesa".parse::<PaymentMethod>().unwrap(), PaymentMethod::Mpesa);
        assert_eq!("STRIPE".parse::<PaymentMethod>().unwrap(), PaymentMethod::Stripe);
        assert!("PAYPAL".parse::<PaymentMethod>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: validation accepts a request exactly when every
        /// documented precondition holds.
        #[test]
        fn validation_matches_preconditions(
            amount in -1_000i64..100_000,
            shipping in -1_000i64..10_000,
            quantities in prop::collection::vec(0u32..5, 0..4),
            price in -10i64..10_000,
        ) {
            let req = PlaceOrder {
                user_id: UserId::new(1),
                amount: Money::from_minor(amount),
                shipping_amount: Money::from_minor(shipping),
                shipping_address: "Nairobi".to_string(),
                lines: quantities
                    .iter()
                    .enumerate()
                    .map(|(i, q)| OrderLine::new(ProductId::new(i as i64 + 1), *q, Money::from_minor(price)))
                    .collect(),
                payment_method: PaymentMethod::Stripe,
            };

            let expected_ok = amount > 0
                && shipping >= 0
                && !quantities.is_empty()
                && quantities.iter().all(|q| *q > 0)
                && price > 0;

            prop_assert_eq!(req.validate().is_ok(), expected_ok);
        }
    }
}
