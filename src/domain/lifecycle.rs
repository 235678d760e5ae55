//! Order status graph and the payment enums stored alongside it.
//!
//! ```text
//! pending -> confirmed -> in_production -> ready_for_delivery -> delivered
//!    \            \
//!     `-----------`-> cancelled
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProduction,
    ReadyForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::InProduction,
        OrderStatus::ReadyForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProduction => "in_production",
            OrderStatus::ReadyForDelivery => "ready_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Writing the current status again is accepted so repeated requests are idempotent.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        self == next
            || matches!(
                (self, next),
                (Pending, Confirmed)
                    | (Pending, Cancelled)
                    | (Confirmed, InProduction)
                    | (Confirmed, Cancelled)
                    | (InProduction, ReadyForDelivery)
                    | (ReadyForDelivery, Delivered)
            )
    }

    /// Statuses shown on the delivery board.
    pub fn delivery_visible() -> [OrderStatus; 2] {
        [OrderStatus::ReadyForDelivery, OrderStatus::Delivered]
    }

    /// Statuses shown on a designer's work queue.
    pub fn designer_visible() -> [OrderStatus; 2] {
        [OrderStatus::InProduction, OrderStatus::ReadyForDelivery]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid order status: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Paynow,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Paynow => "paynow",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(PaymentMethod::Cod),
            "paynow" => Ok(PaymentMethod::Paynow),
            other => Err(format!("Invalid payment method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn happy_path_is_reachable() {
        let path = [Pending, Confirmed, InProduction, ReadyForDelivery, Delivered];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn cancellation_only_before_production() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!InProduction.can_transition_to(Cancelled));
        assert!(!ReadyForDelivery.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for from in [Delivered, Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert_eq!(from.can_transition_to(to), from == to, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn no_skipping_or_going_backwards() {
        assert!(!Pending.can_transition_to(InProduction));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Confirmed.can_transition_to(ReadyForDelivery));
        assert!(!ReadyForDelivery.can_transition_to(InProduction));
        assert!(!InProduction.can_transition_to(Confirmed));
    }

    #[test]
    fn same_status_is_idempotent() {
        for status in OrderStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn every_status_is_reachable_from_pending() {
        let mut reached = vec![Pending];
        let mut frontier = vec![Pending];
        while let Some(from) = frontier.pop() {
            for to in OrderStatus::ALL {
                if from.can_transition_to(to) && !reached.contains(&to) {
                    reached.push(to);
                    frontier.push(to);
                }
            }
        }
        assert_eq!(reached.len(), OrderStatus::ALL.len());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("ready_for_delivery".parse::<OrderStatus>().unwrap(), ReadyForDelivery);
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!("paynow".parse::<PaymentMethod>().unwrap(), PaymentMethod::Paynow);
        assert!("card".parse::<PaymentMethod>().is_err());
    }
}
