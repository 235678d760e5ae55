use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::lifecycle::OrderStatus;

/// Status of a return request. Admins may move between any two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Processing,
    Completed,
}

impl ReturnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
            ReturnStatus::Processing => "processing",
            ReturnStatus::Completed => "completed",
        }
    }
}

impl FromStr for ReturnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReturnStatus::Pending),
            "approved" => Ok(ReturnStatus::Approved),
            "rejected" => Ok(ReturnStatus::Rejected),
            "processing" => Ok(ReturnStatus::Processing),
            "completed" => Ok(ReturnStatus::Completed),
            other => Err(format!("Invalid return status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnEligibility {
    Eligible,
    NotDelivered,
    AlreadyRequested,
}

impl ReturnEligibility {
    pub const NOT_DELIVERED: &'static str = "Return can only be requested for delivered orders";
    pub const ALREADY_REQUESTED: &'static str = "A return order already exists for this order";

    /// `has_existing_return` must exclude the return being edited, if any.
    pub fn check(order_status: &str, has_existing_return: bool) -> Self {
        if order_status != OrderStatus::Delivered.as_str() {
            ReturnEligibility::NotDelivered
        } else if has_existing_return {
            ReturnEligibility::AlreadyRequested
        } else {
            ReturnEligibility::Eligible
        }
    }
}
