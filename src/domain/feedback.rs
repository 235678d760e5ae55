use serde::Deserialize;
use utoipa::ToSchema;

pub const PUBLIC_FEEDBACK_LIMIT: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReq {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFeedback {
    pub customer_name: String,
    pub email: String,
    pub mobile_number: String,
    pub feedback: String,
    pub rating: i32,
}

impl FeedbackReq {
    pub fn validate(&self) -> Result<ValidatedFeedback, String> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let (Some(customer_name), Some(email), Some(mobile_number), Some(feedback), Some(rating)) = (
            field(&self.customer_name),
            field(&self.email),
            field(&self.mobile_number),
            field(&self.feedback),
            self.rating,
        ) else {
            return Err("All fields are required".into());
        };

        if !(1..=5).contains(&rating) {
            return Err("Rating must be between 1 and 5".into());
        }

        Ok(ValidatedFeedback {
            customer_name,
            email,
            mobile_number,
            feedback,
            rating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(rating: i32) -> FeedbackReq {
        FeedbackReq {
            customer_name: Some("Ada".into()),
            email: Some("ada@x.com".into()),
            mobile_number: Some("1234567890".into()),
            feedback: Some("Great fit".into()),
            rating: Some(rating),
        }
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(req(1).validate().is_ok());
        assert!(req(5).validate().is_ok());
        assert!(req(0).validate().is_err());
        assert!(req(6).validate().is_err());
    }

    #[test]
    fn text_fields_are_required() {
        let mut r = req(4);
        r.feedback = Some("  ".into());
        assert_eq!(r.validate().unwrap_err(), "All fields are required");

        let mut r = req(4);
        r.rating = None;
        assert!(r.validate().is_err());
    }
}
