use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::OrderEntity;

type Counts = BTreeMap<String, i64>;

/// Order counts grouped by status, gender and each garment attribute.
/// Orders that leave an attribute unset are not counted under it.
#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: i64,
    pub by_status: Counts,
    pub by_gender: Counts,
    pub by_fabric_type: Counts,
    pub by_color: Counts,
    pub by_fit: Counts,
    pub by_sizing_type: Counts,
    pub by_standard_size: Counts,
    pub by_collar_style: Counts,
    pub by_cuff_type: Counts,
    pub by_pocket_style: Counts,
    pub by_trouser_fit: Counts,
    pub by_jacket_style: Counts,
    pub by_button_count: Counts,
    pub by_sleeve_style: Counts,
    pub by_neckline: Counts,
    pub by_hemline: Counts,
    pub by_dress_length: Counts,
    pub by_closure: Counts,
}

fn bump(counts: &mut Counts, value: Option<&str>) {
    if let Some(value) = value {
        *counts.entry(value.to_string()).or_default() += 1;
    }
}

impl OrderStats {
    pub fn collect<'a>(orders: impl IntoIterator<Item = &'a OrderEntity>) -> Self {
        let mut stats = OrderStats::default();

        for order in orders {
            stats.total += 1;
            bump(&mut stats.by_status, Some(&order.status));
            bump(&mut stats.by_gender, Some(&order.gender));
            bump(&mut stats.by_fabric_type, order.fabric_type.as_deref());
            bump(&mut stats.by_color, order.color.as_deref());
            bump(&mut stats.by_fit, order.fit.as_deref());
            bump(&mut stats.by_sizing_type, order.sizing_type.as_deref());
            bump(&mut stats.by_standard_size, order.standard_size.as_deref());
            bump(&mut stats.by_collar_style, order.collar_style.as_deref());
            bump(&mut stats.by_cuff_type, order.cuff_type.as_deref());
            bump(&mut stats.by_pocket_style, order.pocket_style.as_deref());
            bump(&mut stats.by_trouser_fit, order.trouser_fit.as_deref());
            bump(&mut stats.by_jacket_style, order.jacket_style.as_deref());
            bump(
                &mut stats.by_button_count,
                order.button_count.map(|c| c.to_string()).as_deref(),
            );
            bump(&mut stats.by_sleeve_style, order.sleeve_style.as_deref());
            bump(&mut stats.by_neckline, order.neckline.as_deref());
            bump(&mut stats.by_hemline, order.hemline.as_deref());
            bump(&mut stats.by_dress_length, order.dress_length.as_deref());
            bump(&mut stats.by_closure, order.closure.as_deref());
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::LocationColumns;

    fn order(status: &str, gender: &str) -> OrderEntity {
        let now = Utc::now();
        OrderEntity {
            id: 0,
            user_id: 1,
            designer_id: None,
            name: "n".into(),
            email: "e".into(),
            contact_number: "c".into(),
            delivery_location: "d".into(),
            location: LocationColumns { lat: 0.0, lng: 0.0 },
            gender: gender.into(),
            fabric_type: None,
            color: None,
            fit: None,
            sizing_type: None,
            standard_size: None,
            custom_measurements: None,
            collar_style: None,
            cuff_type: None,
            pocket_style: None,
            trouser_fit: None,
            jacket_style: None,
            button_count: None,
            sleeve_style: None,
            neckline: None,
            hemline: None,
            dress_length: None,
            closure: None,
            price: 10.0,
            payment_method: "cod".into(),
            payment_status: "pending".into(),
            payment_intent_id: None,
            status: status.into(),
            order_date: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_input_has_zero_total() {
        assert_eq!(OrderStats::collect(&Vec::<OrderEntity>::new()), OrderStats::default());
    }

    #[test]
    fn groups_by_status_and_attributes() {
        let mut a = order("pending", "unisex");
        a.fabric_type = Some("cotton".into());
        a.color = Some("blue".into());
        let mut b = order("pending", "unisex");
        b.fabric_type = Some("cotton".into());
        b.color = Some("red".into());
        let mut c = order("delivered", "male");
        c.button_count = Some(4);

        let stats = OrderStats::collect(&[a, b, c]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["delivered"], 1);
        assert_eq!(stats.by_gender["unisex"], 2);
        assert_eq!(stats.by_fabric_type["cotton"], 2);
        assert_eq!(stats.by_color.len(), 2);
        assert_eq!(stats.by_button_count["4"], 1);
        assert!(stats.by_neckline.is_empty());
    }
}
