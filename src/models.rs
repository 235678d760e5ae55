use chrono::{DateTime, Utc};
use diesel::{
    AsChangeset, Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::garment::{GarmentSpec, Sizing, ValidatedOrder};

// Users

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as returned over the wire; never carries the password hash.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: i32,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for PublicUser {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: i32,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UpdateUserEntity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<i32>,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    #[serde(rename = "_id")]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_by_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub image: Option<String>,
    pub is_active: bool,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderEntity {
    #[serde(rename = "_id")]
    pub id: i32,
    pub user_id: i32,
    pub designer_id: Option<i32>,
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub delivery_location: String,
    #[diesel(embed)]
    pub location: LocationColumns,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fabric_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub custom_measurements: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collar_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuff_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pocket_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trouser_fit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jacket_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neckline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hemline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dress_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure: Option<String>,
    pub price: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored as two columns, sent as `location: {lat, lng}` like the request.
#[derive(Queryable, Selectable, Serialize, Debug, Clone, Copy, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LocationColumns {
    #[diesel(column_name = location_lat)]
    pub lat: f64,
    #[diesel(column_name = location_lng)]
    pub lng: f64,
}

/// Customer-editable part of an order. Every garment column is written, so
/// switching gender on update clears the attributes of the old group.
#[derive(Insertable, AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(treat_none_as_null = true)]
pub struct OrderDetailsEntity {
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub delivery_location: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub gender: String,
    pub fabric_type: Option<String>,
    pub color: Option<String>,
    pub fit: Option<String>,
    pub sizing_type: Option<String>,
    pub standard_size: Option<String>,
    pub custom_measurements: Option<Value>,
    pub collar_style: Option<String>,
    pub cuff_type: Option<String>,
    pub pocket_style: Option<String>,
    pub trouser_fit: Option<String>,
    pub jacket_style: Option<String>,
    pub button_count: Option<i32>,
    pub sleeve_style: Option<String>,
    pub neckline: Option<String>,
    pub hemline: Option<String>,
    pub dress_length: Option<String>,
    pub closure: Option<String>,
    pub price: f64,
    pub payment_method: String,
}

impl From<ValidatedOrder> for OrderDetailsEntity {
    fn from(order: ValidatedOrder) -> Self {
        let mut details = OrderDetailsEntity {
            name: order.name,
            email: order.email,
            contact_number: order.contact_number,
            delivery_location: order.delivery_location,
            location_lat: order.location.lat,
            location_lng: order.location.lng,
            gender: order.garment.gender().as_str().to_string(),
            price: order.price,
            payment_method: order.payment_method.as_str().to_string(),
            ..Default::default()
        };

        match order.garment {
            GarmentSpec::Unisex(spec) => {
                details.fabric_type = Some(spec.fabric_type);
                details.color = Some(spec.color);
                details.fit = Some(spec.fit);
                match spec.sizing {
                    Sizing::Standard(size) => {
                        details.sizing_type = Some("standard".into());
                        details.standard_size = Some(size);
                    }
                    Sizing::Custom(measurements) => {
                        details.sizing_type = Some("custom".into());
                        details.custom_measurements = Some(measurements);
                    }
                }
            }
            GarmentSpec::Male(spec) => {
                details.collar_style = Some(spec.collar_style);
                details.cuff_type = Some(spec.cuff_type);
                details.pocket_style = Some(spec.pocket_style);
                details.trouser_fit = Some(spec.trouser_fit);
                details.jacket_style = Some(spec.jacket_style);
                details.button_count = Some(spec.button_count);
            }
            GarmentSpec::Female(spec) => {
                details.sleeve_style = Some(spec.sleeve_style);
                details.neckline = Some(spec.neckline);
                details.hemline = Some(spec.hemline);
                details.dress_length = Some(spec.dress_length);
                details.closure = Some(spec.closure);
            }
        }

        details
    }
}

/// Order with the owner and designer names resolved for staff views.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithParties {
    #[serde(flatten)]
    pub order: OrderEntity,
    pub owner_name: Option<String>,
    pub designer_name: Option<String>,
}

// Return orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::return_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ReturnOrderEntity {
    #[serde(rename = "_id")]
    pub id: i32,
    #[serde(rename = "orderNumber")]
    pub order_id: i32,
    pub user_id: i32,
    pub customer_name: String,
    pub customer_phone: String,
    pub reason_for_return: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::return_orders)]
pub struct CreateReturnOrderEntity {
    pub order_id: i32,
    pub customer_name: String,
    pub customer_phone: String,
    pub reason_for_return: String,
}

/// Admin-side change; notes are left untouched when not supplied.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::return_orders)]
pub struct UpdateReturnStatusEntity {
    pub status: String,
    pub admin_notes: Option<String>,
}

// Feedback

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::feedback)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntity {
    #[serde(rename = "_id")]
    pub id: i32,
    pub user_id: i32,
    pub customer_name: String,
    pub email: String,
    pub mobile_number: String,
    #[serde(rename = "feedback")]
    pub comment: String,
    pub rating: i32,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What anonymous visitors see of a feedback entry.
#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::feedback)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PublicFeedback {
    #[serde(rename = "_id")]
    pub id: i32,
    pub customer_name: String,
    #[serde(rename = "feedback")]
    pub comment: String,
    pub rating: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::feedback)]
pub struct CreateFeedbackEntity {
    pub customer_name: String,
    pub email: String,
    pub mobile_number: String,
    pub comment: String,
    pub rating: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::garment::OrderReq;
    use serde_json::json;

    fn male_order() -> OrderEntity {
        let details: OrderDetailsEntity = OrderReq {
            name: Some("Sam".into()),
            email: Some("sam@x.com".into()),
            contact_number: Some("1234567890".into()),
            delivery_location: Some("1 Tailor Row".into()),
            location: Some(json!({ "lat": 6.5, "lng": 3.4 })),
            gender: Some("male".into()),
            price: Some(120.0),
            collar_style: Some("spread".into()),
            cuff_type: Some("french".into()),
            pocket_style: Some("flap".into()),
            trouser_fit: Some("slim".into()),
            jacket_style: Some("double-breasted".into()),
            button_count: Some(6),
            color: Some("ignored".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .into();

        let now = Utc::now();
        OrderEntity {
            id: 1,
            user_id: 7,
            designer_id: None,
            name: details.name,
            email: details.email,
            contact_number: details.contact_number,
            delivery_location: details.delivery_location,
            location: LocationColumns {
                lat: details.location_lat,
                lng: details.location_lng,
            },
            gender: details.gender,
            fabric_type: details.fabric_type,
            color: details.color,
            fit: details.fit,
            sizing_type: details.sizing_type,
            standard_size: details.standard_size,
            custom_measurements: details.custom_measurements,
            collar_style: details.collar_style,
            cuff_type: details.cuff_type,
            pocket_style: details.pocket_style,
            trouser_fit: details.trouser_fit,
            jacket_style: details.jacket_style,
            button_count: details.button_count,
            sleeve_style: details.sleeve_style,
            neckline: details.neckline,
            hemline: details.hemline,
            dress_length: details.dress_length,
            closure: details.closure,
            price: details.price,
            payment_method: details.payment_method,
            payment_status: "pending".into(),
            payment_intent_id: None,
            status: "pending".into(),
            order_date: now,
            updated_at: now,
        }
    }

    #[test]
    fn male_order_serializes_only_male_attributes() {
        let value = serde_json::to_value(male_order()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["collarStyle"], "spread");
        assert_eq!(obj["cuffType"], "french");
        assert_eq!(obj["pocketStyle"], "flap");
        assert_eq!(obj["trouserFit"], "slim");
        assert_eq!(obj["jacketStyle"], "double-breasted");
        assert_eq!(obj["buttonCount"], 6);

        for absent in [
            "fabricType",
            "color",
            "fit",
            "sizingType",
            "standardSize",
            "customMeasurements",
            "sleeveStyle",
            "neckline",
            "hemline",
            "dressLength",
            "closure",
        ] {
            assert!(!obj.contains_key(absent), "{} should not be serialized", absent);
        }
    }

    #[test]
    fn order_read_back_can_be_submitted_again() {
        let order = male_order();
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["location"], json!({ "lat": 6.5, "lng": 3.4 }));
        assert!(value.get("locationLat").is_none());

        let resubmitted: OrderReq = serde_json::from_value(value).unwrap();
        let details: OrderDetailsEntity = resubmitted.validate().unwrap().into();
        assert_eq!(details.location_lat, order.location.lat);
        assert_eq!(details.location_lng, order.location.lng);
        assert_eq!(details.gender, "male");
        assert_eq!(details.button_count, Some(6));
        assert_eq!(details.price, order.price);
    }

    #[test]
    fn entities_serialize_their_id_as_underscore_id() {
        let now = Utc::now();
        let user = PublicUser {
            id: 3,
            name: "Bea".into(),
            email: "b@x.com".into(),
            phone: "1234567890".into(),
            role: 2,
            created_at: now,
        };
        let value = serde_json::to_value(user).unwrap();
        assert_eq!(value["_id"], 3);
        assert!(value.get("id").is_none());

        assert_eq!(serde_json::to_value(male_order()).unwrap()["_id"], 1);
    }

    #[test]
    fn public_feedback_omits_contact_details() {
        let entry = PublicFeedback {
            id: 4,
            customer_name: "Zed".into(),
            comment: "Great fit".into(),
            rating: 5,
            submitted_at: Utc::now(),
        };
        let value = serde_json::to_value(entry).unwrap();
        assert_eq!(value["feedback"], "Great fit");
        assert_eq!(value["customerName"], "Zed");
        for absent in ["email", "mobileNumber", "userId"] {
            assert!(value.get(absent).is_none(), "{} must not be public", absent);
        }
    }

    #[test]
    fn public_user_hides_password() {
        let now = Utc::now();
        let user = PublicUser::from(UserEntity {
            id: 3,
            name: "Bea".into(),
            email: "b@x.com".into(),
            phone: "1234567890".into(),
            password: "$argon2id$...".into(),
            role: 2,
            created_at: now,
            updated_at: now,
        });
        let value = serde_json::to_value(user).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["role"], 2);
    }
}
