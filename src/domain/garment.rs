//! Gender-conditional order attributes.
//!
//! An order request arrives as a flat bag of optional fields. Validation picks
//! the attribute group selected by `gender`, requires that group's fields, and
//! drops everything else so a stored order only ever carries one group.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::lifecycle::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unisex => "unisex",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unisex" => Ok(Gender::Unisex),
            _ => Err("Gender must be one of male, female, unisex".into()),
        }
    }
}

/// Body of `POST /orders` and `PUT /orders/{id}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub delivery_location: Option<String>,
    /// `{ "lat": number, "lng": number }`; `{0, 0}` is a valid sentinel.
    #[schema(value_type = Object)]
    pub location: Option<Value>,
    pub gender: Option<String>,
    pub price: Option<f64>,
    pub payment_method: Option<String>,

    pub fabric_type: Option<String>,
    pub color: Option<String>,
    pub fit: Option<String>,
    pub sizing_type: Option<String>,
    pub standard_size: Option<String>,
    #[schema(value_type = Object)]
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
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sizing {
    Standard(String),
    /// Measurement name to value, e.g. `{"chest": 40}`.
    Custom(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnisexSpec {
    pub fabric_type: String,
    pub color: String,
    pub fit: String,
    pub sizing: Sizing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaleSpec {
    pub collar_style: String,
    pub cuff_type: String,
    pub pocket_style: String,
    pub trouser_fit: String,
    pub jacket_style: String,
    pub button_count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FemaleSpec {
    pub sleeve_style: String,
    pub neckline: String,
    pub hemline: String,
    pub dress_length: String,
    pub closure: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GarmentSpec {
    Unisex(UnisexSpec),
    Male(MaleSpec),
    Female(FemaleSpec),
}

impl GarmentSpec {
    pub fn gender(&self) -> Gender {
        match self {
            GarmentSpec::Unisex(_) => Gender::Unisex,
            GarmentSpec::Male(_) => Gender::Male,
            GarmentSpec::Female(_) => Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// An order request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub delivery_location: String,
    pub location: GeoPoint,
    pub price: f64,
    pub payment_method: PaymentMethod,
    pub garment: GarmentSpec,
}

/// Returns the trimmed value when present and non-blank, recording the field name otherwise.
fn take(value: &Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

fn missing_error(group: &str, missing: &[&str]) -> String {
    if group.is_empty() {
        format!("Missing required fields: {}", missing.join(", "))
    } else {
        format!("Missing required {} fields: {}", group, missing.join(", "))
    }
}

fn parse_location(location: &Option<Value>) -> Result<GeoPoint, String> {
    let coords = location
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|obj| Some((obj.get("lat")?.as_f64()?, obj.get("lng")?.as_f64()?)));

    coords
        .map(|(lat, lng)| GeoPoint { lat, lng })
        .ok_or_else(|| "Location with numeric lat and lng is required".into())
}

fn parse_measurements(value: &Option<Value>) -> Result<Value, String> {
    let obj = value
        .as_ref()
        .and_then(Value::as_object)
        .filter(|obj| !obj.is_empty())
        .ok_or("Custom measurements are required when sizing type is custom")?;

    for (name, measurement) in obj {
        match measurement.as_f64() {
            Some(v) if v > 0.0 => {}
            _ => return Err(format!("Measurement {} must be a positive number", name)),
        }
    }

    Ok(Value::Object(obj.clone()))
}

fn validate_unisex(req: &OrderReq) -> Result<UnisexSpec, String> {
    let mut missing = Vec::new();
    let fabric_type = take(&req.fabric_type, "fabricType", &mut missing);
    let color = take(&req.color, "color", &mut missing);
    let fit = take(&req.fit, "fit", &mut missing);
    let sizing_type = take(&req.sizing_type, "sizingType", &mut missing);
    if !missing.is_empty() {
        return Err(missing_error("unisex", &missing));
    }

    let sizing = match sizing_type.as_str() {
        "standard" => {
            let size = take(&req.standard_size, "standardSize", &mut missing);
            if !missing.is_empty() {
                return Err("Standard size is required when sizing type is standard".into());
            }
            Sizing::Standard(size)
        }
        "custom" => Sizing::Custom(parse_measurements(&req.custom_measurements)?),
        _ => return Err("Sizing type must be standard or custom".into()),
    };

    Ok(UnisexSpec {
        fabric_type,
        color,
        fit,
        sizing,
    })
}

fn validate_male(req: &OrderReq) -> Result<MaleSpec, String> {
    let mut missing = Vec::new();
    let collar_style = take(&req.collar_style, "collarStyle", &mut missing);
    let cuff_type = take(&req.cuff_type, "cuffType", &mut missing);
    let pocket_style = take(&req.pocket_style, "pocketStyle", &mut missing);
    let trouser_fit = take(&req.trouser_fit, "trouserFit", &mut missing);
    let jacket_style = take(&req.jacket_style, "jacketStyle", &mut missing);
    if req.button_count.is_none() {
        missing.push("buttonCount");
    }
    if !missing.is_empty() {
        return Err(missing_error("male", &missing));
    }

    let button_count = req.button_count.unwrap_or_default();
    if button_count < 1 {
        return Err("Button count must be at least 1".into());
    }

    Ok(MaleSpec {
        collar_style,
        cuff_type,
        pocket_style,
        trouser_fit,
        jacket_style,
        button_count,
    })
}

fn validate_female(req: &OrderReq) -> Result<FemaleSpec, String> {
    let mut missing = Vec::new();
    let sleeve_style = take(&req.sleeve_style, "sleeveStyle", &mut missing);
    let neckline = take(&req.neckline, "neckline", &mut missing);
    let hemline = take(&req.hemline, "hemline", &mut missing);
    let dress_length = take(&req.dress_length, "dressLength", &mut missing);
    let closure = take(&req.closure, "closure", &mut missing);
    if !missing.is_empty() {
        return Err(missing_error("female", &missing));
    }

    Ok(FemaleSpec {
        sleeve_style,
        neckline,
        hemline,
        dress_length,
        closure,
    })
}

impl OrderReq {
    /// Checks the common fields, then the attribute group selected by `gender`.
    pub fn validate(&self) -> Result<ValidatedOrder, String> {
        let mut missing = Vec::new();
        let name = take(&self.name, "name", &mut missing);
        let email = take(&self.email, "email", &mut missing);
        let contact_number = take(&self.contact_number, "contactNumber", &mut missing);
        let delivery_location = take(&self.delivery_location, "deliveryLocation", &mut missing);
        let gender = take(&self.gender, "gender", &mut missing);
        if self.price.is_none() {
            missing.push("price");
        }
        if !missing.is_empty() {
            return Err(missing_error("", &missing));
        }

        let location = parse_location(&self.location)?;

        let price = self.price.unwrap_or_default();
        if !price.is_finite() || price < 0.0 {
            return Err("Price must be a non-negative number".into());
        }

        let payment_method = match self.payment_method.as_deref() {
            None | Some("") => PaymentMethod::Cod,
            Some(method) => method.parse()?,
        };

        let garment = match gender.parse::<Gender>()? {
            Gender::Unisex => GarmentSpec::Unisex(validate_unisex(self)?),
            Gender::Male => GarmentSpec::Male(validate_male(self)?),
            Gender::Female => GarmentSpec::Female(validate_female(self)?),
        };

        Ok(ValidatedOrder {
            name,
            email,
            contact_number,
            delivery_location,
            location,
            price,
            payment_method,
            garment,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn base(gender: &str) -> OrderReq {
        OrderReq {
            name: Some("Ada".into()),
            email: Some("ada@x.com".into()),
            contact_number: Some("1234567890".into()),
            delivery_location: Some("123 Main St".into()),
            location: Some(json!({ "lat": 0, "lng": 0 })),
            gender: Some(gender.into()),
            price: Some(49.5),
            ..Default::default()
        }
    }

    fn unisex_standard() -> OrderReq {
        OrderReq {
            fabric_type: Some("cotton".into()),
            color: Some("blue".into()),
            fit: Some("regular".into()),
            sizing_type: Some("standard".into()),
            standard_size: Some("M".into()),
            ..base("unisex")
        }
    }

    #[test]
    fn accepts_unisex_standard_with_zero_location() {
        let order = unisex_standard().validate().unwrap();
        assert_eq!(order.location, GeoPoint { lat: 0.0, lng: 0.0 });
        assert_eq!(order.price, 49.5);
        assert_eq!(order.payment_method, PaymentMethod::Cod);
        assert_eq!(
            order.garment,
            GarmentSpec::Unisex(UnisexSpec {
                fabric_type: "cotton".into(),
                color: "blue".into(),
                fit: "regular".into(),
                sizing: Sizing::Standard("M".into()),
            })
        );
    }

    #[test]
    fn missing_location_is_rejected() {
        let req = OrderReq {
            location: None,
            ..unisex_standard()
        };
        assert!(req.validate().unwrap_err().contains("lat and lng"));

        let req = OrderReq {
            location: Some(json!({ "lat": "0", "lng": 0 })),
            ..unisex_standard()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn any_numeric_location_is_accepted() {
        let req = OrderReq {
            location: Some(json!({ "lat": 123.4, "lng": -200 })),
            ..unisex_standard()
        };
        assert_eq!(
            req.validate().unwrap().location,
            GeoPoint { lat: 123.4, lng: -200.0 }
        );
    }

    #[test]
    fn reports_all_missing_common_fields() {
        let err = OrderReq::default().validate().unwrap_err();
        assert_eq!(
            err,
            "Missing required fields: name, email, contactNumber, deliveryLocation, gender, price"
        );
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let req = OrderReq {
            name: Some("   ".into()),
            ..unisex_standard()
        };
        assert_eq!(req.validate().unwrap_err(), "Missing required fields: name");
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let err = base("other").validate().unwrap_err();
        assert!(err.starts_with("Gender must be"));
    }

    #[test]
    fn standard_sizing_requires_a_size() {
        let req = OrderReq {
            standard_size: None,
            ..unisex_standard()
        };
        assert!(req.validate().unwrap_err().contains("Standard size"));
    }

    #[test]
    fn custom_sizing_requires_positive_measurements() {
        let req = OrderReq {
            sizing_type: Some("custom".into()),
            standard_size: None,
            custom_measurements: Some(json!({ "chest": 40, "waist": 32.5 })),
            ..unisex_standard()
        };
        let order = req.validate().unwrap();
        match order.garment {
            GarmentSpec::Unisex(spec) => {
                assert_eq!(spec.sizing, Sizing::Custom(json!({ "chest": 40, "waist": 32.5 })))
            }
            other => panic!("unexpected {:?}", other),
        }

        let req = OrderReq {
            sizing_type: Some("custom".into()),
            custom_measurements: Some(json!({ "chest": -1 })),
            ..unisex_standard()
        };
        assert!(req.validate().unwrap_err().contains("chest"));

        let req = OrderReq {
            sizing_type: Some("custom".into()),
            custom_measurements: Some(json!({})),
            ..unisex_standard()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn male_requires_all_six_fields() {
        let req = OrderReq {
            collar_style: Some("spread".into()),
            cuff_type: Some("french".into()),
            ..base("male")
        };
        assert_eq!(
            req.validate().unwrap_err(),
            "Missing required male fields: pocketStyle, trouserFit, jacketStyle, buttonCount"
        );

        let req = OrderReq {
            collar_style: Some("spread".into()),
            cuff_type: Some("french".into()),
            pocket_style: Some("flap".into()),
            trouser_fit: Some("slim".into()),
            jacket_style: Some("single-breasted".into()),
            button_count: Some(2),
            // attributes of another group are ignored, not stored
            fabric_type: Some("linen".into()),
            ..base("male")
        };
        let order = req.validate().unwrap();
        assert_eq!(order.garment.gender(), Gender::Male);
    }

    #[test]
    fn male_button_count_must_be_positive() {
        let req = OrderReq {
            collar_style: Some("spread".into()),
            cuff_type: Some("french".into()),
            pocket_style: Some("flap".into()),
            trouser_fit: Some("slim".into()),
            jacket_style: Some("single-breasted".into()),
            button_count: Some(0),
            ..base("male")
        };
        assert!(req.validate().unwrap_err().contains("Button count"));
    }

    #[test]
    fn female_requires_all_five_fields() {
        let req = OrderReq {
            sleeve_style: Some("cap".into()),
            ..base("female")
        };
        assert_eq!(
            req.validate().unwrap_err(),
            "Missing required female fields: neckline, hemline, dressLength, closure"
        );
    }

    #[test]
    fn rejects_negative_price_and_unknown_payment_method() {
        let req = OrderReq {
            price: Some(-1.0),
            ..unisex_standard()
        };
        assert!(req.validate().unwrap_err().contains("Price"));

        let req = OrderReq {
            payment_method: Some("card".into()),
            ..unisex_standard()
        };
        assert!(req.validate().unwrap_err().contains("payment method"));
    }
}
