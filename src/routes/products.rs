use std::str::FromStr;

use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::garment::Gender,
    models::{CreateProductEntity, ProductEntity},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::AuthUser,
        extractors::AppJson,
        guards, middleware,
    },
    schema::products,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products, create_product))
            .routes(utoipa_axum::routes!(get_product, update_product, delete_product))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::authorization,
            )),
    )
}

fn parse_category(value: &str) -> Result<Gender, AppError> {
    Gender::from_str(value)
        .map_err(|_| AppError::BadRequest("Category must be one of male, female, unisex".into()))
}

#[derive(Serialize, ToSchema)]
pub struct ProductRes {
    pub product: ProductEntity,
}

#[derive(Serialize, ToSchema)]
pub struct ProductsRes {
    pub count: usize,
    pub products: Vec<ProductEntity>,
}

#[derive(Deserialize, IntoParams)]
pub struct ProductsQuery {
    /// `male`, `female` or `unisex`.
    pub category: Option<String>,
}

/// Browse the catalog. Only admins and owners see inactive products.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(ProductsQuery),
    responses(
        (status = 200, description = "List products", body = ProductsRes)
    )
)]
async fn get_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query
        .category
        .map(|c| parse_category(&c))
        .transpose()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut statement = products::table
        .select(ProductEntity::as_select())
        .order_by(products::created_at.desc())
        .into_boxed();
    if let Some(category) = category {
        statement = statement.filter(products::category.eq(category.as_str()));
    }
    if !guards::is_privileged(&auth) {
        statement = statement.filter(products::is_active.eq(true));
    }

    let products: Vec<ProductEntity> = statement
        .load(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse::ok(
        ProductsRes {
            count: products.len(),
            products,
        },
        "Get products successfully",
    ))
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product", body = ProductRes),
        (status = 404, description = "Product not found")
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table
        .find(id)
        .select(ProductEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get product")?
        .filter(|product| product.is_active || guards::is_privileged(&auth))
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(StdResponse::ok(
        ProductRes { product },
        "Get product successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductReq {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `male`, `female` or `unisex`.
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductReq {
    fn validate(self) -> Result<CreateProductEntity, AppError> {
        let field = |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(name), Some(description), Some(category), Some(price)) = (
            field(self.name),
            field(self.description),
            field(self.category),
            self.price,
        ) else {
            return Err(AppError::BadRequest(
                "Name, description, category and price are required".into(),
            ));
        };

        let category = parse_category(&category)?;
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::BadRequest("Price must be a non-negative number".into()));
        }

        Ok(CreateProductEntity {
            name,
            description,
            category: category.as_str().to_string(),
            price,
            image: field(self.image),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Add a product to the catalog.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    request_body = ProductReq,
    responses(
        (status = 200, description = "Product created", body = ProductRes)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;
    let new_product = body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::insert_into(products::table)
        .values((&new_product, products::created_by_email.eq(&auth.email)))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    tracing::info!(product_id = product.id, by = %auth.email, "Product created");

    Ok(StdResponse::ok(
        ProductRes { product },
        "Product created successfully",
    ))
}

/// Replace a product's details.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = ProductReq,
    responses(
        (status = 200, description = "Product updated", body = ProductRes)
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;
    let changes = body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::update(products::table.find(id))
        .set(&changes)
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to update product")?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(StdResponse::ok(
        ProductRes { product },
        "Product updated successfully",
    ))
}

/// Remove a product from the catalog.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ProductRes)
    )
)]
async fn delete_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to delete product")?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    tracing::info!(product_id = id, by = %auth.email, "Product deleted");

    Ok(StdResponse::ok(
        ProductRes { product },
        "Product deleted successfully",
    ))
}
