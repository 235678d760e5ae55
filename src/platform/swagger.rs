use utoipa::openapi::{
    OpenApi,
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

/// Serves Swagger UI with the `bearerAuth` scheme the routes refer to.
pub fn create_swagger_ui(mut openapi: OpenApi) -> SwaggerUi {
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "bearerAuth",
        SecurityScheme::Http(
            HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .build(),
        ),
    );

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)
}
