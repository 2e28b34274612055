use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Map, Value};
use utoipa::{PartialSchema, ToSchema};

use super::error::ApiError;
use super::hal::{LinkBuilder, Links};
use crate::domain::order::Order;
use crate::domain::user::User;

// ============================================================================
// Profile - JSON schema per resource
// ============================================================================
//
// Schemas are derived from the resource types themselves. Visibility is
// declared on the fields: `readOnly` = returned but never accepted,
// `writeOnly` = accepted but never returned.
//
// ============================================================================

const SCHEMA_CONTENT_TYPE: &str = "application/schema+json";
const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";
const RESOURCES: [&str; 2] = ["orders", "users"];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/profile").route(web::get().to(profile_links)))
        .service(web::resource("/profile/{resource}").route(web::get().to(resource_schema)));
}

/// Standalone schema document for `T`. Any referenced component is embedded
/// under `components.schemas` so `$ref`s resolve within the document.
pub fn schema_document<T: ToSchema>() -> Result<Value, serde_json::Error> {
    let mut document = serde_json::to_value(<T as PartialSchema>::schema())?;

    let mut referenced = Vec::new();
    T::schemas(&mut referenced);
    let mut components = Map::new();
    for (name, schema) in referenced {
        components.insert(name, serde_json::to_value(schema)?);
    }

    if let Value::Object(fields) = &mut document {
        fields.insert("$schema".to_string(), json!(SCHEMA_DIALECT));
        fields.insert("title".to_string(), json!(T::name()));
        if !components.is_empty() {
            fields.insert("components".to_string(), json!({ "schemas": components }));
        }
    }
    Ok(document)
}

fn resource_document(resource: &str) -> Option<Result<Value, serde_json::Error>> {
    match resource {
        "orders" => Some(schema_document::<Order>()),
        "users" => Some(schema_document::<User>()),
        _ => None,
    }
}

async fn profile_links(req: HttpRequest) -> HttpResponse {
    let links = LinkBuilder::from_request(&req);
    let mut map = Links::new();
    map.insert("self", links.link("/profile"));
    for resource in RESOURCES {
        map.insert(resource, links.link(&format!("/profile/{resource}")));
    }

    HttpResponse::Ok().json(json!({ "_links": map }))
}

async fn resource_schema(resource: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let resource = resource.into_inner();
    let document = resource_document(&resource)
        .ok_or_else(|| ApiError::NotFound(format!("No profile for resource: {resource}")))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type(SCHEMA_CONTENT_TYPE)
        .body(document.to_string()))
}
