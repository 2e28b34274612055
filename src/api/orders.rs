use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use super::hal::{CollectionModel, EntityModel, LinkBuilder, Links, PageParams};
use super::{entity_tag, expected_version, AppState};
use crate::domain::order::{LineItem, Location, Order, OrderCommand, OrderStatus};

// ============================================================================
// Order Resources
// ============================================================================
//
//   GET    /orders                          paged collection
//   POST   /orders                          place an order
//   GET    /orders/search                   search links
//   GET    /orders/search/findByStatus      orders in a status
//   GET    /orders/{id}                     single order
//   DELETE /orders/{id}                     delete (If-Match aware)
//   POST   /orders/{id}/{action}            lifecycle command (If-Match aware)
//
// ============================================================================

/// Creator payload. Only line items and location are accepted from clients;
/// status and ordered date are set by the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: OrderStatus,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders")
            .route(web::get().to(list_orders))
            .route(web::post().to(place_order)),
    )
    .service(web::resource("/orders/search").route(web::get().to(search_links)))
    .service(web::resource("/orders/search/findByStatus").route(web::get().to(find_by_status)))
    .service(
        web::resource("/orders/{id}")
            .route(web::get().to(get_order))
            .route(web::delete().to(delete_order)),
    )
    .service(web::resource("/orders/{id}/{action}").route(web::post().to(apply_command)));
}

fn order_links(order: &Order, links: &LinkBuilder) -> Links {
    let mut map = Links::new();
    if let Some(id) = order.id() {
        let path = format!("/orders/{id}");
        map.insert("self", links.link(&path));
        map.insert("order", links.link(&path));

        // Advertise the one command the current status allows.
        if let Some(command) = OrderCommand::ALL
            .into_iter()
            .find(|command| command.required_status() == order.status())
        {
            map.insert(
                command.action_name(),
                links.link(&format!("{path}/{}", command.action_name())),
            );
        }
    }
    map
}

fn order_model<'a>(order: &'a Order, links: &LinkBuilder) -> EntityModel<&'a Order> {
    EntityModel {
        content: order,
        links: order_links(order, links),
    }
}

fn order_response(
    mut response: HttpResponseBuilder,
    order: &Order,
    links: &LinkBuilder,
) -> HttpResponse {
    response
        .insert_header(entity_tag(order.version()))
        .json(order_model(order, links))
}

async fn list_orders(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let request = params.to_request(&state.paging);
    let page = state.orders.find_all(request).await?;
    let links = LinkBuilder::from_request(&req);

    let items: Vec<_> = page.content.iter().map(|order| order_model(order, &links)).collect();
    let model = CollectionModel::paged("orders", &page, items, "/orders", &links);

    Ok(HttpResponse::Ok().json(model))
}

async fn place_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let PlaceOrderRequest { line_items, location } = body.into_inner();
    let order = state.order_handler.place(line_items, location).await?;
    let links = LinkBuilder::from_request(&req);

    let mut response = HttpResponse::Created();
    if let Some(id) = order.id() {
        response.insert_header((header::LOCATION, links.link(&format!("/orders/{id}")).href));
    }
    Ok(order_response(response, &order, &links))
}

async fn get_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let order = state
        .orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {id}")))?;

    let links = LinkBuilder::from_request(&req);
    Ok(order_response(HttpResponse::Ok(), &order, &links))
}

async fn delete_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let expected = expected_version(&req)?;
    state.order_handler.delete(id.into_inner(), expected).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn apply_command(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, action) = path.into_inner();
    let command = OrderCommand::from_action_name(&action)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown order action: {action}")))?;
    let expected = expected_version(&req)?;

    let order = state.order_handler.handle(id, command, expected).await?;
    let links = LinkBuilder::from_request(&req);
    Ok(order_response(HttpResponse::Ok(), &order, &links))
}

async fn search_links(req: HttpRequest) -> HttpResponse {
    let links = LinkBuilder::from_request(&req);
    let mut map = Links::new();
    map.insert("findByStatus", links.templated("/orders/search/findByStatus{?status}"));
    map.insert("self", links.link("/orders/search"));

    HttpResponse::Ok().json(serde_json::json!({ "_links": map }))
}

async fn find_by_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, ApiError> {
    let status = query.status;
    let orders = state.orders.find_by_status(status).await?;
    let links = LinkBuilder::from_request(&req);

    let items: Vec<_> = orders.iter().map(|order| order_model(order, &links)).collect();
    let mut map = Links::new();
    map.insert(
        "self",
        links.link(&format!("/orders/search/findByStatus?status={status}")),
    );

    Ok(HttpResponse::Ok().json(CollectionModel::new("orders", items, map)))
}
