use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use super::error::ApiError;
use super::hal::{CollectionModel, EntityModel, LinkBuilder, Links, PageParams};
use super::{entity_tag, expected_version, AppState};
use crate::domain::user::{NewUser, User, UserChanges};

// ============================================================================
// User Resources
// ============================================================================
//
//   GET    /users          paged collection
//   POST   /users          create (username, password)
//   GET    /users/{id}     single user
//   PATCH  /users/{id}     change password (If-Match aware)
//   DELETE /users/{id}     delete
//
// ============================================================================

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list_users))
            .route(web::post().to(create_user)),
    )
    .service(
        web::resource("/users/{id}")
            .route(web::get().to(get_user))
            .route(web::patch().to(update_user))
            .route(web::delete().to(delete_user)),
    );
}

fn user_model<'a>(user: &'a User, links: &LinkBuilder) -> EntityModel<&'a User> {
    let mut map = Links::new();
    if let Some(id) = user.id() {
        let path = format!("/users/{id}");
        map.insert("self", links.link(&path));
        map.insert("user", links.link(&path));
    }
    EntityModel {
        content: user,
        links: map,
    }
}

async fn load(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {id}")))
}

async fn list_users(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let page = state.users.find_all(params.to_request(&state.paging)).await?;
    let links = LinkBuilder::from_request(&req);

    let items: Vec<_> = page.content.iter().map(|user| user_model(user, &links)).collect();
    Ok(HttpResponse::Ok().json(CollectionModel::paged("users", &page, items, "/users", &links)))
}

async fn create_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<NewUser>,
) -> Result<HttpResponse, ApiError> {
    let user = User::try_from(body.into_inner())?;
    let user = state.users.save(user).await?;
    state.metrics.users_created.inc();

    tracing::info!(user_id = ?user.id(), username = %user.username(), "Created user");

    let links = LinkBuilder::from_request(&req);
    let mut response = HttpResponse::Created();
    if let Some(id) = user.id() {
        response.insert_header((header::LOCATION, links.link(&format!("/users/{id}")).href));
    }
    Ok(response
        .insert_header(entity_tag(user.version()))
        .json(user_model(&user, &links)))
}

async fn get_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user = load(&state, id.into_inner()).await?;
    let links = LinkBuilder::from_request(&req);

    Ok(HttpResponse::Ok()
        .insert_header(entity_tag(user.version()))
        .json(user_model(&user, &links)))
}

async fn update_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<UserChanges>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let mut user = load(&state, id).await?;

    if let Some(expected) = expected_version(&req)? {
        if expected != user.version() {
            return Err(ApiError::PreconditionFailed(format!(
                "User {id} is at version {}, request expected {expected}",
                user.version()
            )));
        }
    }

    user.apply_changes(body.into_inner());
    let user = state.users.save(user).await?;
    tracing::info!(user_id = %id, version = user.version(), "Updated user");

    let links = LinkBuilder::from_request(&req);
    Ok(HttpResponse::Ok()
        .insert_header(entity_tag(user.version()))
        .json(user_model(&user, &links)))
}

async fn delete_user(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    state.users.delete_by_id(id).await?;
    tracing::info!(user_id = %id, "Deleted user");
    Ok(HttpResponse::NoContent().finish())
}
