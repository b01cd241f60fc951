use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/home", home_routes())
        .nest("/samples", sample_routes(config))
        .routes(routes!(handlers::sample::search))
        .nest("/sources", source_routes())
        .nest("/tags", tag_routes())
        .nest("/users", user_routes())
        .nest("/admin", admin_routes())
        .nest("/wiki", wiki_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn home_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::home::home))
}

fn sample_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let browse = OpenApiRouter::new()
        .routes(routes!(handlers::sample::list_samples))
        .routes(routes!(handlers::sample::page_count))
        .routes(routes!(handlers::sample::recent))
        .routes(routes!(handlers::sample::top))
        .routes(routes!(handlers::sample::batch_edit))
        .routes(routes!(
            handlers::sample::get_sample,
            handlers::sample::update_sample,
            handlers::sample::delete_sample
        ))
        .routes(routes!(handlers::sample::toggle_like))
        .routes(routes!(handlers::sample::get_metadata))
        .routes(routes!(handlers::sample::download))
        .routes(routes!(handlers::sample::thumbnail));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::sample::upload))
        .layer(handlers::sample::upload_body_limit(config));

    browse.merge(upload)
}

fn source_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::source::list_sources,
            handlers::source::create_source
        ))
        .routes(routes!(handlers::source::search_sources))
        .routes(routes!(handlers::source::get_source))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::tag::list_tags))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::user::get_profile))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::update_user))
        .routes(routes!(handlers::admin::list_under_review))
        .routes(routes!(handlers::admin::set_visibility))
}

fn wiki_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::wiki::list_pages))
        .routes(routes!(handlers::wiki::get_page))
}
