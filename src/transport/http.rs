use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use tracing::info;

use crate::dispatcher::Dispatcher;

#[derive(Debug, Deserialize)]
struct CommandQuery {
    cmd: String,
}

/// `GET /command?cmd=<line>` — the HTTP counterpart of the socket
/// transport. Both route the request line through the same
/// [`Dispatcher::handle_line`], so the JSON reply is identical either way.
///
/// Status codes follow SPEC_FULL.md §4.5: 200 for anything the dispatcher
/// recognises, including a dispatcher-level error reply (e.g. unknown
/// program) — the HTTP layer is just a transport, the `status` field in the
/// JSON body is where success/failure actually lives. A malformed query
/// (no `cmd` parameter) never reaches this handler; see
/// `command_query_error_handler`, which turns that failure into 400.
async fn command_handler(query: web::Query<CommandQuery>, dispatcher: web::Data<Arc<Dispatcher>>) -> HttpResponse {
    let reply = dispatcher.handle_line(&query.cmd);
    HttpResponse::Ok().json(reply)
}

/// Converts a failed `cmd` query-string extraction into a 400 with the same
/// JSON envelope the dispatcher itself would return, instead of actix's
/// default plaintext body.
fn command_query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let reply = crate::dispatcher::Reply::error(format!("malformed query: {err}"));
    actix_web::error::InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(reply),
    )
    .into()
}

/// Binds the HTTP transport's listener without starting to serve.
/// Binding is synchronous in actix-web, so a port already in use or an
/// unprivileged low port surfaces here as a [`std::io::Error`] the caller
/// can treat as the fatal daemon error SPEC_FULL.md §7 requires — before
/// any request has been accepted, not after.
///
/// Per SPEC_FULL.md §4.5, `/command` is the *only* recognised path; every
/// other path, including a liveness-probe convenience route, returns 404.
/// A client that wants a liveness check uses `GET
/// /command?cmd=alive`, which the Dispatcher already answers.
pub fn bind_http_transport(
    host: String,
    port: u16,
    dispatcher: Arc<Dispatcher>,
) -> std::io::Result<actix_web::dev::Server> {
    info!(host = %host, port, "http transport listening");
    let data = web::Data::new(dispatcher);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::QueryConfig::default().error_handler(command_query_error_handler))
            .route("/command", web::get().to(command_handler))
            .default_service(web::route().to(HttpResponse::NotFound))
    })
    .bind((host, port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigProvider, LoadedConfig};
    use crate::notify::NoopSink;
    use crate::supervisor::Supervisor;
    use actix_web::test;

    struct EmptyProvider;
    impl ConfigProvider for EmptyProvider {
        fn load(&self) -> Result<LoadedConfig, crate::config::ConfigError> {
            Ok(LoadedConfig::default())
        }
    }

    #[actix_web::test]
    async fn command_endpoint_dispatches() {
        let supervisor =
            Arc::new(Supervisor::new(Arc::new(EmptyProvider), Arc::new(NoopSink)).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(supervisor));
        let data = web::Data::new(dispatcher);

        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .route("/command", web::get().to(command_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/command?cmd=alive")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn only_command_path_is_recognised() {
        // SPEC_FULL.md §4.5: every path other than /command is 404, with
        // no liveness-probe convenience route carved out.
        let supervisor =
            Arc::new(Supervisor::new(Arc::new(EmptyProvider), Arc::new(NoopSink)).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(supervisor));
        let data = web::Data::new(dispatcher);

        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .route("/command", web::get().to(command_handler))
                .default_service(web::route().to(HttpResponse::NotFound)),
        )
        .await;

        let req = test::TestRequest::get().uri("/alive").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(actix_web::http::StatusCode::NOT_FOUND, resp.status());
    }
}
