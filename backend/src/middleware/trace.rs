//! Tracing middleware attaching a request-scoped trace identifier.
//!
//! Each incoming request receives a `trace_id` (produced by this crate's own
//! [`UuidGen`] rather than the `uuid` crate, so every identifier surfaced by
//! this service — trace ids, generated user ids — comes from the same
//! entropy-mixing scheme) stored in request extensions for correlation
//! across logs and error responses.

use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::crypto::UuidGen;

/// Per-request trace identifier stored in request extensions.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

/// Tracing middleware attaching a request-scoped id and a `Trace-Id`
/// response header.
///
/// Handlers can read the trace ID via `req.extensions().get::<TraceId>()`.
#[derive(Clone)]
pub struct Trace {
    uuid_gen: Arc<UuidGen>,
}

impl Trace {
    /// Build the middleware around a shared UUID generator.
    #[must_use]
    pub fn new(uuid_gen: Arc<UuidGen>) -> Self {
        Self { uuid_gen }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware {
            service,
            uuid_gen: Arc::clone(&self.uuid_gen),
        }))
    }
}

/// Service wrapper produced by [`Trace`]. Applications should not use this
/// type directly.
pub struct TraceMiddleware<S> {
    service: S,
    uuid_gen: Arc<UuidGen>,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = self.uuid_gen.next();
        req.extensions_mut().insert(TraceId(trace_id.clone()));
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Err(error) = HeaderValue::from_str(&trace_id).map(|value| {
                res.response_mut()
                    .headers_mut()
                    .insert(HeaderName::from_static("trace-id"), value);
            }) {
                error!(%error, trace_id = %trace_id, "failed to encode trace identifier header");
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::UuidParams;
    use actix_web::{App, HttpResponse, test, web};

    fn test_trace() -> Trace {
        Trace::new(Arc::new(UuidGen::new(UuidParams::default_params())))
    }

    #[actix_web::test]
    async fn adds_trace_id_header() {
        let app = test::init_service(
            App::new()
                .wrap(test_trace())
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.headers().contains_key("trace-id"));
    }

    #[actix_web::test]
    async fn trace_id_is_readable_from_extensions() {
        use actix_web::HttpRequest;

        let app = test::init_service(App::new().wrap(test_trace()).route(
            "/",
            web::get().to(|req: HttpRequest| async move {
                let id = req.extensions().get::<TraceId>().cloned();
                HttpResponse::Ok().body(id.map(|t| t.0).unwrap_or_default())
            }),
        ))
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.headers().contains_key("trace-id"));
    }
}
