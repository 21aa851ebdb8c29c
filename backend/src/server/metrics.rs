//! Prometheus request metrics, applied only when a registry was configured.
//!
//! `actix-web-prom` changes the response body type, so both branches box
//! the body to give the app one concrete service type.

use std::sync::Arc;

use actix_service::{
    Service, ServiceExt as _, Transform,
    boxed::{self, BoxService},
};
use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::PrometheusMetrics;
use futures_util::future::LocalBoxFuture;

type BoxedService = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;

/// Middleware that records request metrics and serves `/metrics`.
#[derive(Clone)]
pub(crate) struct MetricsLayer {
    metrics: Option<Arc<PrometheusMetrics>>,
}

impl MetricsLayer {
    #[must_use]
    pub(crate) fn from_option(metrics: Option<PrometheusMetrics>) -> Self {
        Self {
            metrics: metrics.map(Arc::new),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxedService;
    type Future = LocalBoxFuture<'static, Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let Some(metrics) = self.metrics.clone() else {
            let passthrough = service.map(|res: ServiceResponse<B>| res.map_into_boxed_body());
            return Box::pin(async move { Ok(boxed::service(passthrough)) });
        };

        let wrapped = Compat::new((*metrics).clone()).new_transform(service);
        Box::pin(async move {
            let svc = wrapped.await?;
            Ok(boxed::service(svc))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use actix_web_prom::PrometheusMetricsBuilder;
    use rstest::rstest;

    fn metrics() -> PrometheusMetrics {
        PrometheusMetricsBuilder::new("carbon_tracker_test")
            .endpoint("/metrics")
            .registry(prometheus::Registry::new())
            .build()
            .expect("metrics builder")
    }

    #[rstest]
    #[case(true, StatusCode::OK)]
    #[case(false, StatusCode::NOT_FOUND)]
    #[actix_web::test]
    async fn metrics_endpoint_follows_configuration(
        #[case] enabled: bool,
        #[case] expected: StatusCode,
    ) {
        let layer = MetricsLayer::from_option(enabled.then(metrics));
        assert_eq!(layer.is_enabled(), enabled);

        let app = actix_test::init_service(
            App::new()
                .wrap(layer)
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let ping =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/ping").to_request())
                .await;
        assert_eq!(ping.status(), StatusCode::OK);

        let scrape = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/metrics").to_request(),
        )
        .await;
        assert_eq!(scrape.status(), expected);
    }
}
