use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::error::AppError;

/// Paths still served while maintenance mode is on
const ALLOWED_PATHS: &[&str] = &["/api/health", "/maintenance"];

/// Answers 503 for everything except health and the maintenance notice when enabled.
#[derive(Clone, Copy)]
pub struct MaintenanceMode {
    enabled: bool,
}

impl MaintenanceMode {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MaintenanceMode
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = MaintenanceModeService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(MaintenanceModeService {
            service: Rc::new(service),
            enabled: self.enabled,
        }))
    }
}

pub struct MaintenanceModeService<S> {
    service: Rc<S>,
    enabled: bool,
}

impl<S, B> Service<ServiceRequest> for MaintenanceModeService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.enabled && !ALLOWED_PATHS.contains(&req.path()) {
            let response =
                AppError::ServiceUnavailable("Service is under maintenance".to_string())
                    .error_response();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        let service = self.service.clone();
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_boxed_body())
        })
    }
}
