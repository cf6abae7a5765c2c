/// Identity guard for protected routes
///
/// Resolves the access token on every request through
/// `AuthService::resolve_request_identity` and stores the result in the
/// request extensions. Requests that fail never reach the handler.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::AppError;

/// Authenticated caller, available to handlers as `web::ReqData<Identity>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

pub struct RequireIdentity {
    auth: web::Data<AuthService>,
}

impl RequireIdentity {
    pub fn new(auth: web::Data<AuthService>) -> Self {
        Self { auth }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireIdentity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireIdentityService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireIdentityService {
            service: Rc::new(service),
            auth: self.auth.clone(),
        }))
    }
}

pub struct RequireIdentityService<S> {
    service: Rc<S>,
    auth: web::Data<AuthService>,
}

impl<S, B> Service<ServiceRequest> for RequireIdentityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.auth.resolve_request_identity(req.headers()) {
            Ok(user_id) => {
                req.extensions_mut().insert(Identity { user_id });
                tracing::debug!(user_id = %user_id, "Request identity resolved");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let error: Error = AppError::Auth(e).into();
                Box::pin(async move { Err(error) })
            }
        }
    }
}
