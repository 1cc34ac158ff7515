//! Access control middleware for the dashboard routes.
//!
//! Each protected route names the role it requires. The middleware pulls the access token from the role's cookie
//! (`admin_token` / `seller-auth-token`) or an `Authorization: Bearer` header, validates the signature and expiry,
//! checks the role claim, and stashes the [`JwtClaims`] in the request extensions for handlers to extract.
//! A missing or invalid token yields a 401; a valid token with the wrong role yields a 403.
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
    HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::{debug, warn};

use crate::{
    auth::{Role, TokenIssuer},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_role: Role,
}

impl AclMiddlewareFactory {
    pub fn new(required_role: Role) -> Self {
        AclMiddlewareFactory { required_role }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_role: self.required_role, service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_role: Role,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_role = self.required_role;
        Box::pin(async move {
            let issuer = req
                .app_data::<web::Data<TokenIssuer>>()
                .cloned()
                .ok_or_else(|| ServerError::InitializeError("No token issuer is registered".to_string()))?;
            let token = extract_token(&req, required_role).ok_or_else(|| {
                debug!("🔐️ No access token on request for {}", req.path());
                ServerError::AuthenticationError(AuthError::MissingToken)
            })?;
            let claims = issuer.decode_token(&token).map_err(|e| {
                warn!("🔐️ Invalid access token on request for {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            if claims.role != required_role {
                warn!("🔐️ A {} token was presented on a {required_role} route.", claims.role);
                return Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(format!(
                    "This route requires the {required_role} role"
                )))
                .into());
            }
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

/// The role's own cookie wins; a `Bearer` header is the fallback.
fn extract_token(req: &ServiceRequest, role: Role) -> Option<String> {
    if let Some(cookie) = req.cookie(role.cookie_name()) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}
