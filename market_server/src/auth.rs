//! Caller identity resolution.
//!
//! Authentication happens upstream: the gateway terminates the user's credentials and injects the resolved identity
//! into the request headers before it reaches this service. This module only reads those headers back out; there is
//! no token handling here.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use market_engine::ActingUser;
use mkt_common::parse_boolean_flag;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";

/// The identity injected by the gateway. Extractable in any route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    /// Display name, used when the caller's actions need to be attributed by name (e.g. merge back-links).
    pub name: String,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn acting(&self) -> ActingUser {
        ActingUser { id: self.id, is_admin: self.is_admin }
    }
}

fn header_string(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = header_string(req, USER_ID_HEADER)
            .ok_or_else(|| ServerError::Unauthenticated(format!("Missing {USER_ID_HEADER} header")))
            .and_then(|id| {
                id.parse::<i64>()
                    .map_err(|_| ServerError::Unauthenticated(format!("Invalid {USER_ID_HEADER} header")))
            })
            .map(|id| {
                let name = header_string(req, USER_NAME_HEADER).unwrap_or_default();
                let is_admin = parse_boolean_flag(header_string(req, USER_ADMIN_HEADER), false);
                AuthenticatedUser { id, name, is_admin }
            });
        ready(result)
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn extracts_identity_from_gateway_headers() {
        let req = TestRequest::get()
            .insert_header((USER_ID_HEADER, "42"))
            .insert_header((USER_NAME_HEADER, "alice"))
            .insert_header((USER_ADMIN_HEADER, "true"))
            .to_http_request();
        let user = AuthenticatedUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user, AuthenticatedUser { id: 42, name: "alice".to_string(), is_admin: true });
    }

    #[actix_web::test]
    async fn missing_or_garbled_user_id_is_unauthenticated() {
        let req = TestRequest::get().to_http_request();
        let err = AuthenticatedUser::from_request(&req, &mut Payload::None).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthenticated(_)));

        let req = TestRequest::get().insert_header((USER_ID_HEADER, "not-a-number")).to_http_request();
        let err = AuthenticatedUser::from_request(&req, &mut Payload::None).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthenticated(_)));
    }

    #[actix_web::test]
    async fn admin_flag_defaults_to_false() {
        let req = TestRequest::get().insert_header((USER_ID_HEADER, "7")).to_http_request();
        let user = AuthenticatedUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.name, "");
    }
}
