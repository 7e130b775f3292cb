use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use serde::Serialize;

use crate::auth::{USER_ADMIN_HEADER, USER_ID_HEADER, USER_NAME_HEADER};

/// The caller for a test request, standing in for the identity headers the gateway would inject.
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Anonymous,
    User(i64),
    Admin(i64),
}

fn with_identity(mut req: TestRequest, caller: Caller) -> TestRequest {
    match caller {
        Caller::Anonymous => {},
        Caller::User(id) => {
            req = req
                .insert_header((USER_ID_HEADER, id.to_string()))
                .insert_header((USER_NAME_HEADER, format!("user-{id}")));
        },
        Caller::Admin(id) => {
            req = req
                .insert_header((USER_ID_HEADER, id.to_string()))
                .insert_header((USER_NAME_HEADER, format!("admin-{id}")))
                .insert_header((USER_ADMIN_HEADER, "true"));
        },
    }
    req
}

async fn execute(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn get_request(
    caller: Caller,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = with_identity(TestRequest::get().uri(path), caller);
    execute(req, configure).await
}

pub async fn put_request<B: Serialize>(
    caller: Caller,
    path: &str,
    body: B,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = with_identity(TestRequest::put().uri(path).set_json(body), caller);
    execute(req, configure).await
}

pub async fn post_request<B: Serialize>(
    caller: Caller,
    path: &str,
    body: B,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = with_identity(TestRequest::post().uri(path).set_json(body), caller);
    execute(req, configure).await
}
