use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    account_routes(server.clone())
        .or(friend_routes(server.clone()))
        .or(request_routes(server))
}

fn account_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("accounts"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let lookup = warp::get()
        .and(warp::path("accounts"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::lookup_account);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    signup.or(lookup).or(login).or(refresh)
}

fn friend_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let list = warp::get()
        .and(warp::path("friends"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::list_friends);

    let get = warp::get()
        .and(warp::path("friends"))
        .and(warp::path::param::<UserId>())
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::get_friend);

    let status = warp::get()
        .and(warp::path("friends"))
        .and(warp::path::param::<UserId>())
        .and(warp::path("status"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::relationship_status);

    let remove = warp::post()
        .and(warp::path("friends"))
        .and(warp::path("remove"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.user_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::remove_friend);

    let remove_all = warp::post()
        .and(warp::path("friends"))
        .and(warp::path("remove_all"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::remove_all_friends);

    list.or(get).or(status).or(remove).or(remove_all)
}

fn request_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let outgoing = warp::get()
        .and(warp::path("requests"))
        .and(warp::path("outgoing"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::list_outgoing_requests);

    let incoming = warp::get()
        .and(warp::path("requests"))
        .and(warp::path("incoming"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::list_incoming_requests);

    let send = warp::post()
        .and(warp::path("requests"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.user_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::send_request);

    let cancel = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("cancel"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.user_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::cancel_request);

    let cancel_all = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("cancel_all"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::cancel_all_requests);

    let accept = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("accept"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.relationship_service.clone()))
        .and_then(handler::accept_request);

    let accept_all = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("accept_all"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::accept_all_requests);

    let reject = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("reject"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.relationship_service.clone()))
        .and_then(handler::reject_request);

    let reject_all = warp::post()
        .and(warp::path("requests"))
        .and(warp::path("reject_all"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(handler::reject_all_requests);

    outgoing
        .or(incoming)
        .or(send)
        .or(cancel)
        .or(cancel_all)
        .or(accept)
        .or(accept_all)
        .or(reject)
        .or(reject_all)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let user_id = auth_service
                    .verify_token(token)
                    .await
                    .map_err(ApiRejection::from)
                    .map_err(reject::custom)?;
                Ok(user_id)
            } else {
                Err(reject::custom(ApiRejection::new(ApiErrorCode::InvalidToken)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use serde_json::{Value, json};
    use warp::http::StatusCode;

    async fn api() -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
        let server = Arc::new(Server::try_new(&Settings::in_memory()).await.unwrap());
        routes(server).recover(recover_error)
    }

    async fn call<F>(
        api: &F,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value)
    where
        F: Filter<Error = Infallible> + Clone + 'static,
        F::Extract: warp::Reply + Send,
    {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.reply(api).await;
        let body = serde_json::from_slice(response.body()).unwrap();
        (response.status(), body)
    }

    /// Signs up and returns `(user id, access token)`.
    async fn signup<F>(api: &F, username: &str) -> (String, String)
    where
        F: Filter<Error = Infallible> + Clone + 'static,
        F::Extract: warp::Reply + Send,
    {
        let (status, body) = call(
            api,
            "POST",
            "/accounts",
            None,
            Some(json!({ "username": username, "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let data = &body["data"];
        (
            data["user_id"].as_str().unwrap().to_owned(),
            data["auth_tokens"]["access_token"].as_str().unwrap().to_owned(),
        )
    }

    #[tokio::test]
    async fn friendship_lifecycle_over_http() {
        let api = api().await;
        let (alice_id, alice) = signup(&api, "alice").await;
        let (bob_id, bob) = signup(&api, "bob").await;

        let (status, body) = call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["befriended"], false);
        assert_eq!(body["data"]["to"], "bob");

        let (_, body) = call(&api, "GET", "/requests/incoming", Some(&bob), None).await;
        assert_eq!(body["data"][0]["from"], "alice");

        let (status, body) = call(
            &api,
            "GET",
            &format!("/friends/{alice_id}/status"),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "incoming_pending");

        let (status, _) = call(
            &api,
            "POST",
            "/requests/accept",
            Some(&bob),
            Some(json!({ "id": alice_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(&api, "GET", "/friends", Some(&alice), None).await;
        assert_eq!(body["data"][0]["username"], "bob");
        let (_, body) = call(
            &api,
            "GET",
            &format!("/friends/{bob_id}/status"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(body["data"]["message"], "You are friends with bob");

        let (status, _) = call(
            &api,
            "POST",
            "/friends/remove",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&api, "GET", "/friends", Some(&bob), None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn reciprocal_send_reports_the_friendship() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;
        let (_, bob) = signup(&api, "bob").await;

        call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        let (status, body) = call(
            &api,
            "POST",
            "/requests",
            Some(&bob),
            Some(json!({ "to_user": "alice" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["befriended"], true);
        assert_eq!(body["data"]["id"], Value::Null);
        assert_eq!(body["data"]["from"], "bob");
        assert_eq!(body["data"]["to"], "alice");
    }

    #[tokio::test]
    async fn error_kinds_keep_distinct_statuses() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;
        let (bob_id, bob) = signup(&api, "bob").await;

        let (status, body) = call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "SelfRequest");

        call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        let (status, body) = call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DuplicateRequest");

        let (status, body) = call(
            &api,
            "POST",
            "/requests/reject",
            Some(&alice),
            Some(json!({ "id": bob_id })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "RequestNotFound");

        let (status, body) = call(&api, "POST", "/requests/accept_all", Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NoRequestsFound");

        let (status, body) = call(
            &api,
            "GET",
            &format!("/friends/{bob_id}"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NotFriends");

        let (status, body) = call(
            &api,
            "POST",
            "/accounts",
            None,
            Some(json!({ "username": "bob", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "UsernameTaken");

        let (status, _) = call(&api, "GET", "/friends", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn authenticated_routes_require_a_valid_token() {
        let api = api().await;

        let (status, body) = call(&api, "GET", "/friends", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, body) = call(&api, "GET", "/friends", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "InvalidToken");

        let (status, body) = call(
            &api,
            "POST",
            "/login",
            None,
            Some(json!({ "username": "nobody", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "InvalidCredentials");
    }

    #[tokio::test]
    async fn bulk_routes_report_counts() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;
        signup(&api, "bob").await;
        signup(&api, "carol").await;

        for to in ["bob", "carol"] {
            call(
                &api,
                "POST",
                "/requests",
                Some(&alice),
                Some(json!({ "to_user": to })),
            )
            .await;
        }
        let (_, body) = call(&api, "GET", "/requests/outgoing", Some(&alice), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, body) = call(&api, "POST", "/requests/cancel_all", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 2);

        let (_, body) = call(&api, "POST", "/requests/reject_all", Some(&alice), None).await;
        assert_eq!(body["data"]["count"], 0);
    }

    #[tokio::test]
    async fn accounts_can_be_looked_up_by_username() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;
        let (bob_id, _) = signup(&api, "bob").await;

        let (status, body) = call(&api, "GET", "/accounts/bob", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], bob_id);

        let (status, body) = call(&api, "GET", "/accounts/nobody", Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "UserNotFound");
    }

    #[tokio::test]
    async fn target_usernames_must_exist() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;

        for path in ["/requests", "/requests/cancel", "/friends/remove"] {
            let (status, body) = call(
                &api,
                "POST",
                path,
                Some(&alice),
                Some(json!({ "to_user": "nobody" })),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body["error"]["code"], "UserNotFound", "{path}");
        }
    }

    #[tokio::test]
    async fn cancel_by_username_withdraws_the_request() {
        let api = api().await;
        let (_, alice) = signup(&api, "alice").await;
        let (_, bob) = signup(&api, "bob").await;

        call(
            &api,
            "POST",
            "/requests",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        let (status, _) = call(
            &api,
            "POST",
            "/requests/cancel",
            Some(&alice),
            Some(json!({ "to_user": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&api, "GET", "/requests/incoming", Some(&bob), None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn signup_validation_explains_what_is_wrong() {
        let api = api().await;

        let (status, body) = call(
            &api,
            "POST",
            "/accounts",
            None,
            Some(json!({ "username": "alice", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "InvalidInput");
        assert_eq!(
            body["error"]["message"],
            "password must be at least 8 characters"
        );
    }

    #[tokio::test]
    async fn bad_token_wins_over_a_bad_body() {
        let api = api().await;

        for token in [None, Some("x")] {
            let response = warp::test::request()
                .method("POST")
                .path("/requests");
            let response = match token {
                Some(token) => response.header("authorization", format!("Bearer {token}")),
                None => response,
            };
            let response = response.body("{not json").reply(&api).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
