//! In-process dispatch tests: no sockets, requests go straight to the
//! dispatcher.

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use failure_router::{Dispatcher, HandlerResult, Router, RouterError};

mod common;

use common::Checkpoint;

fn request(method: Method, path: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

async fn dispatch(router: Router, method: Method, path: &str) -> (StatusCode, String) {
    let dispatcher = Dispatcher::new(router.freeze().unwrap());
    read(dispatcher.dispatch(request(method, path)).await).await
}

async fn read(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn end_with_failure_message(ctx: &mut failure_router::RoutingContext) -> HandlerResult {
    let status = ctx.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = ctx.failure_message().unwrap_or_default();
    ctx.response().set_status(status).end_with(message)?;
    Ok(())
}

#[tokio::test]
async fn test_next_continues_across_routes() {
    let mut router = Router::new();
    router.route("/greet").handler(|ctx| {
        ctx.response()
            .insert_header(HeaderName::from_static("x-first"), HeaderValue::from_static("yes"));
        ctx.next();
        Ok(())
    });
    router.route_any().handler(|ctx| {
        ctx.response().end_with("second")?;
        Ok(())
    });

    let dispatcher = Dispatcher::new(router.freeze().unwrap());
    let response = dispatcher.dispatch(request(Method::GET, "/greet")).await;
    assert_eq!(response.headers()["x-first"], "yes");
    assert_eq!(read(response).await, (StatusCode::OK, "second".to_string()));
}

#[tokio::test]
async fn test_exhausted_chain_is_not_found() {
    let mut router = Router::new();
    router.route("/").handler(|ctx| {
        ctx.next();
        Ok(())
    });

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    );
}

#[tokio::test]
async fn test_unmatched_path_and_method() {
    let build = || {
        let mut router = Router::new();
        router.route("/only-get").method(Method::GET).handler(|ctx| {
            ctx.response().end()?;
            Ok(())
        });
        router
    };

    assert_eq!(
        dispatch(build(), Method::GET, "/elsewhere").await,
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    );
    assert_eq!(
        dispatch(build(), Method::POST, "/only-get").await,
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    );
}

#[tokio::test]
async fn test_unmatched_skips_failure_handlers_but_uses_error_handler() {
    let failure_handler_executed = Checkpoint::new();

    let mut router = Router::new();
    let f = failure_handler_executed.clone();
    router.route("/known").failure_handler(move |ctx| {
        f.flag();
        ctx.next();
        Ok(())
    });
    router.error_handler(StatusCode::NOT_FOUND, |ctx| {
        let body = format!("nothing at {}", ctx.path());
        ctx.response().set_status(StatusCode::NOT_FOUND).end_with(body)?;
        Ok(())
    });

    assert_eq!(
        dispatch(router, Method::GET, "/missing").await,
        (StatusCode::NOT_FOUND, "nothing at /missing".to_string())
    );
    assert_eq!(failure_handler_executed.count(), 0);
}

#[tokio::test]
async fn test_params_are_inherited_through_mounts() {
    let mut posts = Router::new();
    posts.route("/posts/:post").handler(|ctx| {
        let body = format!(
            "{}/{}",
            ctx.param("user").unwrap_or("?"),
            ctx.param("post").unwrap_or("?")
        );
        ctx.response().end_with(body)?;
        Ok(())
    });

    let mut router = Router::new();
    router.route("/users/:user/*").sub_router(posts);

    assert_eq!(
        dispatch(router, Method::GET, "/users/ada/posts/7").await,
        (StatusCode::OK, "ada/7".to_string())
    );
}

#[tokio::test]
async fn test_panic_is_an_uncaught_error() {
    let mut router = Router::new();
    router.route("/").handler(|_ctx| panic!("kaboom"));

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    );
}

#[tokio::test]
async fn test_panic_reaches_failure_handler() {
    let mut router = Router::new();
    router
        .route("/")
        .handler(|_ctx| panic!("kaboom"))
        .failure_handler(end_with_failure_message);

    let (status, body) = dispatch(router, Method::GET, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("kaboom"), "unexpected body: {body}");
}

#[tokio::test]
async fn test_stalled_handler_fails_the_request() {
    let mut router = Router::new();
    router.route("/").handler(|_ctx| Ok(()));

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    );
}

#[tokio::test]
async fn test_first_fail_wins() {
    let mut router = Router::new();
    router
        .route("/")
        .handler(|ctx| {
            ctx.next();
            ctx.fail(StatusCode::IM_A_TEAPOT);
            ctx.fail(StatusCode::BAD_GATEWAY);
            Ok(())
        })
        .failure_handler(end_with_failure_message);

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::IM_A_TEAPOT, String::new())
    );
}

#[tokio::test]
async fn test_error_after_end_keeps_response() {
    let mut router = Router::new();
    router.route("/").handler(|ctx| {
        ctx.response().end_with("done")?;
        Err("too late".into())
    });

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::OK, "done".to_string())
    );
}

#[tokio::test]
async fn test_async_handlers() {
    let mut router = Router::new();
    router
        .route("/slow")
        .async_handler(|ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ctx.fail_with(StatusCode::SERVICE_UNAVAILABLE, "warming up");
                HandlerResult::Ok(())
            })
        })
        .async_failure_handler(|ctx| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                end_with_failure_message(ctx)
            })
        });

    assert_eq!(
        dispatch(router, Method::GET, "/slow").await,
        (StatusCode::SERVICE_UNAVAILABLE, "warming up".to_string())
    );
}

#[tokio::test]
async fn test_failure_search_does_not_look_back() {
    let earlier_failure_handler_executed = Checkpoint::new();

    let mut router = Router::new();
    let earlier = earlier_failure_handler_executed.clone();
    router.route_any().failure_handler(move |ctx| {
        earlier.flag();
        end_with_failure_message(ctx)
    });
    router.route("/").handler(|_ctx| Err("late failure".into()));

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    );
    assert_eq!(earlier_failure_handler_executed.count(), 0);
}

#[tokio::test]
async fn test_fail_in_failure_handler_keeps_original_failure() {
    let teapot_handler = Checkpoint::new();
    let gateway_handler = Checkpoint::new();
    let later_failure_handler = Checkpoint::new();

    let mut router = Router::new();
    let later = later_failure_handler.clone();
    router
        .route("/")
        .handler(|ctx| {
            ctx.fail_with(StatusCode::IM_A_TEAPOT, "original");
            Ok(())
        })
        .failure_handler(|ctx| {
            ctx.fail(StatusCode::BAD_GATEWAY);
            Ok(())
        })
        .failure_handler(move |ctx| {
            later.flag();
            end_with_failure_message(ctx)
        });
    let teapot = teapot_handler.clone();
    router.error_handler(StatusCode::IM_A_TEAPOT, move |ctx| {
        teapot.flag();
        end_with_failure_message(ctx)
    });
    let gateway = gateway_handler.clone();
    router.error_handler(StatusCode::BAD_GATEWAY, move |ctx| {
        gateway.flag();
        end_with_failure_message(ctx)
    });

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::IM_A_TEAPOT, "original".to_string())
    );
    assert_eq!(teapot_handler.count(), 1);
    assert_eq!(gateway_handler.count(), 0);
    assert_eq!(later_failure_handler.count(), 0);
}

#[tokio::test]
async fn test_stalled_failure_handler_reaches_default_response() {
    let mut router = Router::new();
    router
        .route("/")
        .handler(|ctx| {
            ctx.fail(StatusCode::CONFLICT);
            Ok(())
        })
        .failure_handler(|_ctx| Ok(()));

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::CONFLICT, "Internal Server Error".to_string())
    );
}

#[tokio::test]
async fn test_failing_error_handler_falls_back_to_default() {
    let mut router = Router::new();
    router.route("/").handler(|_ctx| Err("first".into()));
    router.error_handler(StatusCode::INTERNAL_SERVER_ERROR, |_ctx| {
        Err("error handler broke too".into())
    });

    assert_eq!(
        dispatch(router, Method::GET, "/").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    );
}

fn api_router(error_handler_executed: &Checkpoint) -> Router {
    let mut api = Router::new();
    api.route("/items").handler(|_ctx| Err("no items".into()));
    let executed = error_handler_executed.clone();
    api.error_handler(StatusCode::INTERNAL_SERVER_ERROR, move |ctx| {
        executed.flag();
        ctx.response()
            .set_status(StatusCode::INTERNAL_SERVER_ERROR)
            .end_with("api error handler")?;
        Ok(())
    });
    api
}

#[tokio::test]
async fn test_error_handlers_belong_to_the_top_level_router() {
    let mounted = Checkpoint::new();
    let mut root = Router::new();
    root.route("/api/*").sub_router(api_router(&mounted));
    assert_eq!(
        dispatch(root, Method::GET, "/api/items").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    );
    assert_eq!(mounted.count(), 0);

    let standalone = Checkpoint::new();
    assert_eq!(
        dispatch(api_router(&standalone), Method::GET, "/items").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "api error handler".to_string())
    );
    assert_eq!(standalone.count(), 1);
}

#[tokio::test]
async fn test_abandoned_request_runs_no_error_handler() {
    let error_handler_executed = Checkpoint::new();

    let mut router = Router::new();
    router.route("/hang").async_handler(|_ctx| {
        Box::pin(async move {
            std::future::pending::<()>().await;
            HandlerResult::Ok(())
        })
    });
    let executed = error_handler_executed.clone();
    router.error_handler(StatusCode::INTERNAL_SERVER_ERROR, move |ctx| {
        executed.flag();
        ctx.response().end()?;
        Ok(())
    });

    let dispatcher = Dispatcher::new(router.freeze().unwrap());
    let closed = tokio::time::sleep(Duration::from_millis(20));
    let response = dispatcher
        .dispatch_until(request(Method::GET, "/hang"), closed)
        .await;

    assert!(response.is_none());
    assert_eq!(error_handler_executed.count(), 0);
}

#[tokio::test]
async fn test_dispatch_until_returns_finished_response() {
    let mut router = Router::new();
    router.route("/").handler(|ctx| {
        ctx.response().end_with("quick")?;
        Ok(())
    });

    let dispatcher = Dispatcher::new(router.freeze().unwrap());
    let response = dispatcher
        .dispatch_until(request(Method::GET, "/"), std::future::pending())
        .await
        .expect("request should complete");
    assert_eq!(read(response).await, (StatusCode::OK, "quick".to_string()));
}

#[test]
fn test_freeze_rejects_invalid_trees() {
    let mut exact_mount = Router::new();
    exact_mount.route("/api").sub_router(Router::new());
    assert_eq!(
        exact_mount.freeze().unwrap_err(),
        RouterError::MountOnExactPattern {
            pattern: "/api".to_string()
        }
    );

    let mut busy_mount = Router::new();
    busy_mount
        .route("/api/*")
        .handler(|_ctx| Ok(()))
        .sub_router(Router::new());
    assert_eq!(
        busy_mount.freeze().unwrap_err(),
        RouterError::MountWithHandlers {
            pattern: "/api/*".to_string()
        }
    );
}
