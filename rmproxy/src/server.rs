//! The HTTP façade: thin warp routes in front of the catalog and the
//! dispatcher queue.
//!
//! Every path carries the shared secret as the segment after the category
//! prefix. The key is checked before anything else, so a wrong or missing
//! key is a 401 no matter how many segments follow; a correct key with the
//! wrong number of arguments is a 404. Operational failures are
//! body-encoded as `Error: <message>` with status 200, matching what the
//! remote-control clients expect.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use warp::http::StatusCode;
use warp::path::Tail;
use warp::{Filter, Rejection, Reply};

use crate::assets;
use crate::catalog::Catalog;
use crate::dispatcher::Command;
use crate::error::ProxyError;
use crate::homeassistant::HomeAssistant;
use crate::message::{Instruction, Message};

/// Everything the handlers need, constructed once at startup and read-only
/// afterwards.
pub struct ProxyState {
    pub key: String,
    pub catalog: Catalog,
    pub macros: HashMap<String, Message>,
    pub homeassistant: Option<HomeAssistant>,
    pub queue: mpsc::Sender<Command>,
}

/// Build the complete route tree.
pub fn routes(
    state: Arc<ProxyState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let learn = section("learn", state.clone()).and_then(handle_learn);
    let learnrf = section("learnrf", state.clone()).and_then(handle_learnrf);
    let execute = section("execute", state.clone()).and_then(handle_execute);
    let run_macro = section("macro", state.clone()).and_then(handle_macro);
    let query = section("query", state.clone()).and_then(handle_query);
    let homeassistant = section("homeassistant", state.clone()).and_then(handle_homeassistant);
    let remote = section("remote", state).and_then(handle_remote);

    learn
        .or(learnrf)
        .unify()
        .or(execute)
        .unify()
        .or(run_macro)
        .unify()
        .or(query)
        .unify()
        .or(homeassistant)
        .unify()
        .or(remote)
        .unify()
        .recover(handle_rejection)
}

/// One category prefix with whatever follows it captured as a tail, so the
/// handlers can check the key before looking at argument arity.
fn section(
    prefix: &'static str,
    state: Arc<ProxyState>,
) -> impl Filter<Extract = (Tail, Arc<ProxyState>), Error = Rejection> + Clone {
    warp::path(prefix)
        .and(warp::path::tail())
        .and(warp::get())
        .and(with_state(state))
}

fn with_state(
    state: Arc<ProxyState>,
) -> impl Filter<Extract = (Arc<ProxyState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Strip the key segment off the tail and hand back the remaining path
/// components. A wrong or missing key short-circuits to a 401 before any
/// argument is even counted.
fn authorize<'a>(tail: &'a Tail, state: &ProxyState) -> Result<Vec<&'a str>, warp::reply::Response> {
    let mut components = tail.as_str().split('/');
    match components.next() {
        Some(key) if !key.is_empty() && key == state.key => Ok(components.collect()),
        _ => Err(unauthorized()),
    }
}

type HttpResult = Result<warp::reply::Response, Infallible>;

async fn handle_learn(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    if args.len() != 1 {
        return Ok(invalid_command());
    }
    let device = args[0].to_string();

    info!("learn {device}");
    let (reply, response) = oneshot::channel();
    if state
        .queue
        .send(Command::LearnIr { device, reply })
        .await
        .is_err()
    {
        return Ok(error_body(ProxyError::DispatcherGone));
    }
    Ok(match response.await {
        Ok(Ok(code)) => ok_body(format!("{code}\n")),
        Ok(Err(e)) => logged_error_body(e),
        Err(_) => error_body(ProxyError::DispatcherGone),
    })
}

async fn handle_learnrf(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    if args.len() != 1 {
        return Ok(invalid_command());
    }
    let device = args[0].to_string();

    info!("learn RF {device}");
    let (reply, response) = oneshot::channel();
    if state
        .queue
        .send(Command::LearnRf { device, reply })
        .await
        .is_err()
    {
        return Ok(error_body(ProxyError::DispatcherGone));
    }
    Ok(match response.await {
        Ok(Ok(code)) => ok_body(format!("{code}\n")),
        Ok(Err(e)) => logged_error_body(e),
        Err(_) => error_body(ProxyError::DispatcherGone),
    })
}

async fn handle_execute(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    let [room, command] = args[..] else {
        return Ok(invalid_command());
    };

    info!("execute {command} in {room}");
    let (target, data) = match state.catalog.resolve(room, command) {
        Ok(resolved) => resolved,
        Err(e) => return Ok(logged_error_body(e)),
    };

    let message = Message::single(Instruction::SendCode {
        target: target.to_string(),
        data: data.to_string(),
    });
    if state.queue.send(Command::Message(message)).await.is_err() {
        return Ok(error_body(ProxyError::DispatcherGone));
    }
    Ok(ok_body("OK\n"))
}

async fn handle_macro(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    let [name] = args[..] else {
        return Ok(invalid_command());
    };

    info!("execute macro {name}");
    let Some(message) = state.macros.get(name) else {
        return Ok(logged_error_body(ProxyError::UnknownMacro(name.to_string())));
    };
    if state
        .queue
        .send(Command::Message(message.clone()))
        .await
        .is_err()
    {
        return Ok(error_body(ProxyError::DispatcherGone));
    }
    Ok(ok_body("OK\n"))
}

async fn handle_query(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    if args.len() != 1 {
        return Ok(invalid_command());
    }
    let device = args[0].to_string();

    info!("query {device}");
    let (reply, response) = oneshot::channel();
    if state
        .queue
        .send(Command::QueryPower { device, reply })
        .await
        .is_err()
    {
        return Ok(error_body(ProxyError::DispatcherGone));
    }
    Ok(match response.await {
        Ok(Ok(on)) => ok_body(format!("{on}\n")),
        Ok(Err(e)) => logged_error_body(e),
        Err(_) => error_body(ProxyError::DispatcherGone),
    })
}

async fn handle_homeassistant(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    let [command] = args[..] else {
        return Ok(invalid_command());
    };
    let command = command.to_string();

    info!("execute Home Assistant command {command}");
    if state.homeassistant.is_none() {
        return Ok(ok_body("Not configured for Home Assistant\n"));
    }

    // ureq is blocking; keep it off the async workers
    let outcome = tokio::task::spawn_blocking({
        let state = state.clone();
        move || match &state.homeassistant {
            Some(bridge) => bridge.execute(&command),
            None => Ok(()),
        }
    })
    .await;

    Ok(match outcome {
        Ok(Ok(())) => ok_body("OK\n"),
        Ok(Err(e)) => logged_error_body(e),
        Err(e) => {
            error!("Home Assistant task failed: {e}");
            error_body(ProxyError::Bridge(e.to_string()))
        }
    })
}

async fn handle_remote(tail: Tail, state: Arc<ProxyState>) -> HttpResult {
    let args = match authorize(&tail, &state) {
        Ok(args) => args,
        Err(resp) => return Ok(resp),
    };
    Ok(match args[..] {
        [] | [""] | ["index.html"] => warp::reply::html(assets::INDEX_HTML).into_response(),
        ["icon.png"] => warp::reply::with_header(assets::ICON_PNG, "content-type", "image/png")
            .into_response(),
        _ => plain(StatusCode::NOT_FOUND, "Not found\n".to_string()),
    })
}

async fn handle_rejection(_: Rejection) -> Result<impl Reply, Infallible> {
    Ok(plain(StatusCode::NOT_FOUND, "Not found\n".to_string()))
}

fn plain(status: StatusCode, body: String) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::with_header(body, "content-type", "text/plain; charset=utf-8"),
        status,
    )
    .into_response()
}

fn ok_body(body: impl Into<String>) -> warp::reply::Response {
    plain(StatusCode::OK, body.into())
}

/// Body-encoded failure: status stays 200, the message tells the story.
fn error_body(e: impl Display) -> warp::reply::Response {
    plain(StatusCode::OK, format!("Error: {e}\n"))
}

fn logged_error_body(e: impl Display) -> warp::reply::Response {
    error!("Error: {e}");
    error_body(e)
}

fn unauthorized() -> warp::reply::Response {
    plain(StatusCode::UNAUTHORIZED, "Unauthorized\n".to_string())
}

/// Correct key but the wrong number of arguments behind it.
fn invalid_command() -> warp::reply::Response {
    plain(StatusCode::NOT_FOUND, "Invalid command\n".to_string())
}
