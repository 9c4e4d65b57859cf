use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use threadpool::ThreadPool;
use tiny_http::Method;

use crate::config::Config;
use crate::context::Context;
use crate::handlers::{
    handle_add_user, handle_dashboard, handle_delete_user, handle_login, handle_not_found,
    handle_root, handle_settings, handle_users, respond,
};
use crate::logger::get_reporter;
use crate::request::{
    Request, BODY_TOO_LARGE_ERROR, EMPTY_REQUEST_ERROR, HEAD_TOO_LARGE_ERROR, IO_ERROR, TIMEOUT_ERROR,
    TRUNCATED_BODY_ERROR,
};
use crate::response::{Response, HTTP_400, HTTP_413, HTTP_431};
use crate::store::{SharedStore, UserStore};
use crate::utils::{Result, ResultV};


const MODULE: &str = "SERVER";
const WORKER_NAME: &str = "userdesk-worker";

pub const BIND_ERROR: &str = "bind error";
pub const SOCKET_ERROR: &str = "socket error";


pub struct Server {
    listener: TcpListener,
    pool: ThreadPool,
    store: SharedStore,
    cfg: Arc<Config>,
}

impl Server {
    pub fn bind(cfg: Config, store: UserStore) -> Result<Server> {
        let addr = cfg.address();
        let listener = TcpListener::bind(&addr).map_err(|e| {
            error!("[{}] Could not start server at {}: {}", MODULE, addr, e);
            BIND_ERROR
        })?;

        Ok(Server {
            listener,
            pool: ThreadPool::with_name(WORKER_NAME.to_string(), cfg.server.workers),
            store: store.shared(),
            cfg: Arc::new(cfg),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(get_reporter(MODULE, "Socket", SOCKET_ERROR))
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Accept connections forever, each one is served on the worker pool
    pub fn run(&self) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(s) => {
                    let ctx = Context::new(self.store.clone(), self.cfg.clone());
                    self.pool.execute(move || {
                        handle_connection(s, ctx).ok();
                    });
                }
                Err(e) => error!("[{}] Failed to accept connection: {}", MODULE, e),
            }
        }
    }
}

fn handle_connection(stream: TcpStream, mut ctx: Context) -> ResultV {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "unknown".to_string());
    debug!("[{}] New connection [qid={}] from {}", MODULE, ctx.qid, peer);

    let reporter = get_reporter(MODULE, "Socket", SOCKET_ERROR);
    stream.set_read_timeout(ctx.cfg.server.read_timeout()).map_err(&reporter)?;
    stream.set_write_timeout(ctx.cfg.server.write_timeout()).map_err(&reporter)?;

    serve(stream, &mut ctx)
}

/// Read one request from `stream`, dispatch it and write the response back
pub fn serve<S: Read + Write>(mut stream: S, ctx: &mut Context) -> ResultV {
    let parsed = {
        let mut reader = BufReader::new(&mut stream);
        Request::read_from(&mut reader, ctx.cfg.server.max_head_bytes, ctx.cfg.server.max_body_bytes)
    };

    let response = match parsed {
        Ok(r) => {
            let headers: String = r.headers.iter().map(|h| -> String {
                h.to_string()
            }).collect::<Vec<String>>().join("\\r\\n");
            info!(
                "[{}] New Request [qid={}]: method: {}; url: {}; version: {}; headers='{}'",
                MODULE, ctx.qid, r.method, r.url, r.http_version, headers
            );

            dispatch(&r, ctx)
        }
        Err(EMPTY_REQUEST_ERROR) => {
            debug!("[{}] [{}] Connection closed without a request", MODULE, ctx.qid);
            return Ok(());
        }
        Err(e @ (IO_ERROR | TIMEOUT_ERROR | TRUNCATED_BODY_ERROR)) => {
            warn!("[{}] [{}] Connection abandoned: {}", MODULE, ctx.qid, e);
            return Err(e);
        }
        Err(HEAD_TOO_LARGE_ERROR) => {
            warn!("[{}] [{}] Request head exceeds {} bytes", MODULE, ctx.qid, ctx.cfg.server.max_head_bytes);
            Response::text(HTTP_431, "Request Header Fields Too Large")
        }
        Err(BODY_TOO_LARGE_ERROR) => {
            warn!("[{}] [{}] Request body exceeds {} bytes", MODULE, ctx.qid, ctx.cfg.server.max_body_bytes);
            Response::text(HTTP_413, "Payload Too Large")
        }
        Err(e) => {
            warn!("[{}] [{}] Bad request: {}", MODULE, ctx.qid, e);
            Response::text(HTTP_400, "Bad Request")
        }
    };

    respond(&mut stream, ctx, &response).map_err(|_| IO_ERROR)
}

/// Route a parsed request to its handler
pub fn dispatch(r: &Request, ctx: &mut Context) -> Response {
    match (&r.method, r.path.as_str()) {
        (Method::Get, path) if path.starts_with("/users/delete") => handle_delete_user(r, ctx),
        (Method::Get, "/") => handle_root(ctx),
        (Method::Post, "/login") => handle_login(r, ctx),
        (Method::Get, "/dashboard") => handle_dashboard(ctx),
        (Method::Get, "/users") => handle_users(ctx),
        (Method::Post, "/users/add") => handle_add_user(r, ctx),
        (Method::Get, "/settings") => handle_settings(ctx),
        (_, _) => handle_not_found(r, ctx),
    }
}
