use std::io::{self, Write};

use crate::context::Context;
use crate::form::Form;
use crate::request::Request;
use crate::response::{Response, HTTP_200, HTTP_400, HTTP_401, HTTP_404, HTTP_500};
use crate::store::{self, Role};
use crate::utils::escape_html;


const MODULE: &str = "HANDLERS";

const ROOT_PAGE: &str = "<html>\
    <head><title>Welcome</title></head>\
    <body>\
    <h1>Welcome to the Simple Web Server</h1>\
    <p>Visit <a href='/users'>/users</a> for server administration.</p>\
    </body>\
    </html>";

const USER_ADDED_PAGE: &str =
    "<html><body><h1>User Added Successfully</h1><a href='/users'>Back to Users</a></body></html>";
const USER_DELETED_PAGE: &str =
    "<html><body><h1>User Deleted Successfully</h1><a href='/users'>Back to Users</a></body></html>";

pub const INVALID_LOGIN_MSG: &str = "Invalid login data";
pub const INVALID_CREDENTIALS_MSG: &str = "Invalid credentials";
pub const INVALID_USER_DATA_MSG: &str = "Invalid user data";
pub const INVALID_USER_INPUT_MSG: &str = "Invalid input for adding user";
pub const INVALID_DELETE_MSG: &str = "Invalid delete data";
pub const USER_NOT_FOUND_MSG: &str = "User not found";
pub const DASHBOARD_NOT_FOUND_MSG: &str = "Dashboard file not found";
pub const NOT_FOUND_MSG: &str = "404 Not Found";


/// Write the response and log its outcome
pub fn respond<W: Write>(out: &mut W, ctx: &mut Context, response: &Response) -> io::Result<()> {
    let result = response.write_to(out);

    ctx.fix();
    match &result {
        Ok(sent) => info!(
            "[{}] Respond to [{}]: time: {}ms; status: {}; sent: {} bytes",
            MODULE, ctx.qid, ctx.time_ms(), response.code(), sent
        ),
        Err(e) => error!("[{}] Failed to respond to [{}]: {}", MODULE, ctx.qid, e),
    }
    result.map(|_| ())
}

fn server_error(ctx: &Context, e: &str) -> Response {
    error!("[{}] [{}] Server error: {}", MODULE, ctx.qid, e);
    Response::text(HTTP_500, "Internal Server Error")
}

pub fn handle_root(ctx: &mut Context) -> Response {
    info!("[{}] [{}] Handled request for root path", MODULE, ctx.qid);
    Response::html(HTTP_200, ROOT_PAGE)
}

pub fn handle_login(r: &Request, ctx: &mut Context) -> Response {
    let form = match Form::from_bytes(&r.body) {
        Ok(f) => f,
        Err(e) => {
            warn!("[{}] [{}] Invalid login data received: {}", MODULE, ctx.qid, e);
            return Response::text(HTTP_400, INVALID_LOGIN_MSG);
        }
    };
    let (username, password) = match (form.get("username"), form.get("password")) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            warn!("[{}] [{}] Invalid login data received: missing fields", MODULE, ctx.qid);
            return Response::text(HTTP_400, INVALID_LOGIN_MSG);
        }
    };

    let role = match store::lock(&ctx.store) {
        Ok(users) if users.authenticate(username, password) => users.role(username),
        Ok(_) => None,
        Err(e) => return server_error(ctx, e),
    };

    if let Some(role) = role {
        info!("[{}] [{}] User logged in: {} ({})", MODULE, ctx.qid, username, role);
        Response::text(HTTP_200, format!("Login successful! Welcome, {}", username))
    } else {
        warn!("[{}] [{}] Failed login attempt for username: {}", MODULE, ctx.qid, username);
        Response::text(HTTP_401, INVALID_CREDENTIALS_MSG)
    }
}

pub fn handle_dashboard(ctx: &mut Context) -> Response {
    let path = &ctx.cfg.pages.dashboard;
    info!("[{}] [{}] Looking for dashboard at: {}", MODULE, ctx.qid, path);

    match std::fs::read(path) {
        Ok(content) => {
            info!("[{}] [{}] Dashboard served successfully", MODULE, ctx.qid);
            Response::html(HTTP_200, content)
        }
        Err(e) => {
            error!("[{}] [{}] Dashboard file not readable at {}: {}", MODULE, ctx.qid, path, e);
            Response::text(HTTP_500, DASHBOARD_NOT_FOUND_MSG)
        }
    }
}

pub fn handle_users(ctx: &mut Context) -> Response {
    let users = match store::lock(&ctx.store) {
        Ok(users) => users.list(),
        Err(e) => return server_error(ctx, e),
    };

    let mut page = String::from(
        "<html><head><title>Manage Users</title></head><body><h1>Manage Users</h1><ul>"
    );
    for user in &users {
        page.push_str(&format!(
            "<li>{} - Role: {} - <a href='/users/delete?user={}'>Delete</a></li>",
            escape_html(&user.username),
            user.role,
            escape_html(&urlencoding::encode(&user.username)),
        ));
    }
    page.push_str(
        "</ul>\
        <form action='/users/add' method='post'>\
        <h3>Add User</h3>\
        Username: <input type='text' name='username'><br>\
        Password: <input type='text' name='password'><br>\
        <input type='submit' value='Add User'>\
        </form>\
        <a href='/'>Back to Home</a>\
        </body></html>"
    );

    info!("[{}] [{}] Served Manage Users page with {} users", MODULE, ctx.qid, users.len());
    Response::html(HTTP_200, page)
}

pub fn handle_add_user(r: &Request, ctx: &mut Context) -> Response {
    let form = match Form::from_bytes(&r.body) {
        Ok(f) => f,
        Err(e) => {
            warn!("[{}] [{}] Invalid user data received: {}", MODULE, ctx.qid, e);
            return Response::text(HTTP_400, INVALID_USER_DATA_MSG);
        }
    };
    let (username, password) = match (form.get("username"), form.get("password")) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            warn!("[{}] [{}] Invalid user data received: missing fields", MODULE, ctx.qid);
            return Response::text(HTTP_400, INVALID_USER_DATA_MSG);
        }
    };
    if username.is_empty() || password.is_empty() {
        warn!("[{}] [{}] Failed to add user: empty username or password", MODULE, ctx.qid);
        return Response::text(HTTP_400, INVALID_USER_INPUT_MSG);
    }

    let existed = match store::lock(&ctx.store) {
        Ok(mut users) => {
            let existed = users.contains(username);
            users.upsert(username, password, Role::User);
            existed
        }
        Err(e) => return server_error(ctx, e),
    };
    if existed {
        info!("[{}] [{}] User replaced: {}", MODULE, ctx.qid, username);
    } else {
        info!("[{}] [{}] User added: {}", MODULE, ctx.qid, username);
    }
    Response::html(HTTP_200, USER_ADDED_PAGE)
}

pub fn handle_delete_user(r: &Request, ctx: &mut Context) -> Response {
    let form = Form::parse(r.query.as_deref().unwrap_or_default());
    let username = match form.as_ref().ok().and_then(|f| f.get("user")) {
        Some(u) if !u.is_empty() => u,
        _ => {
            warn!("[{}] [{}] Invalid delete data received: `{}`", MODULE, ctx.qid, r.url);
            return Response::text(HTTP_400, INVALID_DELETE_MSG);
        }
    };

    let removed = match store::lock(&ctx.store) {
        Ok(mut users) => users.remove(username),
        Err(e) => return server_error(ctx, e),
    };

    if removed {
        info!("[{}] [{}] User deleted: {}", MODULE, ctx.qid, username);
        Response::html(HTTP_200, USER_DELETED_PAGE)
    } else {
        warn!("[{}] [{}] Failed to delete user: {} not found", MODULE, ctx.qid, username);
        Response::text(HTTP_404, USER_NOT_FOUND_MSG)
    }
}

pub fn handle_settings(ctx: &mut Context) -> Response {
    let page = format!(
        "<html><head><title>Server Settings</title></head><body>\
        <h1>Server Settings</h1>\
        <p>Current Port: {}</p>\
        <p>Max Connections: {}</p>\
        <a href='/'>Back to Home</a>\
        </body></html>",
        ctx.cfg.server.port, ctx.cfg.server.workers,
    );
    info!("[{}] [{}] Served Server Settings page", MODULE, ctx.qid);
    Response::html(HTTP_200, page)
}

pub fn handle_not_found(r: &Request, ctx: &mut Context) -> Response {
    warn!("[{}] [{}] Unhandled path: {} {}", MODULE, ctx.qid, r.method, r.path);
    Response::text(HTTP_404, NOT_FOUND_MSG)
}
