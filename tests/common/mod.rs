//! In-process stand-in for the TaskForge REST API.
//!
//! Serves the endpoints the client consumes from in-memory state and counts
//! every request so tests can tell cache hits from network calls.

#![allow(dead_code)]

use actix_web::{get, http::header, patch, post, web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskforge_client::config::Config;
use taskforge_client::models::{Notification, Task, TaskInput, TaskStatus, TaskUpdate, User};
use taskforge_client::storage::FileStorage;
use taskforge_client::AppContext;
use tempfile::TempDir;

pub const PASSWORD: &str = "password123";
pub const ALICE: &str = "alice@example.com";
pub const BOB: &str = "bob@example.com";
pub const SEEDED_TASKS: usize = 24;

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct Registration {
    username: String,
    email: String,
}

pub struct StubState {
    pub users: Mutex<Vec<User>>,
    pub tasks: Mutex<Vec<Task>>,
    pub notifications: Mutex<Vec<Notification>>,
    /// The only bearer credential the stub accepts.
    pub token: Mutex<String>,
    /// Lifetime in seconds of newly issued tokens. Negative issues expired ones.
    pub token_lifetime: Mutex<i64>,
    /// Answer task requests with 503.
    pub unavailable: Mutex<bool>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StubState {
    fn seeded() -> Self {
        let users = vec![
            User {
                id: "u1".into(),
                username: "alice".into(),
                email: ALICE.into(),
                profile_picture: None,
                is_verified: true,
            },
            User {
                id: "u2".into(),
                username: "bob".into(),
                email: BOB.into(),
                profile_picture: None,
                is_verified: false,
            },
        ];
        let tasks = (1..=SEEDED_TASKS)
            .map(|n| Task {
                id: n.to_string(),
                name: format!("Task {}", n),
                description: format!("Seeded task number {}", n),
                status: TaskStatus::ALL[n % TaskStatus::ALL.len()],
                assigned_to: Some(if n % 2 == 0 { ALICE } else { BOB }.to_string()),
                assigned_by: Some(ALICE.to_string()),
                executed_by_self: n % 6 == 0,
            })
            .collect();
        let notifications = (1..=3)
            .map(|n| Notification {
                id: format!("n{}", n),
                message: format!("Task {} was assigned to you", n * 2),
                task_id: Some((n * 2).to_string()),
                read: n == 1,
                created_at: Utc.with_ymd_and_hms(2024, 5, n, 9, 0, 0).single(),
            })
            .collect();

        Self {
            users: Mutex::new(users),
            tasks: Mutex::new(tasks),
            notifications: Mutex::new(notifications),
            token: Mutex::new(String::new()),
            token_lifetime: Mutex::new(3600),
            unavailable: Mutex::new(false),
            hits: Mutex::new(HashMap::new()),
        }
    }

    fn hit(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_insert(0) += 1;
    }

    /// How often `route` (e.g. `"GET /tasks"`) was requested.
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    /// Makes the currently issued token invalid.
    pub fn revoke_token(&self) {
        *self.token.lock().unwrap() = "revoked".into();
    }

    fn issue_token(&self, user: &User) -> String {
        let exp = Utc::now().timestamp() + *self.token_lifetime.lock().unwrap();
        let token = encode(
            &Header::default(),
            &Claims {
                sub: user.id.clone(),
                exp,
            },
            &EncodingKey::from_secret("stub-secret".as_bytes()),
        )
        .unwrap();
        *self.token.lock().unwrap() = token.clone();
        token
    }

    fn available(&self) -> Result<(), HttpResponse> {
        if *self.unavailable.lock().unwrap() {
            return Err(
                HttpResponse::ServiceUnavailable().json(json!({ "message": "Try again later" }))
            );
        }
        Ok(())
    }

    fn authorize(&self, req: &HttpRequest) -> Result<(), HttpResponse> {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match bearer {
            Some(token) if token == self.token.lock().unwrap().as_str() => Ok(()),
            Some(_) => Err(HttpResponse::Unauthorized().json(json!({ "message": "Invalid token" }))),
            None => Err(HttpResponse::Unauthorized().json(json!({ "message": "Missing token" }))),
        }
    }
}

type State = web::Data<StubState>;

#[post("/auth/login")]
async fn login(state: State, body: web::Json<Credentials>) -> HttpResponse {
    state.hit("POST /auth/login");
    let user = state
        .users
        .lock()
        .unwrap()
        .iter()
        .find(|u| u.email == body.email)
        .cloned();
    match user {
        Some(user) if body.password == PASSWORD => {
            let token = state.issue_token(&user);
            HttpResponse::Ok().json(json!({ "token": token, "user": user }))
        }
        _ => HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" })),
    }
}

#[post("/auth/register")]
async fn register(state: State, body: web::Json<Registration>) -> HttpResponse {
    state.hit("POST /auth/register");
    let mut users = state.users.lock().unwrap();
    if users.iter().any(|u| u.email == body.email) {
        return HttpResponse::Conflict().json(json!({ "message": "Email already registered" }));
    }
    let id = format!("u{}", users.len() + 1);
    users.push(User {
        id,
        username: body.username.clone(),
        email: body.email.clone(),
        profile_picture: None,
        is_verified: false,
    });
    HttpResponse::Created().json(json!({ "message": "User registered successfully" }))
}

#[get("/auth/me")]
async fn me(state: State, req: HttpRequest) -> HttpResponse {
    state.hit("GET /auth/me");
    if let Err(resp) = state.authorize(&req) {
        return resp;
    }
    let users = state.users.lock().unwrap();
    HttpResponse::Ok().json(&users[0])
}

#[get("/auth/users")]
async fn list_users(state: State, req: HttpRequest) -> HttpResponse {
    state.hit("GET /auth/users");
    if let Err(resp) = state.authorize(&req) {
        return resp;
    }
    HttpResponse::Ok().json(&*state.users.lock().unwrap())
}

#[get("/tasks")]
async fn list_tasks(state: State, req: HttpRequest) -> HttpResponse {
    state.hit("GET /tasks");
    if let Err(resp) = state.available().and_then(|_| state.authorize(&req)) {
        return resp;
    }
    HttpResponse::Ok().json(&*state.tasks.lock().unwrap())
}

#[get("/tasks/{id}")]
async fn get_task(state: State, req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    state.hit("GET /tasks/:id");
    if let Err(resp) = state.authorize(&req) {
        return resp;
    }
    match state.tasks.lock().unwrap().iter().find(|t| t.id == *id) {
        Some(task) => HttpResponse::Ok().json(task),
        None => HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
    }
}

#[post("/tasks")]
async fn create_task(state: State, req: HttpRequest, body: web::Json<TaskInput>) -> HttpResponse {
    state.hit("POST /tasks");
    if let Err(resp) = state.available().and_then(|_| state.authorize(&req)) {
        return resp;
    }
    let input = body.into_inner();
    let mut tasks = state.tasks.lock().unwrap();
    let task = Task {
        id: (tasks.len() + 1).to_string(),
        name: input.name,
        description: input.description,
        status: TaskStatus::Pending,
        assigned_to: input.assigned_to,
        assigned_by: Some(ALICE.to_string()),
        executed_by_self: input.executed_by_self,
    };
    tasks.push(task.clone());
    HttpResponse::Created().json(task)
}

#[patch("/tasks/{id}")]
async fn update_task(
    state: State,
    req: HttpRequest,
    id: web::Path<String>,
    body: web::Json<TaskUpdate>,
) -> HttpResponse {
    state.hit("PATCH /tasks/:id");
    if let Err(resp) = state.available().and_then(|_| state.authorize(&req)) {
        return resp;
    }
    let update = body.into_inner();
    let mut tasks = state.tasks.lock().unwrap();
    let Some(task) = tasks.iter_mut().find(|t| t.id == *id) else {
        return HttpResponse::NotFound().json(json!({ "message": "Task not found" }));
    };
    if let Some(name) = update.name {
        task.name = name;
    }
    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(status) = update.status {
        task.status = status;
    }
    if let Some(assigned_to) = update.assigned_to {
        task.assigned_to = Some(assigned_to);
    }
    HttpResponse::Ok().json(task.clone())
}

#[get("/notifications/{email}")]
async fn list_notifications(
    state: State,
    req: HttpRequest,
    email: web::Path<String>,
) -> HttpResponse {
    state.hit("GET /notifications/:email");
    if let Err(resp) = state.authorize(&req) {
        return resp;
    }
    if email.as_str() != ALICE {
        return HttpResponse::Ok().json(Vec::<Notification>::new());
    }
    HttpResponse::Ok().json(&*state.notifications.lock().unwrap())
}

pub struct StubApi {
    pub state: web::Data<StubState>,
    pub base_url: String,
    server: actix_rt::task::JoinHandle<std::io::Result<()>>,
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Starts the stub on a random local port.
pub fn start_stub() -> StubApi {
    let state = web::Data::new(StubState::seeded());
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new().app_data(server_state.clone()).service(
            web::scope("/api")
                .service(login)
                .service(register)
                .service(me)
                .service(list_users)
                .service(list_tasks)
                .service(get_task)
                .service(create_task)
                .service(update_task)
                .service(list_notifications),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();

    StubApi {
        state,
        base_url: format!("http://127.0.0.1:{}/api", port),
        server: actix_rt::spawn(server),
    }
}

/// Test configuration: no retries, generous staleness.
pub fn config(api: &StubApi, dir: &TempDir) -> Config {
    let mut config = Config::new(api.base_url.clone(), dir.path());
    config.query_retries = 0;
    config.stale_time = Duration::from_secs(300);
    config
}

/// A fresh context over file storage in `dir`, as after a reload.
pub fn context(api: &StubApi, dir: &TempDir) -> Arc<AppContext> {
    context_with(config(api, dir))
}

pub fn context_with(config: Config) -> Arc<AppContext> {
    let storage = FileStorage::open(&config.storage_dir).expect("Failed to open storage");
    AppContext::new(config, Arc::new(storage)).expect("Failed to build context")
}
