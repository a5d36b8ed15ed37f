//! In-process LMS backend the pipeline tests run against
//!
//! Implements just enough of the real API contract (auth, courses,
//! enrollments, modules, quizzes, attempts, learning progress) with an
//! in-memory store. `MockOptions` switches individual behaviours off so
//! tests can check that the harness notices.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "your_admin_password";
pub const USER_EMAIL: &str = "testuser@example.com";
pub const USER_PASSWORD: &str = "TestPassword123";

const CORRECT_POINTS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Return the OTP from forgot-password, as development servers do
    pub expose_otp: bool,
    /// Added to every computed quiz score
    pub score_offset: f64,
    /// Refuse starts once a quiz's `maxAttempts` is used up
    pub enforce_max_attempts: bool,
    /// Include `correctAnswer` in learner quiz reads
    pub leak_answers: bool,
    /// Answer every DELETE with 500
    pub fail_deletes: bool,
    /// Answer starts past `maxAttempts` with 500 instead of 400
    pub crash_over_limit: bool,
    /// Refuse module completion even when the quiz was passed
    pub lock_modules: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            expose_otp: true,
            score_offset: 0.0,
            enforce_max_attempts: true,
            leak_answers: false,
            fail_deletes: false,
            crash_over_limit: false,
            lock_modules: false,
        }
    }
}

#[derive(Debug, Clone)]
struct User {
    id: String,
    email: String,
    password: String,
    is_admin: bool,
}

#[derive(Debug, Clone)]
struct Quiz {
    course: String,
    module: Option<String>,
    max_attempts: u32,
    passing_score: f64,
    required: bool,
}

#[derive(Debug, Clone)]
struct Question {
    quiz: String,
    text: String,
    correct: Value,
    order: u64,
}

#[derive(Debug, Clone)]
struct Attempt {
    quiz: String,
    user: String,
    submitted: bool,
    score: f64,
    passed: bool,
}

#[derive(Debug, Default)]
pub struct Db {
    options: MockOptions,
    next: u64,
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
    otps: HashMap<String, String>,
    reset_tokens: HashMap<String, String>,
    courses: HashMap<String, Value>,
    enrollments: HashMap<String, (String, String)>,
    progress: HashMap<(String, String), f64>,
    modules: HashMap<String, String>,
    lessons: HashMap<String, String>,
    quizzes: HashMap<String, Quiz>,
    questions: HashMap<String, Question>,
    attempts: HashMap<String, Attempt>,
    completed_modules: usize,
}

impl Db {
    fn seeded(options: MockOptions) -> Self {
        let mut db = Db {
            options,
            ..Db::default()
        };
        db.add_user(ADMIN_EMAIL, ADMIN_PASSWORD, true);
        db.add_user(USER_EMAIL, USER_PASSWORD, false);
        db
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}-{}", prefix, self.next)
    }

    fn add_user(&mut self, email: &str, password: &str, is_admin: bool) -> User {
        let user = User {
            id: self.id("user"),
            email: email.to_string(),
            password: password.to_string(),
            is_admin,
        };
        self.users.insert(email.to_string(), user.clone());
        user
    }

    fn issue_token(&mut self, email: &str) -> String {
        let token = self.id("tok");
        self.tokens.insert(token.clone(), email.to_string());
        token
    }

    fn caller(&self, headers: &HeaderMap) -> Result<User, Reply> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Access token required"))?;
        self.tokens
            .get(token)
            .and_then(|email| self.users.get(email))
            .cloned()
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }

    fn admin(&self, headers: &HeaderMap) -> Result<User, Reply> {
        let user = self.caller(headers)?;
        if user.is_admin {
            Ok(user)
        } else {
            Err(error(StatusCode::FORBIDDEN, "Admin access required"))
        }
    }

    fn enrolled(&self, user: &str, course: &str) -> bool {
        self.enrollments
            .values()
            .any(|(u, c)| u == user && c == course)
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn user_password(&self, email: &str) -> Option<String> {
        self.users.get(email).map(|u| u.password.clone())
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn completed_modules(&self) -> usize {
        self.completed_modules
    }
}

pub type Shared = Arc<Mutex<Db>>;
type Reply = (StatusCode, Json<Value>);

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

fn ok(body: Value) -> Reply {
    reply(StatusCode::OK, body)
}

fn error(status: StatusCode, message: &str) -> Reply {
    reply(status, json!({ "error": message }))
}

fn parse(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

macro_rules! guard {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(reply) => return reply,
        }
    };
}

pub struct MockLms {
    pub base_url: String,
    pub state: Shared,
}

impl MockLms {
    pub fn spawn(options: MockOptions) -> Self {
        let state: Shared = Arc::new(Mutex::new(Db::seeded(options)));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn db(&self) -> std::sync::MutexGuard<'_, Db> {
        self.state.lock().unwrap()
    }
}

fn router(state: Shared) -> Router {
    let api: Router<Shared> = Router::new()
        .route("/health", get(health))
        // auth
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/profile", put(profile))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/google", post(google))
        // courses
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/admin", get(admin_courses))
        .route(
            "/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        // enrollments
        .route("/enrollments", get(all_enrollments).post(create_enrollment))
        .route("/enrollments/my-enrollments", get(my_enrollments))
        .route(
            "/enrollments/:id",
            get(enrollment_by_course)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
        // progress
        .route("/progress/:id", get(get_progress).put(put_progress))
        // modules and lessons
        .route("/modules", post(create_module))
        .route("/modules/detail/:id", get(module_detail))
        .route("/modules/reorder/:id", put(reorder_modules))
        .route(
            "/modules/lessons/:id",
            put(update_lesson).delete(delete_lesson),
        )
        .route(
            "/modules/:id",
            get(course_modules).put(update_module).delete(delete_module),
        )
        .route("/modules/:id/lessons", get(module_lessons).post(create_lesson))
        // quizzes
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/course/:id", get(course_quizzes))
        .route("/quizzes/module/:id", get(module_quizzes))
        .route(
            "/quizzes/questions/:id",
            put(update_question).delete(delete_question),
        )
        .route("/quizzes/attempts/:id", get(get_attempt))
        .route(
            "/quizzes/:id",
            get(get_quiz).put(update_quiz).delete(delete_quiz),
        )
        .route("/quizzes/:id/questions", post(add_question))
        .route("/quizzes/:id/start", post(start_quiz))
        .route("/quizzes/:id/submit", post(submit_quiz))
        .route("/quizzes/:id/attempts", get(list_attempts))
        // learning progress
        .route("/learning-progress/:id", get(learning_overview))
        .route("/learning-progress/module/:id", put(module_progress))
        .route("/learning-progress/lesson/:id", put(lesson_progress))
        .route("/learning-progress/module/:id/complete", post(complete_module));

    Router::new().nest("/api", api).with_state(state)
}

async fn health() -> Reply {
    ok(json!({ "status": "OK", "timestamp": "now" }))
}

// ---------------------------------------------------------------------------
// auth

fn valid_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && domain.contains('.'))
}

async fn signup(State(s): State<Shared>, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();

    let (Some(email), Some(password)) = (text(&body, "email"), text(&body, "password")) else {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    };
    if !valid_email(&email) {
        return error(StatusCode::BAD_REQUEST, "Invalid email");
    }
    if password.len() < 6 {
        return error(StatusCode::BAD_REQUEST, "Password too short");
    }
    if db.users.contains_key(&email) {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }

    let user = db.add_user(&email, &password, false);
    let token = db.issue_token(&email);
    reply(
        StatusCode::CREATED,
        json!({ "token": token, "user": { "id": user.id, "email": user.email } }),
    )
}

async fn login(State(s): State<Shared>, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();

    let (Some(email), Some(password)) = (text(&body, "email"), text(&body, "password")) else {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    };
    let user = match db.users.get(&email) {
        Some(user) if user.password == password => user.clone(),
        _ => return error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    };
    let token = db.issue_token(&email);
    ok(json!({
        "token": token,
        "user": { "id": user.id, "email": user.email, "isAdmin": user.is_admin },
    }))
}

async fn me(State(s): State<Shared>, headers: HeaderMap) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    ok(json!({ "id": user.id, "email": user.email, "isAdmin": user.is_admin }))
}

async fn profile(State(s): State<Shared>, headers: HeaderMap) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    ok(json!({ "message": "Profile updated", "user": { "id": user.id } }))
}

async fn forgot_password(State(s): State<Shared>, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();

    let email = text(&body, "email").unwrap_or_default();
    if !valid_email(&email) {
        return error(StatusCode::BAD_REQUEST, "Invalid email");
    }
    if !db.users.contains_key(&email) {
        return ok(json!({ "message": "If the account exists, an OTP was sent" }));
    }

    let otp = format!("{:06}", 100_000 + db.next);
    db.otps.insert(email, otp.clone());
    if db.options.expose_otp {
        ok(json!({ "message": "OTP sent", "otp": otp }))
    } else {
        ok(json!({ "message": "OTP sent" }))
    }
}

async fn verify_otp(State(s): State<Shared>, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();

    let email = text(&body, "email").unwrap_or_default();
    let otp = text(&body, "otp").unwrap_or_default();
    if db.otps.get(&email) != Some(&otp) {
        return error(StatusCode::BAD_REQUEST, "Invalid or expired OTP");
    }
    let reset_token = db.id("reset");
    db.reset_tokens.insert(reset_token.clone(), email);
    ok(json!({ "message": "OTP verified", "resetToken": reset_token }))
}

async fn reset_password(State(s): State<Shared>, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();

    let token = text(&body, "token").unwrap_or_default();
    let Some(password) = text(&body, "newPassword") else {
        return error(StatusCode::BAD_REQUEST, "New password is required");
    };
    let Some(email) = db.reset_tokens.remove(&token) else {
        return error(StatusCode::BAD_REQUEST, "Invalid reset token");
    };
    if let Some(user) = db.users.get_mut(&email) {
        user.password = password;
    }
    ok(json!({ "message": "Password reset successful" }))
}

async fn google(body: Bytes) -> Reply {
    let body = parse(&body);
    if text(&body, "credential").is_none() {
        return error(StatusCode::BAD_REQUEST, "Credential is required");
    }
    error(StatusCode::UNAUTHORIZED, "Invalid Google credential")
}

// ---------------------------------------------------------------------------
// courses

async fn list_courses(State(s): State<Shared>) -> Reply {
    let db = s.lock().unwrap();
    ok(Value::Array(db.courses.values().cloned().collect()))
}

async fn admin_courses(State(s): State<Shared>, headers: HeaderMap) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    ok(Value::Array(db.courses.values().cloned().collect()))
}

async fn create_course(State(s): State<Shared>, headers: HeaderMap, body: Bytes) -> Reply {
    let mut body = parse(&body);
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));

    let id = db.id("course");
    if let Some(map) = body.as_object_mut() {
        map.insert("id".to_string(), json!(id));
    }
    db.courses.insert(id, body.clone());
    reply(StatusCode::CREATED, json!({ "course": body }))
}

async fn get_course(State(s): State<Shared>, Path(id): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    match db.courses.get(&id) {
        Some(course) => ok(course.clone()),
        None => error(StatusCode::NOT_FOUND, "Course not found"),
    }
}

async fn update_course(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Reply {
    let changes = parse(&body);
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));

    let Some(course) = db.courses.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Course not found");
    };
    if let (Some(target), Some(changes)) = (course.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    ok(json!({ "course": course.clone() }))
}

async fn delete_course(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    match db.courses.remove(&id) {
        Some(_) => ok(json!({ "message": "Course deleted" })),
        None => error(StatusCode::NOT_FOUND, "Course not found"),
    }
}

// ---------------------------------------------------------------------------
// enrollments

async fn all_enrollments(State(s): State<Shared>, headers: HeaderMap) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    ok(json!({ "enrollments": db.enrollments.len() }))
}

async fn create_enrollment(State(s): State<Shared>, headers: HeaderMap, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));

    let course = text(&body, "courseId").unwrap_or_default();
    if !db.courses.contains_key(&course) {
        return error(StatusCode::NOT_FOUND, "Course not found");
    }
    if db.enrolled(&user.id, &course) {
        return error(StatusCode::BAD_REQUEST, "Already enrolled");
    }
    let id = db.id("enrollment");
    db.enrollments.insert(id.clone(), (user.id, course.clone()));
    reply(StatusCode::CREATED, json!({ "id": id, "courseId": course }))
}

async fn my_enrollments(State(s): State<Shared>, headers: HeaderMap) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let items: Vec<Value> = db
        .enrollments
        .iter()
        .filter(|(_, (u, _))| *u == user.id)
        .map(|(id, (_, c))| json!({ "id": id, "courseId": c }))
        .collect();
    ok(Value::Array(items))
}

async fn enrollment_by_course(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(course): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    match db
        .enrollments
        .iter()
        .find(|(_, (u, c))| *u == user.id && *c == course)
    {
        Some((id, _)) => ok(json!({ "id": id, "courseId": course })),
        None => error(StatusCode::NOT_FOUND, "Enrollment not found"),
    }
}

async fn update_enrollment(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    match db.enrollments.get(&id) {
        Some((owner, _)) if *owner == user.id || user.is_admin => {
            ok(json!({ "message": "Enrollment updated" }))
        }
        Some(_) => error(StatusCode::FORBIDDEN, "Access denied"),
        None => error(StatusCode::NOT_FOUND, "Enrollment not found"),
    }
}

async fn delete_enrollment(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    let allowed = db
        .enrollments
        .get(&id)
        .map(|(owner, _)| *owner == user.id || user.is_admin);
    match allowed {
        Some(true) => {
            db.enrollments.remove(&id);
            ok(json!({ "message": "Enrollment deleted" }))
        }
        Some(false) => error(StatusCode::FORBIDDEN, "Access denied"),
        None => error(StatusCode::NOT_FOUND, "Enrollment not found"),
    }
}

// ---------------------------------------------------------------------------
// progress

async fn get_progress(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(course): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let pct = db
        .progress
        .get(&(user.id, course.clone()))
        .copied()
        .unwrap_or(0.0);
    ok(json!({ "courseId": course, "completionPercentage": pct }))
}

async fn put_progress(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(course): Path<String>,
    body: Bytes,
) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let pct = body
        .get("completionPercentage")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    db.progress.insert((user.id, course), pct);
    ok(json!({ "message": "Progress updated", "completionPercentage": pct }))
}

// ---------------------------------------------------------------------------
// modules and lessons

async fn create_module(State(s): State<Shared>, headers: HeaderMap, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));

    let course = text(&body, "courseId").unwrap_or_default();
    if !db.courses.contains_key(&course) {
        return error(StatusCode::NOT_FOUND, "Course not found");
    }
    let id = db.id("module");
    db.modules.insert(id.clone(), course.clone());
    reply(
        StatusCode::CREATED,
        json!({ "module": { "id": id, "courseId": course } }),
    )
}

async fn course_modules(State(s): State<Shared>, Path(course): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    let items: Vec<Value> = db
        .modules
        .iter()
        .filter(|(_, c)| **c == course)
        .map(|(id, c)| json!({ "id": id, "courseId": c }))
        .collect();
    ok(Value::Array(items))
}

async fn module_detail(State(s): State<Shared>, Path(id): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    match db.modules.get(&id) {
        Some(course) => ok(json!({ "id": id, "courseId": course, "lessons": [] })),
        None => error(StatusCode::NOT_FOUND, "Module not found"),
    }
}

async fn update_module(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.modules.contains_key(&id) {
        ok(json!({ "module": { "id": id } }))
    } else {
        error(StatusCode::NOT_FOUND, "Module not found")
    }
}

async fn delete_module(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    match db.modules.remove(&id) {
        Some(_) => ok(json!({ "message": "Module deleted" })),
        None => error(StatusCode::NOT_FOUND, "Module not found"),
    }
}

async fn reorder_modules(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(_course): Path<String>,
    body: Bytes,
) -> Reply {
    let body = parse(&body);
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if !body.get("moduleOrder").is_some_and(Value::is_array) {
        return error(StatusCode::BAD_REQUEST, "moduleOrder must be an array");
    }
    ok(json!({ "message": "Modules reordered successfully" }))
}

async fn create_lesson(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(module): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if !db.modules.contains_key(&module) {
        return error(StatusCode::NOT_FOUND, "Module not found");
    }
    let id = db.id("lesson");
    db.lessons.insert(id.clone(), module.clone());
    reply(
        StatusCode::CREATED,
        json!({ "lesson": { "id": id, "moduleId": module } }),
    )
}

async fn module_lessons(State(s): State<Shared>, Path(module): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    let items: Vec<Value> = db
        .lessons
        .iter()
        .filter(|(_, m)| **m == module)
        .map(|(id, m)| json!({ "id": id, "moduleId": m }))
        .collect();
    ok(Value::Array(items))
}

async fn update_lesson(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.lessons.contains_key(&id) {
        ok(json!({ "lesson": { "id": id } }))
    } else {
        error(StatusCode::NOT_FOUND, "Lesson not found")
    }
}

async fn delete_lesson(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    match db.lessons.remove(&id) {
        Some(_) => ok(json!({ "message": "Lesson deleted" })),
        None => error(StatusCode::NOT_FOUND, "Lesson not found"),
    }
}

// ---------------------------------------------------------------------------
// quizzes

async fn create_quiz(State(s): State<Shared>, headers: HeaderMap, body: Bytes) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));

    let course = text(&body, "courseId").unwrap_or_default();
    if !db.courses.contains_key(&course) {
        return error(StatusCode::NOT_FOUND, "Course not found");
    }
    let module = text(&body, "moduleId");
    if let Some(module) = &module {
        if db.modules.get(module) != Some(&course) {
            return error(StatusCode::BAD_REQUEST, "Module does not belong to course");
        }
    }

    let id = db.id("quiz");
    let quiz = Quiz {
        course: course.clone(),
        module: module.clone(),
        max_attempts: body
            .get("maxAttempts")
            .and_then(Value::as_u64)
            .unwrap_or(3) as u32,
        passing_score: body
            .get("passingScore")
            .and_then(Value::as_f64)
            .unwrap_or(70.0),
        required: body
            .get("isRequired")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };
    db.quizzes.insert(id.clone(), quiz);
    reply(
        StatusCode::CREATED,
        json!({ "quiz": { "id": id, "courseId": course, "moduleId": module } }),
    )
}

fn quiz_summaries(db: &Db, keep: impl Fn(&Quiz) -> bool) -> Value {
    Value::Array(
        db.quizzes
            .iter()
            .filter(|(_, q)| keep(q))
            .map(|(id, q)| json!({ "id": id, "courseId": q.course, "moduleId": q.module }))
            .collect(),
    )
}

async fn course_quizzes(State(s): State<Shared>, Path(course): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    ok(quiz_summaries(&db, |q| q.course == course))
}

async fn module_quizzes(State(s): State<Shared>, Path(module): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    ok(quiz_summaries(&db, |q| q.module.as_deref() == Some(module.as_str())))
}

async fn get_quiz(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let Some(quiz) = db.quizzes.get(&id) else {
        return error(StatusCode::NOT_FOUND, "Quiz not found");
    };

    let show_answers = user.is_admin || db.options.leak_answers;
    let mut questions: Vec<(&String, &Question)> =
        db.questions.iter().filter(|(_, q)| q.quiz == id).collect();
    questions.sort_by_key(|(_, q)| q.order);
    let questions: Vec<Value> = questions
        .into_iter()
        .map(|(qid, q)| {
            let mut value = json!({ "id": qid, "questionText": q.text });
            if show_answers {
                value["correctAnswer"] = q.correct.clone();
            }
            value
        })
        .collect();

    ok(json!({
        "id": id,
        "courseId": quiz.course,
        "moduleId": quiz.module,
        "maxAttempts": quiz.max_attempts,
        "passingScore": quiz.passing_score,
        "questions": questions,
    }))
}

async fn update_quiz(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.quizzes.contains_key(&id) {
        ok(json!({ "quiz": { "id": id } }))
    } else {
        error(StatusCode::NOT_FOUND, "Quiz not found")
    }
}

async fn delete_quiz(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    match db.quizzes.remove(&id) {
        Some(_) => ok(json!({ "message": "Quiz deleted successfully" })),
        None => error(StatusCode::NOT_FOUND, "Quiz not found"),
    }
}

async fn add_question(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(quiz): Path<String>,
    body: Bytes,
) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if !db.quizzes.contains_key(&quiz) {
        return error(StatusCode::NOT_FOUND, "Quiz not found");
    }
    let id = db.id("question");
    let question = Question {
        quiz,
        text: text(&body, "questionText").unwrap_or_default(),
        correct: body.get("correctAnswer").cloned().unwrap_or(Value::Null),
        order: db.next,
    };
    db.questions.insert(id.clone(), question);
    reply(StatusCode::CREATED, json!({ "question": { "id": id } }))
}

async fn update_question(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.questions.contains_key(&id) {
        ok(json!({ "question": { "id": id } }))
    } else {
        error(StatusCode::NOT_FOUND, "Question not found")
    }
}

async fn delete_question(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    guard!(db.admin(&headers));
    if db.options.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed");
    }
    match db.questions.remove(&id) {
        Some(_) => ok(json!({ "message": "Question deleted successfully" })),
        None => error(StatusCode::NOT_FOUND, "Question not found"),
    }
}

async fn start_quiz(State(s): State<Shared>, headers: HeaderMap, Path(quiz_id): Path<String>) -> Reply {
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let Some(quiz) = db.quizzes.get(&quiz_id).cloned() else {
        return error(StatusCode::NOT_FOUND, "Quiz not found");
    };
    if !db.enrolled(&user.id, &quiz.course) {
        return error(
            StatusCode::FORBIDDEN,
            "You must be enrolled in the course to take this quiz",
        );
    }

    let mine: Vec<(&String, &Attempt)> = db
        .attempts
        .iter()
        .filter(|(_, a)| a.quiz == quiz_id && a.user == user.id)
        .collect();
    if db.options.enforce_max_attempts && mine.len() >= quiz.max_attempts as usize {
        if db.options.crash_over_limit {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
        return error(StatusCode::BAD_REQUEST, "Maximum attempts reached for this quiz");
    }
    if let Some((id, _)) = mine.iter().find(|(_, a)| !a.submitted) {
        return ok(json!({
            "message": "Resuming existing attempt",
            "attempt": { "id": id, "status": "in_progress" },
        }));
    }

    let id = db.id("attempt");
    db.attempts.insert(
        id.clone(),
        Attempt {
            quiz: quiz_id,
            user: user.id,
            submitted: false,
            score: 0.0,
            passed: false,
        },
    );
    reply(
        StatusCode::CREATED,
        json!({ "message": "Quiz attempt started", "attempt": { "id": id, "status": "in_progress" } }),
    )
}

async fn submit_quiz(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(quiz_id): Path<String>,
    body: Bytes,
) -> Reply {
    let body = parse(&body);
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));

    let attempt_id = text(&body, "attemptId").unwrap_or_default();
    match db.attempts.get(&attempt_id) {
        Some(a) if a.user == user.id && a.quiz == quiz_id => {
            if a.submitted {
                return error(StatusCode::BAD_REQUEST, "This attempt has already been submitted");
            }
        }
        _ => return error(StatusCode::NOT_FOUND, "Attempt not found"),
    }
    let Some(quiz) = db.quizzes.get(&quiz_id).cloned() else {
        return error(StatusCode::NOT_FOUND, "Quiz not found");
    };

    let answers = body.get("answers").cloned().unwrap_or(Value::Null);
    let mut total = 0u32;
    let mut correct = 0u32;
    for (qid, question) in db.questions.iter().filter(|(_, q)| q.quiz == quiz_id) {
        total += 1;
        if answers.get(qid) == Some(&question.correct) {
            correct += 1;
        }
    }
    let max_points = f64::from(total) * CORRECT_POINTS;
    let base = if max_points > 0.0 {
        ((f64::from(correct) * CORRECT_POINTS / max_points) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };
    let score = base + db.options.score_offset;
    let passed = score >= quiz.passing_score;

    if let Some(attempt) = db.attempts.get_mut(&attempt_id) {
        attempt.submitted = true;
        attempt.score = score;
        attempt.passed = passed;
    }
    ok(json!({
        "attempt": { "id": attempt_id, "status": "completed" },
        "score": score,
        "passed": passed,
        "correctAnswers": correct,
        "totalQuestions": total,
    }))
}

async fn list_attempts(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(quiz_id): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    let items: Vec<Value> = db
        .attempts
        .iter()
        .filter(|(_, a)| a.quiz == quiz_id && a.user == user.id)
        .map(|(id, a)| json!({ "id": id, "score": a.score, "passed": a.passed }))
        .collect();
    ok(Value::Array(items))
}

async fn get_attempt(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    match db.attempts.get(&id) {
        Some(a) if a.user == user.id || user.is_admin => {
            ok(json!({ "id": id, "score": a.score, "passed": a.passed }))
        }
        Some(_) => error(StatusCode::FORBIDDEN, "Access denied"),
        None => error(StatusCode::NOT_FOUND, "Attempt not found"),
    }
}

// ---------------------------------------------------------------------------
// learning progress

async fn learning_overview(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(course): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    if !db.enrolled(&user.id, &course) {
        return error(StatusCode::FORBIDDEN, "You are not enrolled in this course");
    }
    ok(json!({ "courseId": course, "modules": [] }))
}

async fn module_progress(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(module): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.caller(&headers));
    if db.modules.contains_key(&module) {
        ok(json!({ "message": "Progress updated" }))
    } else {
        error(StatusCode::NOT_FOUND, "Module not found")
    }
}

async fn lesson_progress(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(lesson): Path<String>,
) -> Reply {
    let db = s.lock().unwrap();
    guard!(db.caller(&headers));
    if db.lessons.contains_key(&lesson) {
        ok(json!({ "message": "Lesson progress updated" }))
    } else {
        error(StatusCode::NOT_FOUND, "Lesson not found")
    }
}

async fn complete_module(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(module): Path<String>,
) -> Reply {
    let mut db = s.lock().unwrap();
    let user = guard!(db.caller(&headers));
    if !db.modules.contains_key(&module) {
        return error(StatusCode::NOT_FOUND, "Module not found");
    }
    if db.options.lock_modules {
        return error(StatusCode::BAD_REQUEST, "Module is locked");
    }

    let gated = db
        .quizzes
        .iter()
        .filter(|(_, q)| q.required && q.module.as_deref() == Some(module.as_str()));
    for (quiz_id, _) in gated {
        let passed = db
            .attempts
            .values()
            .any(|a| a.quiz == *quiz_id && a.user == user.id && a.passed);
        if !passed {
            return reply(
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "You must pass all required quizzes to complete this module",
                    "quizRequired": quiz_id,
                }),
            );
        }
    }
    db.completed_modules += 1;
    ok(json!({ "message": "Module marked as complete" }))
}
