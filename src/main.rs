#[macro_use]
extern crate rocket;

mod auth;
mod config;
mod db;
mod errors;
mod guard;
mod models;
mod service;
mod store;
mod summary;

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use rocket::figment::Figment;
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::Redirect;
use rocket::{Build, Rocket, State};
use rocket_dyn_templates::Template;
use serde::Serialize;

use auth::Claims;
use config::AppConfig;
use db::DbPool;
use errors::LedgerError;
use guard::{DenyReason, RouteDecision};
use models::{
    Expense, ExpenseCategory, ExpenseKind, ExpensePatch, Income, IncomeKind, MonthlySummary,
    NewExpense, NewIncome,
};
use store::{RecordStore, UserRecords};

#[derive(FromForm)]
struct CredentialsForm {
    email: String,
    password: String,
    from: Option<String>,
}

#[derive(FromForm)]
struct IncomeForm {
    kind: IncomeKind,
    description: String,
    amount: String,
    date: Option<String>,
}

#[derive(FromForm)]
struct ExpenseForm {
    kind: ExpenseKind,
    category: ExpenseCategory,
    description: String,
    amount: String,
    date: Option<String>,
    paid: Option<bool>,
}

#[derive(FromForm)]
struct PaidForm {
    paid: bool,
    month: String,
}

#[derive(FromForm)]
struct ExpenseEditForm {
    kind: Option<ExpenseKind>,
    category: Option<ExpenseCategory>,
    description: Option<String>,
    amount: Option<String>,
    month: String,
}

#[derive(FromForm)]
struct MonthForm {
    month: String,
}

#[derive(FromForm)]
struct ChangePasswordForm {
    current_password: String,
    new_password: String,
    confirm_password: String,
}

#[derive(Serialize)]
struct IncomeView {
    id: i64,
    kind: &'static str,
    description: String,
    amount: String,
    date: String,
}

#[derive(Serialize)]
struct ExpenseView {
    id: i64,
    kind: &'static str,
    category: &'static str,
    description: String,
    amount: String,
    paid: bool,
    date: String,
}

#[derive(Serialize)]
struct SummaryView {
    month: String,
    total_income: String,
    total_expenses: String,
    total_paid_expenses: String,
    available: String,
    spent_percentage: String,
    overspent: bool,
}

fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    let whole = abs / 100;
    let frac = abs % 100;
    format!("{sign}{whole}.{frac:02}")
}

fn parse_amount_to_cents(input: &str) -> Option<i64> {
    let mut s = input.trim().to_string();
    if s.is_empty() {
        return None;
    }
    if s.starts_with('-') {
        return None;
    }
    s = s.replace(',', ".");
    let mut parts = s.split('.');
    let whole_str = parts.next()?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return None;
    }
    let whole: i64 = whole_str.parse().ok()?;
    let frac = match frac_str {
        None => 0,
        Some(frac) => {
            if frac.len() > 2 {
                return None;
            }
            let mut padded = frac.to_string();
            while padded.len() < 2 {
                padded.push('0');
            }
            padded.parse::<i64>().ok()?
        }
    };
    Some(whole * 100 + frac)
}

fn today_ymd() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate, Status> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(Local::now().date_naive()),
        Some(value) => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Status::BadRequest)
        }
    }
}

fn status_for(err: &LedgerError) -> Status {
    match err {
        LedgerError::NotFound { .. } => Status::NotFound,
        LedgerError::Unauthenticated => Status::Unauthorized,
        LedgerError::StoreRead(_) | LedgerError::StoreWrite(_) => Status::InternalServerError,
    }
}

fn login_redirect(from: &str, reason: DenyReason) -> Redirect {
    Redirect::to(uri!(login_page(from = Some(from), error = reason.query_error())))
}

/// Runs the session guard for a protected handler. Handlers that need a
/// user treat an unprotected-path decision (operator removed the prefix
/// from the configured set) the same as a missing session.
async fn require_user(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    path: &str,
) -> Result<Claims, Redirect> {
    let token = cookies
        .get(auth::SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());
    match guard::decide(pool, &config.protected_paths, path, token.as_deref()).await {
        RouteDecision::Allowed(Some(claims)) => Ok(claims),
        RouteDecision::Allowed(None) => Err(login_redirect(path, DenyReason::NoSession)),
        RouteDecision::Denied(reason) => Err(login_redirect(path, reason)),
    }
}

async fn current_claims(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Option<Claims> {
    let token = cookies.get(auth::SESSION_COOKIE)?.value().to_string();
    auth::verify_session_token(pool, &token).await.ok()
}

fn set_session_cookie(cookies: &CookieJar<'_>, token: String) {
    let mut cookie = Cookie::new(auth::SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
}

fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove(Cookie::build(auth::SESSION_COOKIE).path("/"));
}

/// `from` is only honored when it points back into the protected area;
/// anything else lands on the dashboard.
fn post_login_target(from: Option<&str>, config: &AppConfig) -> Redirect {
    match from {
        Some(path) if config.protected_paths.is_protected(path) => Redirect::to(path.to_string()),
        _ => Redirect::to(uri!(dashboard(month = Option::<&str>::None))),
    }
}

fn render_login(from: Option<&str>, error: Option<&str>, message: Option<&str>) -> Template {
    let message = message.map(str::to_string).or_else(|| {
        (error == Some("auth")).then(|| "Your session expired. Please sign in again.".to_string())
    });
    Template::render(
        "login",
        serde_json::json!({
            "from": from,
            "message": message,
        }),
    )
}

fn render_signup(message: Option<&str>) -> Template {
    Template::render(
        "signup",
        serde_json::json!({
            "message": message,
        }),
    )
}

fn render_settings(
    email: &str,
    sessions: i64,
    error: Option<&str>,
    notice: Option<&str>,
) -> Template {
    Template::render(
        "settings",
        serde_json::json!({
            "email": email,
            "active_sessions": sessions,
            "error": error,
            "notice": notice,
        }),
    )
}

async fn available_months(records: &UserRecords, selected: &str) -> Vec<String> {
    let mut set = BTreeSet::new();
    for month in records.months(24).await.unwrap_or_default() {
        set.insert(month);
    }
    set.insert(summary::current_month());
    set.insert(selected.to_string());
    set.into_iter().rev().collect()
}

fn empty_month(month: &str) -> service::MonthData {
    service::MonthData {
        incomes: Vec::new(),
        expenses: Vec::new(),
        summary: MonthlySummary {
            month: month.to_string(),
            total_income_cents: 0,
            total_expenses_cents: 0,
            total_paid_expenses_cents: 0,
            available_cents: 0,
            spent_percentage: 0.0,
        },
    }
}

#[get("/")]
fn index() -> Redirect {
    Redirect::to(uri!(dashboard(month = Option::<&str>::None)))
}

#[get("/login?<from>&<error>")]
async fn login_page(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    from: Option<String>,
    error: Option<String>,
) -> Result<Template, Redirect> {
    if current_claims(pool, cookies).await.is_some() {
        return Err(Redirect::to(uri!(dashboard(month = Option::<&str>::None))));
    }
    Ok(render_login(from.as_deref(), error.as_deref(), None))
}

#[post("/login", data = "<form>")]
async fn login_post(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<CredentialsForm>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    match auth::sign_in(pool, &form.email, &form.password, config.session_ttl_days).await {
        Ok((principal, token)) => {
            info!("user {} signed in", principal.user_id);
            set_session_cookie(cookies, token);
            Ok(post_login_target(form.from.as_deref(), config))
        }
        Err(err) => Err(render_login(
            form.from.as_deref(),
            None,
            Some(&err.to_string()),
        )),
    }
}

#[get("/signup")]
async fn signup_page(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Template, Redirect> {
    if current_claims(pool, cookies).await.is_some() {
        return Err(Redirect::to(uri!(dashboard(month = Option::<&str>::None))));
    }
    Ok(render_signup(None))
}

#[post("/signup", data = "<form>")]
async fn signup_post(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<CredentialsForm>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    match auth::sign_up(pool, &form.email, &form.password, config.session_ttl_days).await {
        Ok((principal, token)) => {
            info!("registered user {}", principal.user_id);
            set_session_cookie(cookies, token);
            Ok(Redirect::to(uri!(dashboard(month = Option::<&str>::None))))
        }
        Err(err) => Err(render_signup(Some(&err.to_string()))),
    }
}

#[get("/logout")]
async fn logout(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Redirect {
    if let Some(cookie) = cookies.get(auth::SESSION_COOKIE) {
        if let Err(err) = auth::sign_out(pool, cookie.value()).await {
            warn!("sign-out failed: {err}");
        }
    }
    clear_session_cookie(cookies);
    Redirect::to(uri!(login_page(
        from = Option::<&str>::None,
        error = Option::<&str>::None
    )))
}

#[get("/dashboard?<month>")]
async fn dashboard(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
) -> Result<Template, Redirect> {
    let user = require_user(pool, config, cookies, "/dashboard").await?;
    let selected = summary::selected_month(month);
    let records = store.for_user(user.user_id);

    let (data, error) = match service::month_data(store, Some(user.user_id), &selected).await {
        Ok(data) => (data, None),
        Err(err) => {
            warn!("dashboard load failed for user {}: {err}", user.user_id);
            (
                empty_month(&selected),
                Some("Could not load this month's records."),
            )
        }
    };
    let months = available_months(&records, &selected).await;

    let context = serde_json::json!({
        "month": selected,
        "month_label": summary::month_label(&selected),
        "months": months,
        "email": user.email,
        "summary": summary_view(&data.summary),
        "incomes": data.incomes.into_iter().map(income_view).collect::<Vec<_>>(),
        "expenses": data.expenses.into_iter().map(expense_view).collect::<Vec<_>>(),
        "categories": ExpenseCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "today": today_ymd(),
        "error": error,
    });
    Ok(Template::render("dashboard", &context))
}

#[post("/dashboard/incomes", data = "<form>")]
async fn add_income(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<IncomeForm>,
) -> Result<Redirect, Status> {
    let user = match require_user(pool, config, cookies, "/dashboard/incomes").await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let amount_cents = parse_amount_to_cents(&form.amount).ok_or(Status::BadRequest)?;
    let description = form.description.trim().to_string();
    if description.is_empty() {
        return Err(Status::BadRequest);
    }
    let date = parse_date(form.date.as_deref())?;

    let draft = NewIncome {
        kind: form.kind,
        description,
        amount_cents,
        date,
    };
    let data = service::record_income(store, Some(user.user_id), draft)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Redirect::to(uri!(dashboard(month = Some(data.summary.month)))))
}

#[post("/dashboard/expenses", data = "<form>")]
async fn add_expense(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<ExpenseForm>,
) -> Result<Redirect, Status> {
    let user = match require_user(pool, config, cookies, "/dashboard/expenses").await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let amount_cents = parse_amount_to_cents(&form.amount).ok_or(Status::BadRequest)?;
    let description = form.description.trim().to_string();
    if description.is_empty() {
        return Err(Status::BadRequest);
    }
    let date = parse_date(form.date.as_deref())?;

    let draft = NewExpense {
        kind: form.kind,
        category: form.category,
        description,
        amount_cents,
        paid: form.paid.unwrap_or(false),
        date,
    };
    let data = service::record_expense(store, Some(user.user_id), draft)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Redirect::to(uri!(dashboard(month = Some(data.summary.month)))))
}

#[post("/dashboard/expenses/<id>/paid", data = "<form>")]
async fn toggle_expense_paid(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<PaidForm>,
) -> Result<Redirect, Status> {
    let user = match require_user(pool, config, cookies, "/dashboard/expenses").await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let data = service::set_expense_paid(store, Some(user.user_id), id, form.paid, &form.month)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Redirect::to(uri!(dashboard(month = Some(data.summary.month)))))
}

#[post("/dashboard/expenses/<id>/edit", data = "<form>")]
async fn edit_expense(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<ExpenseEditForm>,
) -> Result<Redirect, Status> {
    let user = match require_user(pool, config, cookies, "/dashboard/expenses").await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let amount_cents = match form.amount.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(raw) => Some(parse_amount_to_cents(raw).ok_or(Status::BadRequest)?),
        None => None,
    };
    let patch = ExpensePatch {
        kind: form.kind,
        category: form.category,
        description: form
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        amount_cents,
    };
    let data = service::edit_expense(store, Some(user.user_id), id, patch, &form.month)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Redirect::to(uri!(dashboard(month = Some(data.summary.month)))))
}

#[post("/dashboard/expenses/<id>/delete", data = "<form>")]
async fn delete_expense(
    pool: &State<DbPool>,
    store: &State<RecordStore>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<MonthForm>,
) -> Result<Redirect, Status> {
    let user = match require_user(pool, config, cookies, "/dashboard/expenses").await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let data = service::remove_expense(store, Some(user.user_id), id, &form.month)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Redirect::to(uri!(dashboard(month = Some(data.summary.month)))))
}

#[get("/settings")]
async fn settings(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
) -> Result<Template, Redirect> {
    let user = require_user(pool, config, cookies, "/settings").await?;
    let sessions = auth::session_count(pool, user.user_id).await.unwrap_or(1);
    Ok(render_settings(&user.email, sessions, None, None))
}

#[post("/settings/password", data = "<form>")]
async fn settings_password(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<ChangePasswordForm>,
) -> Result<Template, Redirect> {
    let user = require_user(pool, config, cookies, "/settings/password").await?;
    let sessions = auth::session_count(pool, user.user_id).await.unwrap_or(1);
    let form = form.into_inner();

    if form.new_password != form.confirm_password {
        return Ok(render_settings(
            &user.email,
            sessions,
            Some("Passwords do not match"),
            None,
        ));
    }
    match auth::change_password(pool, &user.email, &form.current_password, &form.new_password).await
    {
        Ok(()) => Ok(render_settings(
            &user.email,
            sessions,
            None,
            Some("Password updated"),
        )),
        Err(err) => Ok(render_settings(
            &user.email,
            sessions,
            Some(&err.to_string()),
            None,
        )),
    }
}

#[post("/settings/logout_all")]
async fn settings_logout_all(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
) -> Redirect {
    if let Ok(user) = require_user(pool, config, cookies, "/settings/logout_all").await {
        if let Err(err) = auth::sign_out_all(pool, user.user_id).await {
            warn!("revoking sessions failed: {err}");
        }
    }
    clear_session_cookie(cookies);
    Redirect::to(uri!(login_page(
        from = Option::<&str>::None,
        error = Option::<&str>::None
    )))
}

fn income_view(record: Income) -> IncomeView {
    IncomeView {
        id: record.id,
        kind: record.kind.as_str(),
        description: record.description,
        amount: format_money(record.amount_cents),
        date: record.date.format("%Y-%m-%d").to_string(),
    }
}

fn expense_view(record: Expense) -> ExpenseView {
    ExpenseView {
        id: record.id,
        kind: record.kind.as_str(),
        category: record.category.as_str(),
        description: record.description,
        amount: format_money(record.amount_cents),
        paid: record.paid,
        date: record.date.format("%Y-%m-%d").to_string(),
    }
}

fn summary_view(summary: &MonthlySummary) -> SummaryView {
    SummaryView {
        month: summary.month.clone(),
        total_income: format_money(summary.total_income_cents),
        total_expenses: format_money(summary.total_expenses_cents),
        total_paid_expenses: format_money(summary.total_paid_expenses_cents),
        available: format_money(summary.available_cents),
        spent_percentage: format!("{:.1}", summary.spent_percentage),
        overspent: summary.available_cents < 0,
    }
}

fn build_rocket(figment: Figment) -> Rocket<Build> {
    let config: AppConfig = figment
        .extract_inner(config::CONFIG_KEY)
        .unwrap_or_default();
    if let Some(dir) = config.db_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).expect("create data directory");
        }
    }
    let pool = db::init_db(&config.db_path);
    let store = RecordStore::new(pool.clone());

    rocket::custom(figment)
        .manage(pool)
        .manage(store)
        .manage(config)
        .mount(
            "/",
            routes![
                index,
                login_page,
                login_post,
                signup_page,
                signup_post,
                logout,
                dashboard,
                add_income,
                add_expense,
                toggle_expense_paid,
                edit_expense,
                delete_expense,
                settings,
                settings_password,
                settings_logout_all
            ],
        )
        .attach(Template::fairing())
}

#[launch]
fn rocket() -> _ {
    build_rocket(rocket::Config::figment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::ContentType;
    use rocket::local::blocking::Client;
    use tempfile::TempDir;

    fn test_client() -> (Client, TempDir) {
        let dir = TempDir::new().unwrap();
        let figment = rocket::Config::figment().merge((
            "alcancia.db_path",
            dir.path().join("test.sqlite").display().to_string(),
        ));
        let client = Client::tracked(build_rocket(figment)).expect("valid rocket");
        (client, dir)
    }

    fn register(client: &Client) {
        let response = client
            .post("/signup")
            .header(ContentType::Form)
            .body("email=user%40example.com&password=hunter22")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
    }

    #[test]
    fn protected_path_without_session_redirects_with_from() {
        let (client, _dir) = test_client();
        let response = client.get("/dashboard").dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let location = response.headers().get_one("Location").unwrap();
        assert!(location.starts_with("/login"), "got {location}");
        assert!(location.contains("from="), "got {location}");
        assert!(location.contains("dashboard"), "got {location}");
        assert!(!location.contains("error="), "got {location}");
    }

    #[test]
    fn protected_path_with_bad_session_redirects_with_error() {
        let (client, _dir) = test_client();
        let response = client
            .get("/dashboard")
            .cookie(Cookie::new(auth::SESSION_COOKIE, "stale-token"))
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let location = response.headers().get_one("Location").unwrap();
        assert!(location.starts_with("/login"), "got {location}");
        assert!(location.contains("error=auth"), "got {location}");
        assert!(location.contains("from="), "got {location}");
    }

    #[test]
    fn public_paths_need_no_session() {
        let (client, _dir) = test_client();
        assert_eq!(client.get("/login").dispatch().status(), Status::Ok);
        assert_eq!(client.get("/signup").dispatch().status(), Status::Ok);
    }

    #[test]
    fn signup_opens_a_session() {
        let (client, _dir) = test_client();
        register(&client);

        let response = client.get("/dashboard").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().unwrap();
        assert!(body.contains("user@example.com"));
        assert!(body.contains("0.00"));
    }

    #[test]
    fn login_honors_protected_from_target() {
        let (client, _dir) = test_client();
        register(&client);
        client.get("/logout").dispatch();

        let response = client
            .post("/login")
            .header(ContentType::Form)
            .body("email=user%40example.com&password=hunter22&from=%2Fdashboard")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(
            response.headers().get_one("Location").unwrap(),
            "/dashboard"
        );
    }

    #[test]
    fn login_ignores_foreign_from_target() {
        let (client, _dir) = test_client();
        register(&client);
        client.get("/logout").dispatch();

        let response = client
            .post("/login")
            .header(ContentType::Form)
            .body("email=user%40example.com&password=hunter22&from=https%3A%2F%2Fevil.example")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(
            response.headers().get_one("Location").unwrap(),
            "/dashboard"
        );
    }

    #[test]
    fn bad_credentials_rerender_login() {
        let (client, _dir) = test_client();
        register(&client);
        client.get("/logout").dispatch();

        let response = client
            .post("/login")
            .header(ContentType::Form)
            .body("email=user%40example.com&password=wrong-password")
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().unwrap();
        assert!(body.contains("invalid email or password"));
    }

    #[test]
    fn logout_revokes_the_session() {
        let (client, _dir) = test_client();
        register(&client);

        let response = client.get("/logout").dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let response = client.get("/dashboard").dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        let location = response.headers().get_one("Location").unwrap();
        assert!(location.starts_with("/login"));
    }

    #[test]
    fn expense_lifecycle_through_routes() {
        let (client, _dir) = test_client();
        register(&client);

        let response = client
            .post("/dashboard/expenses")
            .header(ContentType::Form)
            .body("kind=fixed&category=Housing&description=rent&amount=1500.50&date=2024-01-20")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        let location = response.headers().get_one("Location").unwrap().to_string();
        assert!(location.contains("month=2024-01"), "got {location}");

        let body = client
            .get("/dashboard?month=2024-01")
            .dispatch()
            .into_string()
            .unwrap();
        assert!(body.contains("rent"));
        assert!(body.contains("1500.50"));

        // The row id is 1 in a fresh database.
        let response = client
            .post("/dashboard/expenses/1/paid")
            .header(ContentType::Form)
            .body("paid=true&month=2024-01")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        // Deleting twice succeeds both times.
        for _ in 0..2 {
            let response = client
                .post("/dashboard/expenses/1/delete")
                .header(ContentType::Form)
                .body("month=2024-01")
                .dispatch();
            assert_eq!(response.status(), Status::SeeOther);
        }

        let body = client
            .get("/dashboard?month=2024-01")
            .dispatch()
            .into_string()
            .unwrap();
        assert!(!body.contains("rent"));
    }

    #[test]
    fn expense_edit_patches_named_fields() {
        let (client, _dir) = test_client();
        register(&client);

        client
            .post("/dashboard/expenses")
            .header(ContentType::Form)
            .body("kind=variable&category=Food&description=groceries&amount=400&date=2024-02-10")
            .dispatch();

        let response = client
            .post("/dashboard/expenses/1/edit")
            .header(ContentType::Form)
            .body("amount=550.25&category=Others&month=2024-02")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let body = client
            .get("/dashboard?month=2024-02")
            .dispatch()
            .into_string()
            .unwrap();
        assert!(body.contains("groceries"));
        assert!(body.contains("550.25"));
        assert!(!body.contains("400.00"));
    }

    #[test]
    fn income_post_updates_summary() {
        let (client, _dir) = test_client();
        register(&client);

        let response = client
            .post("/dashboard/incomes")
            .header(ContentType::Form)
            .body("kind=salary&description=january+pay&amount=8000&date=2024-01-05")
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let body = client
            .get("/dashboard?month=2024-01")
            .dispatch()
            .into_string()
            .unwrap();
        assert!(body.contains("january pay"));
        assert!(body.contains("8000.00"));
    }

    #[test]
    fn malformed_amount_is_rejected() {
        let (client, _dir) = test_client();
        register(&client);

        let response = client
            .post("/dashboard/expenses")
            .header(ContentType::Form)
            .body("kind=fixed&category=Housing&description=rent&amount=-15&date=2024-01-20")
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn settings_requires_and_uses_session() {
        let (client, _dir) = test_client();
        assert_eq!(client.get("/settings").dispatch().status(), Status::SeeOther);

        register(&client);
        let response = client.get("/settings").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().unwrap().contains("user@example.com"));
    }

    #[test]
    fn parse_amount_accepts_common_shapes() {
        assert_eq!(parse_amount_to_cents("1500.50"), Some(150_050));
        assert_eq!(parse_amount_to_cents("1500,5"), Some(150_050));
        assert_eq!(parse_amount_to_cents("8000"), Some(800_000));
        assert_eq!(parse_amount_to_cents(""), None);
        assert_eq!(parse_amount_to_cents("-15"), None);
        assert_eq!(parse_amount_to_cents("1.2.3"), None);
        assert_eq!(parse_amount_to_cents("1.234"), None);
    }

    #[test]
    fn format_money_renders_cents() {
        assert_eq!(format_money(150_050), "1500.50");
        assert_eq!(format_money(-5_000), "-50.00");
        assert_eq!(format_money(0), "0.00");
    }
}
