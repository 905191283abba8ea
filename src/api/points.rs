/// points.* procedures
use crate::{
    context::AppContext,
    db::account::ActivityRecord,
    error::{LedgerError, LedgerResult},
    ledger::ActivityOutcome,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build points routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/xrpc/points.account.signUp", post(sign_up))
        .route("/xrpc/points.account.signIn", post(sign_in))
        .route("/xrpc/points.ledger.getPoints", post(get_points))
        .route("/xrpc/points.ledger.listActivities", post(list_activities))
        .route("/xrpc/points.ledger.addActivity", post(add_activity))
        .route("/xrpc/points.ledger.sendPoints", post(send_points))
        .route("/xrpc/points.ledger.spendPoints", post(spend_points))
}

/// Sign-up request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[validate(length(min = 1, message = "password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpReply {
    pub status: u16,
    pub error: String,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInReply {
    pub status: u16,
    pub error: String,
    pub access_token: String,
}

/// Balance lookup request (also used for activity history)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPointsRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPointsReply {
    pub status: u16,
    pub error: String,
    pub points: f64,
}

/// Activity as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: i64,
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub points: f64,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRecord> for ActivityView {
    fn from(record: ActivityRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            activity_type: record.activity_type,
            points: record.points,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListActivitiesReply {
    pub status: u16,
    pub error: String,
    pub activities: Vec<ActivityView>,
}

/// Activity grant request; `email` identifies the acting (admin) account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActivityRequest {
    pub email: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddActivityReply {
    pub message: String,
}

/// Transfer request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPointsRequest {
    pub sender_email: String,
    pub receiver_email: String,
    pub points: f64,
}

/// Reply shared by the balance-changing procedures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerReply {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Spend request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendPointsRequest {
    pub email: String,
    pub points: f64,
}

/// Unwrap a JSON body, turning a malformed one into the shared error reply
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> LedgerResult<T> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| LedgerError::Validation(rejection.body_text()))
}

/// Log a failed procedure before it is turned into a reply
fn log_failure(procedure: &'static str) -> impl Fn(LedgerError) -> LedgerError {
    move |e| {
        if !e.is_internal() {
            tracing::warn!(procedure, error = %e, "request rejected");
        }
        e
    }
}

/// Sign-up endpoint
async fn sign_up(
    State(ctx): State<AppContext>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> LedgerResult<(StatusCode, Json<SignUpReply>)> {
    let req = body(payload)?;
    req.validate()
        .map_err(|e| LedgerError::Validation(e.to_string()))?;

    ctx.points
        .sign_up(&req.email, &req.name, &req.role, &req.password)
        .await
        .map_err(log_failure("signUp"))?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpReply {
            status: StatusCode::CREATED.as_u16(),
            error: String::new(),
        }),
    ))
}

/// Sign-in endpoint
async fn sign_in(
    State(ctx): State<AppContext>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> LedgerResult<Json<SignInReply>> {
    let req = body(payload)?;

    let access_token = ctx
        .points
        .sign_in(&req.email, &req.password)
        .await
        .map_err(log_failure("signIn"))?;

    Ok(Json(SignInReply {
        status: StatusCode::OK.as_u16(),
        error: String::new(),
        access_token,
    }))
}

/// Balance endpoint
async fn get_points(
    State(ctx): State<AppContext>,
    payload: Result<Json<GetPointsRequest>, JsonRejection>,
) -> LedgerResult<Json<GetPointsReply>> {
    let req = body(payload)?;

    let points = ctx
        .points
        .get_points(&req.email)
        .await
        .map_err(log_failure("getPoints"))?;

    Ok(Json(GetPointsReply {
        status: StatusCode::OK.as_u16(),
        error: String::new(),
        points,
    }))
}

/// Activity history endpoint
async fn list_activities(
    State(ctx): State<AppContext>,
    payload: Result<Json<GetPointsRequest>, JsonRejection>,
) -> LedgerResult<Json<ListActivitiesReply>> {
    let req = body(payload)?;

    let records = ctx
        .points
        .list_activities(&req.email)
        .await
        .map_err(log_failure("listActivities"))?;

    Ok(Json(ListActivitiesReply {
        status: StatusCode::OK.as_u16(),
        error: String::new(),
        activities: records.into_iter().map(ActivityView::from).collect(),
    }))
}

/// Activity grant endpoint
///
/// Both a recorded activity and a non-admin rejection answer 200 with a message.
async fn add_activity(
    State(ctx): State<AppContext>,
    payload: Result<Json<AddActivityRequest>, JsonRejection>,
) -> LedgerResult<Json<AddActivityReply>> {
    let req = body(payload)?;

    let outcome = ctx
        .points
        .add_activity(&req.email, req.user_id, &req.activity_type, req.points)
        .await
        .map_err(log_failure("addActivity"))?;

    if let ActivityOutcome::Rejected(reason) = &outcome {
        tracing::info!(email = %req.email, reason = %reason, "activity rejected");
    }

    Ok(Json(AddActivityReply {
        message: outcome.message(),
    }))
}

/// Transfer endpoint
async fn send_points(
    State(ctx): State<AppContext>,
    payload: Result<Json<SendPointsRequest>, JsonRejection>,
) -> LedgerResult<Json<LedgerReply>> {
    let req = body(payload)?;

    ctx.points
        .send_points(&req.sender_email, &req.receiver_email, req.points)
        .await
        .map_err(log_failure("sendPoints"))?;

    Ok(Json(LedgerReply {
        status: StatusCode::OK.as_u16(),
        error: String::new(),
        message: "points sent successfully".to_string(),
    }))
}

/// Spend endpoint
async fn spend_points(
    State(ctx): State<AppContext>,
    payload: Result<Json<SpendPointsRequest>, JsonRejection>,
) -> LedgerResult<Json<LedgerReply>> {
    let req = body(payload)?;

    ctx.points
        .spend_points(&req.email, req.points)
        .await
        .map_err(log_failure("spendPoints"))?;

    Ok(Json(LedgerReply {
        status: StatusCode::OK.as_u16(),
        error: String::new(),
        message: "points spent successfully".to_string(),
    }))
}
