use crate::modules::{
    auth::SessionUser,
    error::RpcError,
    models::request::{ValidatedInput, ValidatedJson},
};
use axum::{extract::Extension, Json};
use chrono::Utc;
use studyhub_libs::{
    api::{
        CreateAssignmentInput, CreateStudySessionInput, RpcResponse, StudySessionStatsInput,
        SubmitQuizAttemptInput, UpdateAssignmentStatusInput,
    },
    models::{Assignment, QuizAttempt, SessionStats, StudySession},
    Store,
};

/// `studySessions.create`
pub async fn create_study_session<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<CreateStudySessionInput>,
) -> Result<Json<RpcResponse<StudySession>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let session = store.create_study_session(user, input.into()).await?;
    Ok(Json(RpcResponse::new(session)))
}

/// `studySessions.stats`
pub async fn study_session_stats<S>(
    SessionUser(user): SessionUser,
    ValidatedInput(input): ValidatedInput<StudySessionStatsInput>,
    Extension(store): Extension<S>,
) -> Result<Json<RpcResponse<SessionStats>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let stats = store
        .study_session_stats(user, input.since(Utc::now()))
        .await?;
    Ok(Json(RpcResponse::new(stats)))
}

/// `assignments.create`
pub async fn create_assignment<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<CreateAssignmentInput>,
) -> Result<Json<RpcResponse<Assignment>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let assignment = store.create_assignment(user, input.into()).await?;
    Ok(Json(RpcResponse::new(assignment)))
}

/// `assignments.updateStatus`
pub async fn update_assignment_status<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<UpdateAssignmentStatusInput>,
) -> Result<Json<RpcResponse<Assignment>>, RpcError>
where
    S: Store + Clone + 'static,
{
    match store
        .update_assignment_status(input.assignment_id, user, input.status)
        .await?
    {
        Some(assignment) => Ok(Json(RpcResponse::new(assignment))),
        None => Err(RpcError::NotFound(format!(
            "assignment {} not found",
            input.assignment_id
        ))),
    }
}

/// `quizzes.submitAttempt`
pub async fn submit_quiz_attempt<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<SubmitQuizAttemptInput>,
) -> Result<Json<RpcResponse<QuizAttempt>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let attempt = store
        .create_quiz_attempt(user, input.quiz_id, input.score)
        .await?;
    Ok(Json(RpcResponse::new(attempt)))
}
