use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::checklist::ChecklistTab;
use super::domain::{AdmissionType, CandidateSnapshot, PropositionId, TrainingSnapshot};
use super::history::HistoryStore;
use super::listing::{run_query, ListingQuery};
use super::notification::NotificationPublisher;
use super::repository::{AdmissionRepository, TaskQueue};
use super::service::{AdmissionError, AdmissionService, InitiateCommand, SignatoryOpinion};
use super::supervision::SignatoryId;
use super::export::listing_to_csv;

/// Router builder exposing the admission workflow over HTTP.
pub fn admission_router<R, H, N, Q>(service: Arc<AdmissionService<R, H, N, Q>>) -> Router
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    Router::new()
        .route("/api/v1/admissions", post(initiate_handler::<R, H, N, Q>))
        .route(
            "/api/v1/admissions/search",
            post(search_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/search/export",
            post(export_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id",
            get(detail_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/history",
            get(history_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/supervision/promoters",
            post(add_promoter_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/supervision/members",
            post(add_member_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/supervision/lead",
            put(lead_promoter_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/signatures/request",
            post(request_signatures_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/signatures/opinion",
            post(opinion_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/submit",
            post(submit_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/cdd/decision",
            post(cdd_decision_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/sic/decision",
            post(sic_decision_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/checklist/status",
            post(tab_status_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/checklist/experiences/:experience_id",
            post(experience_status_handler::<R, H, N, Q>),
        )
        .route(
            "/api/v1/admissions/:proposition_id/access-condition",
            put(access_condition_handler::<R, H, N, Q>),
        )
        .with_state(service)
}

fn error_response(error: AdmissionError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
struct InitiateRequest {
    admission_type: AdmissionType,
    candidate: CandidateSnapshot,
    training: TrainingSnapshot,
    author: String,
}

async fn initiate_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    axum::Json(request): axum::Json<InitiateRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    let command = InitiateCommand {
        admission_type: request.admission_type,
        candidate: request.candidate,
        training: request.training,
        author: request.author,
    };
    match service.initiate(command) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

async fn detail_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.get(&PropositionId(proposition_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn history_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.history(&PropositionId(proposition_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn search_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    axum::Json(query): axum::Json<ListingQuery>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.repository().list() {
        Ok(records) => {
            let page = run_query(service.catalog(), &records, &query);
            (StatusCode::OK, axum::Json(page)).into_response()
        }
        Err(error) => error_response(error.into()),
    }
}

async fn export_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    axum::Json(mut query): axum::Json<ListingQuery>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    // The export ignores pagination and renders the full filtered set.
    query.page = 0;
    query.page_size = usize::MAX;
    let records = match service.repository().list() {
        Ok(records) => records,
        Err(error) => return error_response(error.into()),
    };
    let page = run_query(service.catalog(), &records, &query);
    match listing_to_csv(&page.rows) {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"admissions.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignatoryRequest {
    signatory: String,
    display_name: String,
    email: String,
    author: String,
}

async fn add_promoter_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<SignatoryRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.add_promoter(
        &PropositionId(proposition_id),
        SignatoryId(request.signatory),
        &request.display_name,
        &request.email,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn add_member_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<SignatoryRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.add_committee_member(
        &PropositionId(proposition_id),
        SignatoryId(request.signatory),
        &request.display_name,
        &request.email,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct LeadPromoterRequest {
    signatory: String,
    author: String,
}

async fn lead_promoter_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<LeadPromoterRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.designate_lead_promoter(
        &PropositionId(proposition_id),
        SignatoryId(request.signatory),
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct AuthorRequest {
    author: String,
}

async fn request_signatures_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<AuthorRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.request_signatures(&PropositionId(proposition_id), &request.author) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum OpinionPayload {
    Approve {
        #[serde(default)]
        internal_comment: Option<String>,
        #[serde(default)]
        external_comment: Option<String>,
    },
    ApproveByPdf {
        pdf: Vec<String>,
    },
    Decline {
        #[serde(default)]
        internal_comment: Option<String>,
        #[serde(default)]
        external_comment: Option<String>,
        #[serde(default)]
        refusal_reason: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct OpinionRequest {
    signatory: String,
    #[serde(flatten)]
    payload: OpinionPayload,
}

async fn opinion_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<OpinionRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    let opinion = match request.payload {
        OpinionPayload::Approve {
            internal_comment,
            external_comment,
        } => SignatoryOpinion::Approve {
            internal_comment,
            external_comment,
        },
        OpinionPayload::ApproveByPdf { pdf } => SignatoryOpinion::ApproveByPdf { pdf },
        OpinionPayload::Decline {
            internal_comment,
            external_comment,
            refusal_reason,
        } => SignatoryOpinion::Decline {
            internal_comment,
            external_comment,
            refusal_reason,
        },
    };
    match service.record_opinion(
        &PropositionId(proposition_id),
        &SignatoryId(request.signatory),
        opinion,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    experience_ids: Vec<String>,
    author: String,
}

async fn submit_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.submit(
        &PropositionId(proposition_id),
        &request.experience_ids,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum CddDecisionPayload {
    TakeCharge,
    Approve,
    Refuse {
        #[serde(default)]
        reasons: Vec<String>,
    },
    Close,
    SendBackToSic,
}

#[derive(Debug, Deserialize)]
struct CddDecisionRequest {
    author: String,
    #[serde(flatten)]
    payload: CddDecisionPayload,
}

async fn cdd_decision_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<CddDecisionRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    let id = PropositionId(proposition_id);
    let outcome = match request.payload {
        CddDecisionPayload::TakeCharge => service.cdd_take_charge(&id, &request.author),
        CddDecisionPayload::Approve => service.cdd_approve(&id, &request.author),
        CddDecisionPayload::Refuse { reasons } => {
            service.cdd_refuse(&id, &reasons, &request.author)
        }
        CddDecisionPayload::Close => service.cdd_close(&id, &request.author),
        CddDecisionPayload::SendBackToSic => service.cdd_send_back_to_sic(&id, &request.author),
    };
    match outcome {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum SicDecisionPayload {
    Approve,
    Refuse,
    RequestDispensation { dispensation_state: String },
}

#[derive(Debug, Deserialize)]
struct SicDecisionRequest {
    author: String,
    #[serde(flatten)]
    payload: SicDecisionPayload,
}

async fn sic_decision_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<SicDecisionRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    let id = PropositionId(proposition_id);
    let outcome = match request.payload {
        SicDecisionPayload::Approve => service.sic_approve(&id, &request.author),
        SicDecisionPayload::Refuse => service.sic_refuse(&id, &request.author),
        SicDecisionPayload::RequestDispensation { dispensation_state } => {
            service.sic_request_dispensation(&id, &dispensation_state, &request.author)
        }
    };
    match outcome {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct TabStatusRequest {
    tab: ChecklistTab,
    identifier: String,
    author: String,
}

async fn tab_status_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<TabStatusRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.set_tab_status(
        &PropositionId(proposition_id),
        request.tab,
        &request.identifier,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct ExperienceStatusRequest {
    identifier: String,
    author: String,
}

async fn experience_status_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path((proposition_id, experience_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<ExperienceStatusRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.set_experience_status(
        &PropositionId(proposition_id),
        &experience_id,
        &request.identifier,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct AccessConditionRequest {
    condition: String,
    author: String,
}

async fn access_condition_handler<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
    Path(proposition_id): Path<String>,
    axum::Json(request): axum::Json<AccessConditionRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    match service.set_access_condition(
        &PropositionId(proposition_id),
        &request.condition,
        &request.author,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
