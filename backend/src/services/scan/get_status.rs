use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};

/// Current `JobStatus` of a scan; `404 Not Found` for an unknown job id.
///
/// A finished job carries its `ScanSummary`, whose `output_csv` is the report
/// served by `GET /api/scan/report/{job_id}`.
pub(crate) async fn process(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    match state.jobs.read().await.get(job_id.as_str()) {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().body("Job ID not found"),
    }
}
