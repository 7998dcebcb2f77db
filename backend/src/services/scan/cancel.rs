use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};
use log::info;

/// Requests cooperative cancellation of a running scan.
///
/// - `202 Accepted` when the job was still running.
/// - `409 Conflict` when it has already finished.
/// - `404 Not Found` for an unknown job id.
pub(crate) async fn process(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    let job_id = job_id.into_inner();
    if let Some(token) = state.cancels.read().await.get(&job_id) {
        token.cancel();
        info!("Cancellation requested for scan job {}", job_id);
        return HttpResponse::Accepted().body("Cancellation requested");
    }
    if state.jobs.read().await.contains_key(&job_id) {
        HttpResponse::Conflict().body("Job already finished")
    } else {
        HttpResponse::NotFound().body("Job ID not found")
    }
}
