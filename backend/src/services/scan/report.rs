use crate::job_controller::state::JobsState;
use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};

const REPORT_FILE_NAME: &str = "pdf_info.csv";

/// Serves the CSV of a finished job as a download.
///
/// Returns `404 Not Found` while the job is running or when the id is unknown.
pub(crate) async fn process(
    req: HttpRequest,
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    let path = match state.reports.read().await.get(&job_id.into_inner()) {
        Some(path) => path.clone(),
        None => return HttpResponse::NotFound().body("Report not available"),
    };

    match NamedFile::open(&path) {
        Ok(file) => file
            .set_content_type(actix_files::file_extension_to_mime("csv"))
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(REPORT_FILE_NAME.to_string())],
            })
            .into_response(&req),
        Err(e) => HttpResponse::InternalServerError().body(format!("Cannot open report: {}", e)),
    }
}
