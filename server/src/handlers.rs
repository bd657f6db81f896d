//! HTTP request handlers for API endpoints

use std::path::PathBuf;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use docform::job::{DocumentFormat, InputFile, Job};
use docform::sanitize::{sanitize_filename, MAX_FILENAME_BYTES};
use docform::storage::build_zip;

use crate::error::ApiError;
use crate::types::{DeleteResponse, HealthResponse, UploadResponse};
use crate::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Document Processing API is running".to_string(),
    })
}

/// Accepts one or more DOCX/PDF files and starts a background job.
///
/// Every file name is checked before anything is written, so a request with
/// a single unsupported file leaves no trace on disk or in the registry.
/// A failure while staging removes whatever was already written.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload(format!("Invalid multipart body: {}", e)))?
    {
        // Plain form fields carry no file name.
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidUpload(format!("Failed to read upload: {}", e)))?;
        files.push((raw_name, data));
    }

    if files.is_empty() {
        return Err(ApiError::InvalidUpload("No files uploaded".to_string()));
    }

    let mut accepted = Vec::with_capacity(files.len());
    for (raw_name, data) in files {
        let name = sanitize_filename(&raw_name)
            .ok_or_else(|| ApiError::InvalidUpload(format!("Invalid filename: {:?}", raw_name)))?;
        if DocumentFormat::from_filename(&name).is_none() {
            warn!("Rejected upload with unsupported file {}", name);
            return Err(ApiError::InvalidFileType);
        }
        if name.len() > MAX_FILENAME_BYTES {
            warn!("Rejected upload with a {} byte file name", name.len());
            return Err(ApiError::InvalidUpload(format!(
                "Filename too long (limit {} bytes)",
                MAX_FILENAME_BYTES
            )));
        }
        accepted.push((name, data));
    }

    let mut job = Job::with_new_id(Vec::new());
    let job_id = job.job_id.clone();

    let storage = state.storage.clone();
    let staged_job_id = job_id.clone();
    let inputs = tokio::task::spawn_blocking(move || -> Result<Vec<InputFile>, ApiError> {
        storage.create_job_dirs(&staged_job_id)?;
        let mut inputs = Vec::with_capacity(accepted.len());
        for (name, data) in &accepted {
            let path = storage.save_input(&staged_job_id, name, data)?;
            let stored_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(name)
                .to_string();
            let input = InputFile::new(stored_name, path).ok_or(ApiError::InvalidFileType)?;
            inputs.push(input);
        }
        Ok(inputs)
    })
    .await
    .map_err(ApiError::from)
    .and_then(|staged| staged);

    let inputs = match inputs {
        Ok(inputs) => inputs,
        Err(e) => {
            discard_staged(&state, &job_id).await;
            return Err(e);
        }
    };

    job.input_files = inputs.iter().map(|i| i.filename.clone()).collect();
    if let Err(e) = state.registry.create(job) {
        discard_staged(&state, &job_id).await;
        return Err(e.into());
    }

    info!("Accepted job {} with {} files", job_id, inputs.len());
    spawn_processing(&state, job_id.clone(), inputs);

    Ok(Json(UploadResponse {
        job_id,
        status: "Processing started".to_string(),
    }))
}

/// Removes the directories of an upload that never became a job.
async fn discard_staged(state: &AppState, job_id: &str) {
    let storage = state.storage.clone();
    let removed_id = job_id.to_string();
    match tokio::task::spawn_blocking(move || storage.remove_job(&removed_id)).await {
        Ok(Ok(())) => info!("Discarded staged files of rejected upload {}", job_id),
        Ok(Err(e)) => warn!("Could not discard staged upload {}: {}", job_id, e),
        Err(e) => warn!("Could not discard staged upload {}: {}", job_id, e),
    }
}

/// Runs the pipeline on the blocking pool. A panicking task fails the job.
fn spawn_processing(state: &AppState, job_id: String, inputs: Vec<InputFile>) {
    let registry = state.registry.clone();
    let pipeline = state.pipeline.clone();

    tokio::spawn(async move {
        let task_registry = registry.clone();
        let task_job_id = job_id.clone();
        let result = tokio::task::spawn_blocking(move || {
            pipeline.run_job(&task_job_id, &inputs, task_registry.as_ref())
        })
        .await;

        if let Err(e) = result {
            error!("Processing task for job {} failed: {}", job_id, e);
            let message = format!("Processing task failed: {}", e);
            let _ = registry.update(&job_id, &mut |job: &mut Job| job.fail(message.clone()));
        }
    });
}

/// Returns the full job record.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .registry
        .get(&job_id)
        .map(Json)
        .ok_or(ApiError::JobNotFound)
}

fn finished_job(state: &AppState, job_id: &str) -> Result<Job, ApiError> {
    let job = state.registry.get(job_id).ok_or(ApiError::JobNotFound)?;
    if !job.status.is_finished() {
        return Err(ApiError::JobNotCompleted);
    }
    Ok(job)
}

/// `Content-Disposition` with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

fn attachment(content_type: String, filename: &str, body: Vec<u8>) -> Response {
    let disposition = content_disposition(filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Streams one formatted document of a finished job.
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let job = finished_job(&state, &job_id)?;
    if !job.has_output(&filename) {
        return Err(ApiError::FileNotFound);
    }
    let path = state
        .storage
        .output_path(&job_id, &filename)
        .ok_or(ApiError::FileNotFound)?;

    let body = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::FileNotFound)?;

    Ok(attachment(DocumentFormat::Docx.mime_type(), &filename, body))
}

/// Bundles every output of a finished job into one zip archive.
pub async fn download_all(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = finished_job(&state, &job_id)?;

    let entries: Vec<(String, PathBuf)> = job
        .output_files
        .iter()
        .filter_map(|name| match state.storage.output_path(&job_id, name) {
            Some(path) => Some((name.clone(), path)),
            None => {
                warn!("Recorded output {} of job {} is missing", name, job_id);
                None
            }
        })
        .collect();
    if entries.is_empty() {
        return Err(ApiError::FileNotFound);
    }

    let archive = tokio::task::spawn_blocking(move || build_zip(&entries)).await??;

    Ok(attachment(
        "application/zip".to_string(),
        &format!("processed_files_{}.zip", job_id),
        archive,
    ))
}

/// Removes a job's registry entry and both of its directories.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.registry.delete(&job_id)?;

    let storage = state.storage.clone();
    let removed_id = job_id.clone();
    tokio::task::spawn_blocking(move || storage.remove_job(&removed_id)).await??;

    info!("Deleted job {}", job_id);
    Ok(Json(DeleteResponse {
        status: "Job deleted successfully".to_string(),
    }))
}
