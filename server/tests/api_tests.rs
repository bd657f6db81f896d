//! End-to-end tests against a running API server.

mod common;

use serde_json::Value;

use common::{docx, docx_part, pdf, zip_entries, TestServer};
use docform::{Job, JobRegistry};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["message"], "Document Processing API is running");
}

#[tokio::test]
async fn test_upload_process_and_download() {
    let server = TestServer::start().await;

    let job_id = server
        .submit(&[
            ("report.docx", docx(&["INTRODUCTION", "This report covers the quarterly figures."])),
            ("scan.pdf", pdf(&["Summary", "The scanned page has a text layer."])),
        ])
        .await;

    let job = server.wait_finished(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["job_id"], job_id.as_str());
    assert_eq!(job["input_files"], serde_json::json!(["report.docx", "scan.pdf"]));
    assert_eq!(
        job["output_files"],
        serde_json::json!(["processed_report.docx", "processed_scan.docx"])
    );
    assert!(job["error"].is_null());

    // Single download
    let response = server
        .client
        .get(server.url(&format!("/download/{}/processed_report.docx", job_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], DOCX_MIME);
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("processed_report.docx"));

    let bytes = response.bytes().await.unwrap();
    let document = docx_part(&bytes, "word/document.xml");
    assert!(document.contains("INTRODUCTION"));
    assert!(document.contains("Heading1"));
    assert!(document.contains("w:w=\"11906\""));

    // Zip download
    let response = server
        .client
        .get(server.url(&format!("/download-all/{}", job_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/zip");
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains(&format!("processed_files_{}.zip", job_id)));

    let bytes = response.bytes().await.unwrap();
    assert_eq!(
        zip_entries(&bytes),
        vec!["processed_report.docx".to_string(), "processed_scan.docx".to_string()]
    );
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let server = TestServer::start().await;

    let response = server.upload(&[("notes.txt", b"plain text".to_vec())]).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Only DOCX and PDF files are supported");

    assert_eq!(server.job_dir_count(), 0);
    assert!(server.state.registry.list().is_empty());
}

#[tokio::test]
async fn test_mixed_upload_is_rejected_whole() {
    let server = TestServer::start().await;

    let response = server
        .upload(&[
            ("good.docx", docx(&["Fine content here."])),
            ("image.png", vec![0x89, b'P', b'N', b'G']),
        ])
        .await;
    assert_eq!(response.status(), 400);

    assert_eq!(server.job_dir_count(), 0);
    assert!(server.state.registry.list().is_empty());
}

#[tokio::test]
async fn test_overlong_filename_is_rejected_without_leftovers() {
    let server = TestServer::start().await;

    let long_name = format!("{}.docx", "a".repeat(300));
    let response = server
        .upload(&[
            ("ok.docx", docx(&["A perfectly fine document."])),
            (long_name.as_str(), docx(&["Name is far too long."])),
        ])
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().starts_with("Filename too long"));

    assert_eq!(server.job_dir_count(), 0);
    assert!(server.state.registry.list().is_empty());
}

#[tokio::test]
async fn test_staging_failure_removes_partial_job() {
    let server = TestServer::start().await;

    // A plain file where the output root should be makes staging fail
    // after the upload directory was created.
    let output_root = server.state.storage.output_root().to_path_buf();
    std::fs::remove_dir_all(&output_root).unwrap();
    std::fs::write(&output_root, b"not a directory").unwrap();

    let response = server.upload(&[("report.docx", docx(&["Some text."]))]).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(!detail.contains(server.temp_dir.path().to_str().unwrap()));

    let leftovers = std::fs::read_dir(server.state.storage.upload_root()).unwrap().count();
    assert_eq!(leftovers, 0);
    assert!(server.state.registry.list().is_empty());
}

#[tokio::test]
async fn test_upload_without_files() {
    let server = TestServer::start().await;

    let form = reqwest::multipart::Form::new().text("comment", "nothing attached");
    let response = server
        .client
        .post(server.url("/upload-files/"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(server.job_dir_count(), 0);
}

#[tokio::test]
async fn test_uppercase_extension_is_accepted() {
    let server = TestServer::start().await;

    let job_id = server.submit(&[("NOTES.DOCX", docx(&["Shouting file names."]))]).await;
    let job = server.wait_finished(&job_id).await;

    assert_eq!(job["status"], "completed");
    assert_eq!(job["output_files"], serde_json::json!(["processed_NOTES.docx"]));
}

#[tokio::test]
async fn test_duplicate_names_get_numbered() {
    let server = TestServer::start().await;

    let job_id = server
        .submit(&[
            ("report.docx", docx(&["First copy of the report."])),
            ("report.docx", docx(&["Second copy of the report."])),
        ])
        .await;
    let job = server.wait_finished(&job_id).await;

    assert_eq!(job["input_files"], serde_json::json!(["report.docx", "report_2.docx"]));
    assert_eq!(
        job["output_files"],
        serde_json::json!(["processed_report.docx", "processed_report_2.docx"])
    );
}

#[tokio::test]
async fn test_unknown_job() {
    let server = TestServer::start().await;

    for path in [
        "/job-status/no-such-job",
        "/download/no-such-job/processed_a.docx",
        "/download-all/no-such-job",
    ] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 404, "{}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Job not found");
    }
}

#[tokio::test]
async fn test_download_unknown_file() {
    let server = TestServer::start().await;

    let job_id = server.submit(&[("report.docx", docx(&["Some text."]))]).await;
    server.wait_finished(&job_id).await;

    for name in ["processed_other.docx", "..%2F..%2Fuploads%2Freport.docx", "report.docx"] {
        let response = server
            .client
            .get(server.url(&format!("/download/{}/{}", job_id, name)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "{}", name);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "File not found");
    }
}

#[tokio::test]
async fn test_download_before_completion() {
    let server = TestServer::start().await;

    server
        .state
        .registry
        .create(Job::new("pending-job", vec!["a.docx".to_string()]))
        .unwrap();

    for path in ["/download/pending-job/processed_a.docx", "/download-all/pending-job"] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Job processing not completed");
    }

    let job: Value = server.status("pending-job").await.json().await.unwrap();
    assert_eq!(job["status"], "pending");
}

#[tokio::test]
async fn test_failed_job_reports_errors() {
    let server = TestServer::start().await;

    let job_id = server
        .submit(&[("broken.pdf", b"%PDF-1.4 this is not a real pdf".to_vec())])
        .await;
    let job = server.wait_finished(&job_id).await;

    assert_eq!(job["status"], "failed");
    assert_eq!(job["output_files"], serde_json::json!([]));
    assert_eq!(job["error"], "No files were processed successfully");
    assert_eq!(job["error_files"][0]["filename"], "broken.pdf");
    assert!(!job["error_files"][0]["error"].as_str().unwrap().is_empty());

    let response = server
        .client
        .get(server.url(&format!("/download-all/{}", job_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_partial_failure_completes() {
    let server = TestServer::start().await;

    let job_id = server
        .submit(&[
            ("good.docx", docx(&["Readable paragraph."])),
            ("empty.docx", Vec::new()),
        ])
        .await;
    let job = server.wait_finished(&job_id).await;

    assert_eq!(job["status"], "completed");
    assert_eq!(job["output_files"], serde_json::json!(["processed_good.docx"]));
    assert_eq!(job["error_files"][0]["filename"], "empty.docx");

    let response = server
        .client
        .get(server.url(&format!("/download-all/{}", job_id)))
        .send()
        .await
        .unwrap();
    let bytes = response.bytes().await.unwrap();
    assert_eq!(zip_entries(&bytes), vec!["processed_good.docx".to_string()]);
}

#[tokio::test]
async fn test_delete_job() {
    let server = TestServer::start().await;

    let job_id = server.submit(&[("report.docx", docx(&["To be removed."]))]).await;
    server.wait_finished(&job_id).await;
    assert!(server.upload_dir(&job_id).exists());
    assert!(server.output_dir(&job_id).exists());

    let response = server
        .client
        .delete(server.url(&format!("/job/{}", job_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "Job deleted successfully");

    assert!(!server.upload_dir(&job_id).exists());
    assert!(!server.output_dir(&job_id).exists());
    assert_eq!(server.status(&job_id).await.status(), 404);

    let response = server
        .client
        .delete(server.url(&format!("/job/{}", job_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
