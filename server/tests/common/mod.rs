//! Shared fixtures for API tests: a server on an ephemeral port and small
//! DOCX/PDF documents.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::time::Duration;

use lopdf::{dictionary, Object, Stream};
use serde_json::Value;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use docform::JobStorage;
use docform_server::{serve, AppState};

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage = JobStorage::new(temp_dir.path().join("uploads"), temp_dir.path().join("outputs"));
        storage.ensure_roots().expect("Failed to create storage roots");
        let state = AppState::new(storage);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state.clone()));

        Self {
            base_url: format!("http://{}", addr),
            state,
            client: reqwest::Client::new(),
            temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn upload_dir(&self, job_id: &str) -> std::path::PathBuf {
        self.state.storage.upload_dir(job_id)
    }

    pub fn output_dir(&self, job_id: &str) -> std::path::PathBuf {
        self.state.storage.output_dir(job_id)
    }

    /// Number of job folders under both storage roots.
    pub fn job_dir_count(&self) -> usize {
        [self.state.storage.upload_root(), self.state.storage.output_root()]
            .iter()
            .map(|root| std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0))
            .sum()
    }

    pub async fn upload(&self, files: &[(&str, Vec<u8>)]) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new();
        for (name, content) in files {
            let part = reqwest::multipart::Part::bytes(content.clone()).file_name(name.to_string());
            form = form.part("files", part);
        }
        self.client
            .post(self.url("/upload-files/"))
            .multipart(form)
            .send()
            .await
            .expect("upload request failed")
    }

    /// Uploads and returns the job id, asserting the request was accepted.
    pub async fn submit(&self, files: &[(&str, Vec<u8>)]) -> String {
        let response = self.upload(files).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "Processing started");
        body["job_id"].as_str().unwrap().to_string()
    }

    pub async fn status(&self, job_id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/job-status/{}", job_id)))
            .send()
            .await
            .expect("status request failed")
    }

    /// Polls job status until the job reaches a terminal state.
    pub async fn wait_finished(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let body: Value = self.status(job_id).await.json().await.unwrap();
            if body["status"] == "completed" || body["status"] == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {} did not finish in time", job_id);
    }
}

pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr/></w:body></w:document>",
        body
    );

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

pub fn pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("BT /F1 11 Tf 50 {} Td ({}) Tj ET\n", 780 - 14 * i as i64, line))
        .collect();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Names of the entries of a zip archive.
pub fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Reads one part of a DOCX package as text.
pub fn docx_part(bytes: &[u8], part: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(part).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}
