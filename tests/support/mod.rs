#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const FENCED_REPLY: &str = "```json\n[{\"q\":\"X?\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correct\":2}]\n```";

/// Writes a minimal PPTX deck: one slide per entry, one text shape per string.
pub fn write_pptx(dir: &Path, name: &str, slides: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    let mut ids = String::new();
    for i in 1..=slides.len() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            i + 1,
            i
        ));
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 1));
    }
    rels.push_str("</Relationships>");

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();

    zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    zip.start_file("ppt/presentation.xml", options).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
        )
        .as_bytes(),
    )
    .unwrap();

    for (i, shapes) in slides.iter().enumerate() {
        let mut body = String::new();
        for text in shapes.iter() {
            body.push_str(&format!(
                "<p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>",
                escape_xml(text)
            ));
        }
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree>{body}</p:spTree></p:cSld></p:sld>"#
            )
            .as_bytes(),
        )
        .unwrap();
    }

    zip.finish().unwrap();
    path
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Writes a PDF with one page per entry, each page showing its string in Courier.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Requests seen by a fake provider, plus the reply it sends back.
#[derive(Clone)]
pub struct FakeProvider {
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
    status: StatusCode,
    reply_text: String,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Value,
}

impl FakeProvider {
    pub fn last(&self) -> SeenRequest {
        self.seen.lock().unwrap().last().cloned().expect("provider was not called")
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

async fn record(state: &FakeProvider, uri: &Uri, query: HashMap<String, String>, headers: &HeaderMap, body: Value) {
    state.seen.lock().unwrap().push(SeenRequest {
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        body,
    });
}

async fn openai_reply(
    State(state): State<FakeProvider>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, &uri, query, &headers, body).await;
    let payload = json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": state.reply_text}}]
    });
    (state.status, Json(payload))
}

async fn gemini_reply(
    State(state): State<FakeProvider>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, &uri, query, &headers, body).await;
    let payload = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": state.reply_text}]}}]
    });
    (state.status, Json(payload))
}

/// Starts a fake OpenAI-compatible server; returns its base url (`…/v1`).
pub async fn spawn_openai(status: StatusCode, reply_text: &str) -> (String, FakeProvider) {
    let fake = FakeProvider {
        seen: Arc::new(Mutex::new(Vec::new())),
        status,
        reply_text: reply_text.to_string(),
    };
    let app = Router::new().fallback(openai_reply).with_state(fake.clone());
    let base = serve(app).await;
    (format!("{}/v1", base), fake)
}

/// Starts a fake Gemini server; returns its base url (`…/v1beta`).
pub async fn spawn_gemini(status: StatusCode, reply_text: &str) -> (String, FakeProvider) {
    let fake = FakeProvider {
        seen: Arc::new(Mutex::new(Vec::new())),
        status,
        reply_text: reply_text.to_string(),
    };
    let app = Router::new().fallback(gemini_reply).with_state(fake.clone());
    let base = serve(app).await;
    (format!("{}/v1beta", base), fake)
}

/// Accepts connections and never answers them.
pub async fn spawn_silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}/v1", addr)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
