//! End-to-end tests of the HTTP interface against a template tree on disk.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use initializer::{web, Config};
use serde_json::Value;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tower::ServiceExt;

const MANIFEST: &str = r#"{"templates": [{"path": "java/quickstart"}]}"#;

const LITERAL_README: &str = "## Setup {#setup}\n\n{% raw %} stays, so does }} alone\n";

const LITERAL_JAVA: &str = "class Format {\n    String f = String.format(\"{%d}\", 1);\n    Map<String, Integer> m = new HashMap<>() {{\n        put(\"a\", 1);\n    }};\n}\n";

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out a small template tree and build the app over it.
fn setup() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let templates = root.join("templates");

    write_file(root, "manifest.json", MANIFEST);

    write_file(
        &templates,
        "java/quickstart/files/src/main/java/com/example/demo/App.java",
        "package {{package}};\n\nclass App {\n    String user = \"{{username}}\";\n    String url = \"{{connectionString}}\";\n}\n",
    );
    write_file(&templates, "java/quickstart/files/README.md", "# {{name}}\n");
    write_file(&templates, "java/quickstart/files/gradlew", "#!/bin/sh\necho {{name}}\n");
    write_file(
        &templates,
        "java/quickstart/parameters.json",
        r#"{"sections": [{"title": "Project"}]}"#,
    );
    write_file(
        &templates,
        "java/quickstart/mixins.json",
        r#"["gradle", "docker"]"#,
    );

    write_file(
        &templates,
        "java/gradle/files/build.gradle",
        "group = '{{group}}'\n",
    );
    write_file(&templates, "java/gradle/files/shared.txt", "from gradle\n");
    write_file(&templates, "java/docker/files/shared.txt", "from docker\n");

    write_file(&templates, "java/broken/files/README.md", "{{undefined}}\n");
    write_file(&templates, "java/literal/files/README.md", LITERAL_README);
    write_file(&templates, "java/literal/files/Format.java", LITERAL_JAVA);
    write_file(&templates, "python/files/README.md", "# {{name}}\n");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(
            templates.join("java/quickstart/files/gradlew"),
            fs::Permissions::from_mode(0o755),
        )
        .unwrap();
    }

    let config = Config {
        templates_path: templates,
        manifest_path: root.join("manifest.json"),
        ..Config::default()
    };
    let state = web::AppState::from_config(&config).unwrap();
    (dir, web::app(state))
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

fn read_entry(archive: &[u8], name: &str) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut file = zip.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn entry_names(archive: &[u8]) -> Vec<String> {
    let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    zip.file_names().map(str::to_string).collect()
}

#[tokio::test]
async fn test_health() {
    let (_dir, app) = setup();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_manifest_is_served_verbatim() {
    let (_dir, app) = setup();
    let response = get(&app, "/manifest.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, MANIFEST.as_bytes());
}

#[tokio::test]
async fn test_project_parameters() {
    let (_dir, app) = setup();

    let response = get(&app, "/project/java/quickstart").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let params: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(params["sections"][0]["title"], "Project");

    let response = get(&app, "/project/python").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let params: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(params, serde_json::json!({ "sections": [] }));
}

#[tokio::test]
async fn test_project_not_found() {
    let (_dir, app) = setup();
    for uri in [
        "/project/ruby",
        "/project/Java",
        "/project/java/../python",
        "/project/java%2F..%2F..",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_download() {
    let (_dir, app) = setup();
    let response = get(
        &app,
        "/download/java/quickstart?package=org.acme.app&username=alice&address=cb.xyz.cloud.couchbase.com",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"quickstart.zip\""
    );

    let archive = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let names = entry_names(&archive);
    assert!(names.contains(&"src/main/java/org/acme/app/App.java".to_string()));
    assert!(!names.iter().any(|name| name.contains("com/example/demo")));

    assert_eq!(
        read_entry(&archive, "src/main/java/org/acme/app/App.java"),
        "package org.acme.app;\n\nclass App {\n    String user = \"alice\";\n    String url = \"couchbases://cb.xyz.cloud.couchbase.com\";\n}\n"
    );
    assert_eq!(read_entry(&archive, "README.md"), "# demo\n");
    // not processable, copied as-is
    assert_eq!(read_entry(&archive, "gradlew"), "#!/bin/sh\necho {{name}}\n");
    assert_eq!(read_entry(&archive, "build.gradle"), "group = 'com.example'\n");
    // the later mixin wins
    assert_eq!(read_entry(&archive, "shared.txt"), "from docker\n");
    assert_eq!(
        names.iter().filter(|name| *name == "shared.txt").count(),
        1
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_download_keeps_executable_bit() {
    let (_dir, app) = setup();
    let response = get(&app, "/download/java/quickstart").await;
    let archive = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let mut zip = zip::ZipArchive::new(Cursor::new(&archive[..])).unwrap();
    let mode = zip.by_name("gradlew").unwrap().unix_mode().unwrap();
    assert_eq!(mode & 0o777, 0o755);
    let mode = zip.by_name("README.md").unwrap().unix_mode().unwrap_or(0);
    assert_eq!(mode & 0o100, 0);
}

#[tokio::test]
async fn test_download_post_form() {
    let (_dir, app) = setup();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/download/python?name=from-query")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=from%20form"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"python.zip\""
    );
    let archive = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(read_entry(&archive, "README.md"), "# from form\n");
}

#[tokio::test]
async fn test_download_rejects_bad_paths() {
    let (_dir, app) = setup();
    for uri in [
        "/download/Java/quickstart",
        "/download/java/../python",
        "/download/java/quick_start",
        "/download/ruby",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_download_rejects_bad_package() {
    let (_dir, app) = setup();
    let response = get(&app, "/download/java/quickstart?package=..%2F..%2Fetc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_unknown_template_with_bad_package() {
    let (_dir, app) = setup();
    let response = get(&app, "/download/ruby?package=..%2Fetc").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_keeps_literal_braces() {
    let (_dir, app) = setup();
    let response = get(&app, "/download/java/literal").await;
    assert_eq!(response.status(), StatusCode::OK);
    let archive = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    assert_eq!(read_entry(&archive, "README.md"), LITERAL_README);
    assert_eq!(read_entry(&archive, "Format.java"), LITERAL_JAVA);
}

#[tokio::test]
async fn test_download_undefined_placeholder_aborts_stream() {
    let (_dir, app) = setup();
    let response = get(&app, "/download/java/broken").await;

    // headers are already out by the time rendering fails
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_clusters_without_credentials() {
    let (_dir, app) = setup();
    let response = get(&app, "/clusters").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = get(&app, "/clusters/abc/connection-string").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_bundled_templates_render() {
    let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let config = Config {
        manifest_path: templates.join("manifest.json"),
        templates_path: templates,
        ..Config::default()
    };
    let app = web::app(web::AppState::from_config(&config).unwrap());

    let response = get(&app, "/download/java/quickstart?package=io.acme&address=db.internal").await;
    assert_eq!(response.status(), StatusCode::OK);
    let archive = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let app_java = read_entry(&archive, "src/main/java/io/acme/App.java");
    assert!(app_java.starts_with("package io.acme;\n"));
    assert!(app_java.contains("\"couchbase://db.internal\""));
    assert!(read_entry(&archive, "build.gradle").contains("mainClass = \"io.acme.App\""));
    assert_eq!(read_entry(&archive, "settings.gradle"), "rootProject.name = \"demo\"\n");
}
