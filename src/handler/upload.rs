use crate::{
    AppState,
    dtos::UploadResponseDto,
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check},
    models::UserRole,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use tracing::instrument;
use uuid::Uuid;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
// Multipart boundary and part headers sit on top of the file bytes, so the
// request body limit must leave headroom above the file limit.
const BODY_LIMIT_BYTES: usize = MAX_IMAGE_BYTES + 8 * 1024;
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Router for product image uploads. Artisans and admins; files are
/// served back statically under /uploads.
pub fn upload_handler(app_state: AppState) -> Router<AppState> {
    upload_routes()
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Artisan, UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// Route plus the raised body limit; axum's default body cap is below the
/// 5 MB file allowance and would reject valid uploads before the handler
/// runs.
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

fn extension_of(file_name: &str) -> Option<String> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Accept a single multipart `file` field, persist it under a random
/// name, and return the public URL.
#[instrument(skip(app_state, multipart))]
pub async fn upload_image(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Malformed multipart request: {}", e);
        HttpError::bad_request("Malformed multipart request".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| HttpError::bad_request("Missing file name".to_string()))?;

        let ext = extension_of(&file_name).ok_or_else(|| {
            HttpError::bad_request(
                "Unsupported file type, expected jpg, jpeg, png or webp".to_string(),
            )
        })?;

        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed reading upload body: {}", e);
            HttpError::bad_request("Failed reading upload body".to_string())
        })?;

        if data.len() > MAX_IMAGE_BYTES {
            return Err(HttpError::bad_request(
                "File too large, maximum size is 5 MB".to_string(),
            ));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        let dir = app_state.env.upload_dir.clone();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::error!("Failed creating upload directory: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
        let path = std::path::Path::new(&dir).join(&stored_name);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            tracing::error!("Failed writing upload: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

        let url = format!("{}/uploads/{}", app_state.env.public_url, stored_name);
        tracing::info!(%stored_name, "upload_image successful");
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponseDto {
                status: "success".to_string(),
                url,
            }),
        ));
    }

    Err(HttpError::bad_request(
        "Missing multipart field: file".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db::DBClient};
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn accepts_known_image_extensions() {
        assert_eq!(extension_of("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("vase.final.webp").as_deref(), Some("webp"));
    }

    #[test]
    fn rejects_other_extensions() {
        assert!(extension_of("archive.zip").is_none());
        assert!(extension_of("no_extension").is_none());
        assert!(extension_of("script.png.exe").is_none());
    }

    fn test_state(upload_dir: &str) -> AppState {
        let config = Config {
            database_url: "postgres://localhost/unused".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            port: 8000,
            frontend_url: "http://localhost:4200".to_string(),
            public_url: "http://localhost:8000".to_string(),
            upload_dir: upload_dir.to_string(),
        };
        // Lazy pool: the upload path never touches the database.
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        AppState {
            env: Arc::new(config),
            db_client: DBClient::new(pool),
        }
    }

    fn multipart_request(file_bytes: &[u8]) -> Request<Body> {
        let boundary = "upload-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"vase.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn mid_range_upload_is_accepted() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let app = upload_routes().with_state(test_state(dir.to_str().unwrap()));

        // 3 MB sits above axum's default body cap but inside the 5 MB
        // allowance; it must reach the handler and succeed.
        let response = app
            .oneshot(multipart_request(&vec![0u8; 3 * 1024 * 1024]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let app = upload_routes().with_state(test_state(dir.to_str().unwrap()));

        let response = app
            .oneshot(multipart_request(&vec![0u8; 6 * 1024 * 1024]))
            .await
            .unwrap();

        assert!(!response.status().is_success());
        assert!(!dir.exists());
    }
}
