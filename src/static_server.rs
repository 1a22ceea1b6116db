use http::StatusCode;
use mime_guess::from_path;
use rust_embed::RustEmbed;

use crate::core::errors::ApiError;
use crate::core::http::Response;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

pub fn serve_static(file_path: &str) -> Result<Response, ApiError> {
    let file = Assets::get(file_path).ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;
    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::new(StatusCode::OK, mime.as_ref(), file.data.to_vec()))
}
