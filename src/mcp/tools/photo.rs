//! Tool for fetching an employee's photo.
//!
//! The image is inlined as base64 so the assistant can show it, alongside the
//! gateway URL of the photo.

use base64::{Engine, engine::general_purpose::STANDARD};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mcp::{
    error::BambooHrError,
    http::{BambooHrClient, MAX_INLINE_IMAGE_BYTES},
    tools::{tool_failure, validate_id},
};

const PHOTO_SIZES: &[&str] = &["original", "large", "medium", "small", "xs", "tiny"];
const DEFAULT_PHOTO_SIZE: &str = "small";

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct PhotoRequest {
    #[schemars(description = "BambooHR employee id, e.g. 123.")]
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Photo size: original, large, medium, small, xs or tiny. Defaults to small.")]
    pub size: Option<String>,
}

/// MIME type from the file's magic bytes. BambooHR stores photos as JPEG,
/// which is also the fallback.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

fn photo_size(size: Option<&str>) -> Result<String, BambooHrError> {
    let size = size.map_or_else(
        || DEFAULT_PHOTO_SIZE.to_string(),
        |s| s.trim().to_lowercase(),
    );
    if PHOTO_SIZES.contains(&size.as_str()) {
        Ok(size)
    } else {
        Err(BambooHrError::InvalidParams(format!(
            "size must be one of {}, got '{size}'.",
            PHOTO_SIZES.join(", ")
        )))
    }
}

pub async fn get_employee_photo(
    client: &BambooHrClient,
    Parameters(args): Parameters<PhotoRequest>,
) -> Result<CallToolResult, ErrorData> {
    let employee_id = validate_id("employee_id", &args.employee_id)?;
    let size = photo_size(args.size.as_deref())?;
    let endpoint = format!("/employees/{employee_id}/photo/{size}");

    match client
        .get_binary(&endpoint, Some(MAX_INLINE_IMAGE_BYTES))
        .await
    {
        Ok(bytes) => Ok(CallToolResult::success(vec![
            Content::image(STANDARD.encode(&bytes), sniff_image_mime(&bytes)),
            Content::text(format!(
                "Photo of employee {employee_id} ({size}, {} bytes): {}{endpoint}",
                bytes.len(),
                client.base_url()
            )),
        ])),
        Err(err) => tool_failure(err),
    }
}
