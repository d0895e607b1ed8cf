use anyhow::Result;
use utoipa::OpenApi;

use crate::cli::OpenApiFormat;
use crate::schemas::ApiDoc;

pub fn render_openapi(format: OpenApiFormat) -> Result<String> {
    let doc = ApiDoc::openapi();
    let rendered = match format {
        OpenApiFormat::Json => serde_json::to_string_pretty(&doc)?,
        OpenApiFormat::Yaml => serde_yaml::to_string(&doc)?,
    };
    Ok(rendered)
}

/// Print the OpenAPI document to stdout
pub fn print_openapi(format: OpenApiFormat) -> Result<()> {
    println!("{}", render_openapi(format)?);
    Ok(())
}
