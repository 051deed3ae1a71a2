//! OpenAPI document for the HTTP API, generated from the route annotations
//! in [`crate::server`], plus the Swagger UI page served at `/docs`.

use utoipa::openapi::server::Server;
use utoipa::OpenApi;

use crate::models::{ContentIdea, Idea, Page};
use crate::server::{
    self, ErrorBody, HelloResponse, RandomIdeasResponse, StatusResponse, VersionResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Vibes Only Served API"),
    paths(
        server::hello,
        server::healthz,
        server::readyz,
        server::version,
        server::generate_ideas,
        server::list_ideas,
        server::random_ideas,
        server::openapi_json
    ),
    components(schemas(
        HelloResponse,
        StatusResponse,
        VersionResponse,
        Idea,
        ContentIdea,
        Page,
        RandomIdeasResponse,
        ErrorBody
    )),
    tags(
        (name = "hello", description = "Greeting endpoint"),
        (name = "ops", description = "Operational endpoints"),
        (name = "meta", description = "Meta endpoints"),
        (name = "ideas", description = "Idea generation and listing")
    )
)]
struct ApiDoc;

/// Build the document, stamped with the configured app version.
pub fn api_doc(app_version: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.version = app_version.to_string();
    doc.servers = Some(vec![Server::new("http://localhost:3000")]);
    doc
}

/// Version of the `swagger-ui-dist` assets the docs page loads.
const SWAGGER_UI_VERSION: &str = "5.17.14";

/// Swagger UI page rendering the document served at `openapi_url`.
pub fn swagger_html(openapi_url: &str) -> String {
    let assets = format!("https://unpkg.com/swagger-ui-dist@{}", SWAGGER_UI_VERSION);
    let mut html = String::with_capacity(1024);
    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Vibes Only Served API</title>
"#,
    );
    html.push_str(&format!(
        "    <link rel=\"stylesheet\" href=\"{}/swagger-ui.css\">\n",
        assets
    ));
    html.push_str(
        r#"    <style>
        body { margin: 0; padding: 0; }
        .swagger-ui .topbar { display: none; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
"#,
    );
    html.push_str(&format!(
        "    <script src=\"{}/swagger-ui-bundle.js\"></script>\n",
        assets
    ));
    html.push_str(&format!(
        "    <script src=\"{}/swagger-ui-standalone-preset.js\"></script>\n",
        assets
    ));
    html.push_str(
        r#"    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: ""#,
    );
    html.push_str(openapi_url);
    html.push_str(
        r#"",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"#,
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_carries_version_and_tags() {
        let doc = api_doc("v2.0.0");
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["info"]["version"], "v2.0.0");
        assert_eq!(json["servers"][0]["url"], "http://localhost:3000");
        let tags: Vec<&str> = json["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["hello", "ops", "meta", "ideas"]);
        assert!(json["components"]["schemas"].get("Idea").is_some());
    }

    #[test]
    fn test_swagger_html_points_at_document() {
        let html = swagger_html("/openapi.json");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("url: \"/openapi.json\""));
        assert!(html.contains("swagger-ui-bundle.js"));
    }
}
