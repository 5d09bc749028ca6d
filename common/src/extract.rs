use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use tracing::debug;

use crate::error::ExtractError;
use crate::job::ExtractionConfig;

/// Procesador de extracción al que se envía cada documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorTarget {
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
}

impl ProcessorTarget {
    /// `projects/<p>/locations/<l>/processors/<id>`
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/processors/{}",
            self.project_id, self.location, self.processor_id
        )
    }
}

/// Campos estructurados que devuelve el extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub fields: BTreeMap<String, String>,
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        target: &ProcessorTarget,
        name: &str,
        content: &[u8],
    ) -> Result<ExtractedDocument, ExtractError>;
}

/* =========================
   Cliente HTTP del servicio de extracción
   ========================= */

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocument<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    mention_text: String,
    normalized_value: Option<NormalizedValue>,
}

#[derive(Deserialize)]
struct NormalizedValue {
    text: Option<String>,
}

/// Llama al endpoint REST `:process` con el documento en base64.
#[derive(Debug, Clone)]
pub struct DocumentAiClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    mime_type: String,
}

impl DocumentAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        access_token: Option<String>,
        mime_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ExtractError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint,
            access_token,
            mime_type: mime_type.into(),
        })
    }

    pub fn from_config(cfg: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::new(
            cfg.endpoint.clone(),
            cfg.access_token.clone(),
            cfg.mime_type.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    fn process_url(&self, target: &ProcessorTarget) -> String {
        format!("{}/v1/{}:process", self.endpoint, target.resource_name())
    }
}

/// Entidades -> campos. Los tipos repetidos (p.ej. `line_item`) se
/// numeran: `line_item`, `line_item_2`, ...
fn entities_to_fields(entities: Vec<Entity>) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();

    for entity in entities {
        let value = entity
            .normalized_value
            .and_then(|n| n.text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(entity.mention_text);

        let n = seen.entry(entity.kind.clone()).or_insert(0);
        *n += 1;
        let key = if *n == 1 {
            entity.kind
        } else {
            format!("{}_{}", entity.kind, n)
        };

        fields.insert(key, value.trim().to_string());
    }

    fields
}

#[async_trait]
impl DocumentExtractor for DocumentAiClient {
    async fn extract(
        &self,
        target: &ProcessorTarget,
        name: &str,
        content: &[u8],
    ) -> Result<ExtractedDocument, ExtractError> {
        let url = self.process_url(target);
        debug!("enviando {} ({} bytes) a {}", name, content.len(), url);

        let body = ProcessRequest {
            raw_document: RawDocument {
                content: STANDARD.encode(content),
                mime_type: &self.mime_type,
            },
        };

        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|source| ExtractError::Request {
            endpoint: url.clone(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProcessResponse = resp
            .json()
            .await
            .map_err(|source| ExtractError::Request {
                endpoint: url.clone(),
                source,
            })?;

        let document = parsed.document.ok_or(ExtractError::EmptyDocument)?;
        Ok(ExtractedDocument {
            fields: entities_to_fields(document.entities),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn target() -> ProcessorTarget {
        ProcessorTarget {
            project_id: "demo".to_string(),
            location: "us".to_string(),
            processor_id: "p1".to_string(),
        }
    }

    #[test]
    fn resource_name_arma_la_ruta_del_procesador() {
        assert_eq!(
            target().resource_name(),
            "projects/demo/locations/us/processors/p1"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn extract_envia_base64_y_mapea_entidades() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/demo/locations/us/processors/p1:process")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "rawDocument": { "content": "JVBERg==", "mimeType": "application/pdf" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "document": {
                        "entities": [
                            { "type": "invoice_id", "mentionText": " INV-7 " },
                            { "type": "total_amount", "mentionText": "$1,200.00",
                              "normalizedValue": { "text": "1200" } },
                            { "type": "line_item", "mentionText": "tornillos" },
                            { "type": "line_item", "mentionText": "tuercas" }
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = DocumentAiClient::new(
            server.url(),
            Some("tok".to_string()),
            "application/pdf",
            Duration::from_secs(5),
        )
        .unwrap();

        let doc = client.extract(&target(), "abc", b"%PDF").await.unwrap();
        mock.assert_async().await;

        assert_eq!(doc.fields["invoice_id"], "INV-7");
        assert_eq!(doc.fields["total_amount"], "1200");
        assert_eq!(doc.fields["line_item"], "tornillos");
        assert_eq!(doc.fields["line_item_2"], "tuercas");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn extract_reporta_status_de_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(503)
            .with_body("sobrecargado")
            .create_async()
            .await;

        let client =
            DocumentAiClient::new(server.url(), None, "application/pdf", Duration::from_secs(5))
                .unwrap();
        let err = client.extract(&target(), "abc", b"x").await.unwrap_err();

        match err {
            ExtractError::BadStatus { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "sobrecargado");
            }
            other => panic!("error inesperado: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn extract_sin_documento_es_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client =
            DocumentAiClient::new(server.url(), None, "application/pdf", Duration::from_secs(5))
                .unwrap();
        let err = client.extract(&target(), "abc", b"x").await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument));
    }
}
