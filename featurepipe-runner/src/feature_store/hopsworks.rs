//! Hopsworks REST client.
//!
//! One upload is five calls against `https://<host>/hopsworks-api/api`:
//! project lookup, feature store lookup, feature group get-or-create, CSV
//! upload into the project's `Resources` dataset, ingestion job start. Every
//! request carries `Authorization: ApiKey <key>`.

use super::{FeatureStore, FeatureStoreTarget, PublishError, PublishReceipt};
use featurepipe_core::features::schema::PRIMARY_KEY;
use polars::prelude::*;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_PREFIX: &str = "hopsworks-api/api";
const UPLOAD_DATASET: &str = "Resources";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectInfo {
    project_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureStoreInfo {
    featurestore_id: i64,
    #[serde(default)]
    featurestore_name: String,
}

#[derive(Debug, Deserialize)]
struct FeatureGroupInfo {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct IngestionResponse {
    job: Option<JobInfo>,
}

#[derive(Debug, Deserialize)]
struct JobInfo {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct FeatureDef {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    primary: bool,
}

/// Feature store client for a Hopsworks cluster.
pub struct HopsworksStore {
    client: Client,
    base_url: String,
}

impl HopsworksStore {
    /// Client for `https://<host>`.
    pub fn new(host: &str) -> Result<Self, PublishError> {
        let host = host.trim().trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        Self::with_base_url(base)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("featurepipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, req: RequestBuilder, api_key: &str) -> RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, format!("ApiKey {api_key}"))
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, PublishError> {
        let resp = req.send().map_err(|e| PublishError::Network(e.to_string()))?;
        check_status(resp)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> Result<T, PublishError> {
        let resp = self.send(self.authed(self.client.get(self.url(path)), api_key))?;
        parse_json(resp, path)
    }

    fn project_id(&self, project: &str, api_key: &str) -> Result<i64, PublishError> {
        let info: ProjectInfo =
            self.get_json(&format!("project/getProjectInfo/{project}"), api_key)?;
        Ok(info.project_id)
    }

    /// The project's own feature store (`<project>_featurestore`).
    fn featurestore_id(&self, project_id: i64, project: &str, api_key: &str) -> Result<i64, PublishError> {
        let stores: Vec<FeatureStoreInfo> =
            self.get_json(&format!("project/{project_id}/featurestores"), api_key)?;
        pick_featurestore(&stores, project).ok_or_else(|| PublishError::Rejected {
            status: StatusCode::NOT_FOUND.as_u16(),
            body: format!("no feature store found for project '{project}'"),
        })
    }

    fn feature_group_id(
        &self,
        fg_path: &str,
        target: &FeatureStoreTarget,
        table: &DataFrame,
        api_key: &str,
    ) -> Result<i64, PublishError> {
        let lookup = self
            .authed(
                self.client
                    .get(self.url(&format!("{fg_path}/{}", target.feature_group)))
                    .query(&[("version", target.version)]),
                api_key,
            )
            .send()
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if lookup.status() != StatusCode::NOT_FOUND {
            let groups: Vec<FeatureGroupInfo> = parse_json(check_status(lookup)?, fg_path)?;
            if let Some(group) = groups.first() {
                tracing::debug!(id = group.id, "feature group exists");
                return Ok(group.id);
            }
        }

        tracing::info!(
            feature_group = %target.feature_group,
            version = target.version,
            "creating feature group"
        );
        let body = json!({
            "type": "cachedFeaturegroupDTO",
            "name": target.feature_group,
            "version": target.version,
            "description": format!("Hourly features for {}", target.feature_group),
            "onlineEnabled": false,
            "timeTravelFormat": "HUDI",
            "features": feature_defs(table.schema()),
        });
        let created: FeatureGroupInfo = parse_json(
            self.send(self.authed(self.client.post(self.url(fg_path)).json(&body), api_key))?,
            fg_path,
        )?;
        Ok(created.id)
    }

    /// Upload the CSV into the dataset directory; returns the stored file's path.
    fn upload_csv(
        &self,
        project_id: i64,
        project: &str,
        target: &FeatureStoreTarget,
        csv: Vec<u8>,
        api_key: &str,
    ) -> Result<String, PublishError> {
        let dir = format!("{UPLOAD_DATASET}/{}", target.feature_group);
        let file_name = target
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.csv", target.feature_group));
        let size = csv.len().to_string();

        let part = Part::bytes(csv)
            .file_name(file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| PublishError::Network(e.to_string()))?;
        let form = Form::new()
            .text("flowChunkNumber", "1")
            .text("flowChunkSize", size.clone())
            .text("flowCurrentChunkSize", size.clone())
            .text("flowTotalSize", size)
            .text("flowIdentifier", format!("{}_{file_name}", target.feature_group))
            .text("flowFilename", file_name.clone())
            .text("flowRelativePath", file_name.clone())
            .text("flowTotalChunks", "1")
            .part("file", part);

        let path = format!("project/{project_id}/dataset/upload/{dir}");
        self.send(self.authed(self.client.post(self.url(&path)).multipart(form), api_key))?;
        Ok(format!("/Projects/{project}/{dir}/{file_name}"))
    }
}

impl FeatureStore for HopsworksStore {
    fn upload(
        &self,
        target: &FeatureStoreTarget,
        table: &DataFrame,
    ) -> Result<PublishReceipt, PublishError> {
        let api_key = target.credential().ok_or(PublishError::MissingCredential)?;

        let project_id = self.project_id(&target.project_name, api_key)?;
        let fs_id = self.featurestore_id(project_id, &target.project_name, api_key)?;
        let fg_path = format!("project/{project_id}/featurestores/{fs_id}/featuregroups");
        let fg_id = self.feature_group_id(&fg_path, target, table, api_key)?;

        let csv = table_to_csv(table)?;
        let data_path = self.upload_csv(project_id, &target.project_name, target, csv, api_key)?;
        tracing::debug!(%data_path, "table uploaded");

        let ingestion = json!({
            "dataPath": data_path,
            "dataFormat": "CSV",
            "dataOptions": [{ "name": "header", "value": "true" }],
            "writeOptions": [],
        });
        let path = format!("{fg_path}/{fg_id}/ingestion");
        let resp: IngestionResponse = parse_json(
            self.send(self.authed(self.client.post(self.url(&path)).json(&ingestion), api_key))?,
            &path,
        )?;

        Ok(PublishReceipt {
            project_name: target.project_name.clone(),
            feature_group: target.feature_group.clone(),
            version: target.version,
            rows: table.height(),
            job: resp.job.map(|j| j.name),
        })
    }
}

fn check_status(resp: Response) -> Result<Response, PublishError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> PublishError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PublishError::Unauthorized(format!("HTTP {status}"))
        }
        _ => PublishError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

fn parse_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, PublishError> {
    let status = resp.status().as_u16();
    resp.json().map_err(|e| PublishError::Rejected {
        status,
        body: format!("unexpected response from {what}: {e}"),
    })
}

fn pick_featurestore(stores: &[FeatureStoreInfo], project: &str) -> Option<i64> {
    let own = format!("{}_featurestore", project.to_lowercase());
    stores
        .iter()
        .find(|s| s.featurestore_name == own)
        .or_else(|| stores.first())
        .map(|s| s.featurestore_id)
}

fn feature_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Int8 | DataType::Int16 | DataType::Int32 => "int",
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => "bigint",
        DataType::Float32 => "float",
        DataType::Float64 => "double",
        DataType::Boolean => "boolean",
        _ => "string",
    }
}

fn feature_defs(schema: &Schema) -> Vec<FeatureDef> {
    schema
        .iter()
        .map(|(name, dtype)| FeatureDef {
            name: name.to_string(),
            kind: feature_type(dtype),
            primary: name.as_str() == PRIMARY_KEY,
        })
        .collect()
}

fn table_to_csv(table: &DataFrame) -> Result<Vec<u8>, PublishError> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut table.clone())
        .map_err(|e| PublishError::Io(format!("failed to serialize table: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_becomes_https_base() {
        let store = HopsworksStore::new("c.app.hopsworks.ai/").unwrap();
        assert_eq!(
            store.url("project/getProjectInfo/demo"),
            "https://c.app.hopsworks.ai/hopsworks-api/api/project/getProjectInfo/demo"
        );
        let local = HopsworksStore::new("http://localhost:8181").unwrap();
        assert_eq!(local.url("/x"), "http://localhost:8181/hopsworks-api/api/x");
    }

    #[test]
    fn auth_failures_map_to_unauthorized() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            PublishError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            PublishError::Unauthorized(_)
        ));
        match status_error(StatusCode::BAD_REQUEST, "bad schema".into()) {
            PublishError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad schema");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn prefers_project_feature_store() {
        let stores: Vec<FeatureStoreInfo> = serde_json::from_value(json!([
            { "featurestoreId": 7, "featurestoreName": "shared_featurestore" },
            { "featurestoreId": 42, "featurestoreName": "demo_featurestore", "onlineEnabled": false },
        ]))
        .unwrap();
        assert_eq!(pick_featurestore(&stores, "Demo"), Some(42));
        assert_eq!(pick_featurestore(&stores, "other"), Some(7));
        assert_eq!(pick_featurestore(&[], "demo"), None);
    }

    #[test]
    fn feature_defs_mark_timestamp_primary() {
        let df = df!(
            "timestamp" => &["2024-01-01T00:00:00Z"],
            "close" => &[1.0f64],
            "hour_of_day" => &[0i64],
        )
        .unwrap();
        let defs = feature_defs(df.schema());
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].kind, "string");
        assert!(defs[0].primary);
        assert_eq!(defs[1].kind, "double");
        assert!(!defs[1].primary);
        assert_eq!(defs[2].kind, "bigint");
    }

    #[test]
    fn csv_payload_has_header_and_rows() {
        let df = df!("timestamp" => &["a", "b"], "close" => &[1.5f64, 2.5]).unwrap();
        let csv = String::from_utf8(table_to_csv(&df).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,close");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn upload_without_credential_makes_no_request() {
        let store = HopsworksStore::with_base_url("http://127.0.0.1:9").unwrap();
        let target = FeatureStoreTarget {
            project_name: "p".into(),
            feature_group: "btc_features".into(),
            version: 1,
            api_key: None,
            source_path: "unused.csv".into(),
        };
        let df = df!("timestamp" => &["a"]).unwrap();
        assert!(matches!(
            store.upload(&target, &df),
            Err(PublishError::MissingCredential)
        ));
    }
}
