//! End-to-end pipeline: fetch EIA data, persist it, and write QA artifacts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use polars::prelude::*;
use tracing::{info, instrument};

use prices_core::{
    DataError, EiaResult, HttpCache, HttpSession, ProjectPaths, QaSummary, Result, Settings, get_paths,
    load_settings,
};
use prices_eia::{
    DEFAULT_CACHE_NAME, DEFAULT_EXPIRE_AFTER, fetch_eia_v2_all_pages, make_cached_session,
    route_url,
};
use prices_qa::{column_profile_frame, qa_column_profile, qa_overview, write_profile_report};

/// Wires project paths, settings, and an HTTP session into the fetch and QA
/// steps of the workflow.
///
/// # Example
///
/// ```rust,ignore
/// use prices::EiaPipeline;
///
/// #[tokio::main]
/// async fn main() -> prices::Result<()> {
///     let pipeline = EiaPipeline::from_env(None)?;
///
///     let params = vec![
///         ("frequency".to_string(), "monthly".to_string()),
///         ("data[]".to_string(), "price".to_string()),
///     ];
///     let result = pipeline.fetch("electricity/retail-sales/data", &params).await?;
///     pipeline.qa_report(&result.frame, "retail_sales")?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EiaPipeline {
    paths: ProjectPaths,
    settings: Settings,
    session: Arc<dyn HttpSession>,
}

impl EiaPipeline {
    /// Creates a pipeline from explicit parts.
    pub fn new(paths: ProjectPaths, settings: Settings, session: Arc<dyn HttpSession>) -> Self {
        Self {
            paths,
            settings,
            session,
        }
    }

    /// Discovers the repository from `start`, creates the derived
    /// directories, loads settings (reading `.env`), and opens the response
    /// cache at `<repo_root>/http_cache.sqlite`.
    ///
    /// # Errors
    /// Returns [`DataError::Config`] if no repository root is found or the API
    /// key is missing, and [`DataError::Cache`] if the cache cannot be opened.
    pub fn from_env(start: Option<&Path>) -> Result<Self> {
        let paths = get_paths(start, true)?;
        let settings = load_settings(true)?;
        let session = make_cached_session(cache_path(&paths), DEFAULT_EXPIRE_AFTER)?;
        Ok(Self::new(paths, settings, Arc::new(session)))
    }

    /// Project paths in use.
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetches every page of an EIA v2 route, e.g.
    /// `electricity/retail-sales/data`.
    ///
    /// # Errors
    /// See [`fetch_eia_v2_all_pages`].
    #[instrument(skip(self, params))]
    pub async fn fetch(&self, route: &str, params: &[(String, String)]) -> Result<EiaResult> {
        fetch_eia_v2_all_pages(
            self.session.as_ref(),
            &route_url(route),
            params,
            &self.settings.eia_api_key,
            self.settings.eia_page_size,
            self.settings.eia_timeout,
        )
        .await
    }

    /// Fetches a route and stores it as `data/raw/<file_stem>.parquet`.
    ///
    /// # Errors
    /// Propagates fetch errors; returns [`DataError::Io`] if the file cannot
    /// be written.
    pub async fn fetch_to_parquet(
        &self,
        route: &str,
        params: &[(String, String)],
        file_stem: &str,
    ) -> Result<PathBuf> {
        let mut result = self.fetch(route, params).await?;
        let path = self.paths.data_raw.join(format!("{file_stem}.parquet"));
        write_parquet(&mut result.frame, &path)?;
        Ok(path)
    }

    /// Writes a profiling report to `reports/eda/<name>.html`.
    ///
    /// # Errors
    /// See [`profile_report`].
    pub fn profile(&self, df: &DataFrame, name: &str, sample: Option<usize>) -> Result<PathBuf> {
        profile_report(&self.paths, df, name, sample)
    }

    /// Writes QA artifacts to `reports/qa/`. See [`qa_report`].
    ///
    /// # Errors
    /// See [`qa_report`].
    pub fn qa_report(&self, df: &DataFrame, name: &str) -> Result<QaSummary> {
        qa_report(&self.paths, df, name)
    }
}

/// Location of the response cache, `<repo_root>/http_cache.sqlite`.
#[must_use]
pub fn cache_path(paths: &ProjectPaths) -> PathBuf {
    paths.repo_root.join(format!("{DEFAULT_CACHE_NAME}.sqlite"))
}

/// Drops cached responses stored more than `max_age` ago and returns how
/// many were removed.
///
/// # Errors
/// Returns [`DataError::Cache`] if the cache cannot be updated.
pub async fn prune_cache(cache: &dyn HttpCache, max_age: Duration) -> Result<usize> {
    let removed = cache.invalidate_stale(max_age).await?;
    info!(removed, max_age_secs = max_age.as_secs(), "Pruned response cache");
    Ok(removed)
}

/// Drops every cached response.
///
/// # Errors
/// Returns [`DataError::Cache`] if the cache cannot be updated.
pub async fn clear_cache(cache: &dyn HttpCache) -> Result<()> {
    cache.clear().await?;
    info!("Cleared response cache");
    Ok(())
}

/// Writes `reports/eda/<name>.html` and returns its path.
///
/// # Errors
/// Propagates [`write_profile_report`] errors.
pub fn profile_report(
    paths: &ProjectPaths,
    df: &DataFrame,
    name: &str,
    sample: Option<usize>,
) -> Result<PathBuf> {
    let path = paths.reports_eda.join(format!("{name}.html"));
    write_profile_report(df, &path, name, sample)?;
    Ok(path)
}

/// Computes the QA summary and column profile of `df`, writing
/// `reports/qa/<name>_overview.json` and `reports/qa/<name>_columns.csv`.
///
/// # Errors
/// Returns [`DataError::Io`] if an artifact cannot be written.
pub fn qa_report(paths: &ProjectPaths, df: &DataFrame, name: &str) -> Result<QaSummary> {
    let summary = qa_overview(df, name)?;
    let mut columns = column_profile_frame(&qa_column_profile(df)?)?;

    fs::create_dir_all(&paths.reports_qa).map_err(|e| io_error(&paths.reports_qa, e))?;

    let overview_path = paths.reports_qa.join(format!("{name}_overview.json"));
    let json =
        serde_json::to_string_pretty(&summary).map_err(|e| DataError::Other(e.to_string()))?;
    fs::write(&overview_path, json).map_err(|e| io_error(&overview_path, e))?;

    let columns_path = paths.reports_qa.join(format!("{name}_columns.csv"));
    let mut file = File::create(&columns_path).map_err(|e| io_error(&columns_path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut columns)
        .map_err(|e| io_error(&columns_path, e))?;

    info!(
        dataset = name,
        rows = summary.rows,
        duplicate_rows = summary.duplicate_rows,
        missing_cells = summary.missing_cells,
        path = %paths.reports_qa.display(),
        "Wrote QA report"
    );
    Ok(summary)
}

/// Writes `df` as Parquet, creating parent directories.
///
/// # Errors
/// Returns [`DataError::Io`] if the file cannot be written.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| io_error(path, e))?;

    info!(path = %path.display(), rows = df.height(), "Wrote parquet");
    Ok(())
}

/// Reads a table from a `.parquet` file, or from a headed CSV otherwise.
///
/// # Errors
/// Returns [`DataError::Io`] if the file cannot be opened and
/// [`DataError::Parse`] if it cannot be decoded.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let is_parquet = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))
    } else {
        prices_qa::load_fractracker_csv(path)
    }
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> DataError {
    DataError::Io(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use chrono::{TimeDelta, Utc};
    use prices_cache::SqliteCache;
    use prices_core::CachedResponse;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Session that serves retail-sales pages of two rows each.
    #[derive(Debug, Default)]
    struct RetailSession {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpSession for RetailSession {
        async fn get(
            &self,
            url: &str,
            params: &[(String, String)],
            _timeout: Duration,
        ) -> Result<Value> {
            self.urls.lock().unwrap().push(url.to_string());
            let offset: usize = params
                .iter()
                .find(|(k, _)| k == "offset")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);

            let data: Vec<Value> = (offset..(offset + 2).min(3))
                .map(|i| {
                    json!({
                        "period": format!("2024-0{}", i + 1),
                        "stateid": "CA",
                        "sectorid": "RES",
                        "price": 20.0 + i as f64,
                    })
                })
                .collect();
            Ok(json!({"response": {"total": "3", "data": data}}))
        }
    }

    fn pipeline(dir: &TempDir) -> (EiaPipeline, Arc<RetailSession>) {
        let paths = ProjectPaths::from_repo_root(dir.path()).ensure_dirs().unwrap();
        let mut settings = Settings::from_api_key(Some("test-key".to_string())).unwrap();
        settings.eia_page_size = 2;
        let session = Arc::new(RetailSession::default());
        (EiaPipeline::new(paths, settings, session.clone()), session)
    }

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("stateid".into(), vec![Some("CA"), Some("CA"), None]),
            Column::new("price".into(), vec![Some(20.5), Some(20.5), Some(13.0)]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_uses_route_url() {
        let dir = TempDir::new().unwrap();
        let (pipeline, session) = pipeline(&dir);

        let result = pipeline
            .fetch("electricity/retail-sales/data", &[])
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.rows(), 3);
        let urls = session.urls.lock().unwrap().clone();
        assert_eq!(urls.len(), 2);
        assert!(
            urls.iter()
                .all(|u| u == "https://api.eia.gov/v2/electricity/retail-sales/data")
        );
    }

    #[tokio::test]
    async fn test_fetch_to_parquet_roundtrip() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let path = pipeline
            .fetch_to_parquet("electricity/retail-sales/data", &[], "retail_sales")
            .await
            .unwrap();

        assert_eq!(path, pipeline.paths().data_raw.join("retail_sales.parquet"));
        let df = read_table(&path).unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["period", "stateid", "sectorid", "price"]);
    }

    #[test]
    fn test_qa_report_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let summary = pipeline.qa_report(&sample_frame(), "sample").unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.missing_cells, 1);

        let qa_dir = &pipeline.paths().reports_qa;
        let overview = fs::read_to_string(qa_dir.join("sample_overview.json")).unwrap();
        let parsed: QaSummary = serde_json::from_str(&overview).unwrap();
        assert_eq!(parsed, summary);

        let columns = fs::read_to_string(qa_dir.join("sample_columns.csv")).unwrap();
        let mut lines = columns.lines();
        assert_eq!(
            lines.next().unwrap(),
            "column,dtype,n_missing,pct_missing,n_unique"
        );
        assert!(lines.next().unwrap().starts_with("stateid,"));
    }

    #[test]
    fn test_profile_writes_html() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let path = pipeline.profile(&sample_frame(), "sample", None).unwrap();

        assert_eq!(path, pipeline.paths().reports_eda.join("sample.html"));
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("stateid"));
    }

    #[tokio::test]
    async fn test_prune_cache_drops_only_expired_entries() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::from_repo_root(dir.path());
        let path = cache_path(&paths);
        assert_eq!(path, dir.path().join("http_cache.sqlite"));

        let cache = SqliteCache::new(&path).unwrap();
        let mut old = CachedResponse::new(route_url("electricity/retail-sales/data"), 200, "{}");
        old.cached_at = Utc::now() - TimeDelta::hours(48);
        cache.put("old", &old).await.unwrap();
        let fresh = CachedResponse::new(route_url("electricity/rto/region-data/data"), 200, "{}");
        cache.put("fresh", &fresh).await.unwrap();

        let removed = prune_cache(&cache, DEFAULT_EXPIRE_AFTER).await.unwrap();

        assert_eq!(removed, 1);
        assert!(cache.get("old").await.unwrap().is_none());
        assert!(cache.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_cache_empties_store() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteCache::new(cache_path(&ProjectPaths::from_repo_root(dir.path()))).unwrap();
        cache
            .put("key", &CachedResponse::new("https://api.eia.gov/v2", 200, "{}"))
            .await
            .unwrap();

        clear_cache(&cache).await.unwrap();

        assert!(cache.get("key").await.unwrap().is_none());
        assert_eq!(prune_cache(&cache, Duration::ZERO).await.unwrap(), 0);
    }

    #[test]
    fn test_read_table_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wells.csv");
        fs::write(&path, "Well Name,State\nA,PA\n").unwrap();

        let df = read_table(&path).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["well_name", "state"]);
    }
}
