//! CSV loading with header normalization.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use polars::prelude::*;
use prices_core::{DataError, Result};
use regex::Regex;
use tracing::{debug, info};

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Normalizes a header to `snake_case`.
///
/// Lowercases and trims, drops punctuation, turns whitespace runs into a
/// single `_` and collapses repeated underscores. Applying it twice gives the
/// same result as applying it once.
///
/// ```
/// use prices_qa::snake_case;
///
/// assert_eq!(snake_case("  Well Name (API) "), "well_name_api");
/// assert_eq!(snake_case("Operator -- Name"), "operator_name");
/// ```
#[must_use]
pub fn snake_case(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    let joined = WHITESPACE.replace_all(&stripped, "_");
    UNDERSCORES.replace_all(&joined, "_").into_owned()
}

/// Reads a headed CSV file and renames every column with [`snake_case`].
///
/// # Errors
/// Returns [`DataError::Io`] if the file does not exist and
/// [`DataError::Parse`] if it cannot be read as CSV or if two headers
/// normalize to the same name.
pub fn load_fractracker_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DataError::Io(format!("CSV not found: {}", path.display())));
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;

    let names = normalized_names(&df)?;
    df.set_column_names(names)
        .map_err(|e| DataError::Parse(e.to_string()))?;

    info!(
        path = %path.display(),
        rows = df.height(),
        cols = df.width(),
        "Loaded CSV"
    );
    Ok(df)
}

fn normalized_names(df: &DataFrame) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(df.width());

    for original in df.get_column_names() {
        let name = snake_case(original);
        if name != original.as_str() {
            debug!(from = %original, to = %name, "Renamed column");
        }
        if !seen.insert(name.clone()) {
            return Err(DataError::Parse(format!(
                "Column {original:?} normalizes to duplicate name {name:?}"
            )));
        }
        names.push(name);
    }

    Ok(names)
}
