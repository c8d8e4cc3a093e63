//! Data model for one SEACE run: caller criteria, resolved options, extracted
//! records, pagination cursor and the tagged outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::seace::errors::RunError;

/// Caller-supplied filters. Blank fields mean "leave that filter at its default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, alias = "departamento")]
    pub department: String,
    #[serde(default, alias = "objeto")]
    pub object_type: String,
    #[serde(default, alias = "anio", deserialize_with = "string_or_number")]
    pub year: String,
}

impl FilterCriteria {
    pub fn new(
        department: impl Into<String>,
        object_type: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            department: department.into(),
            object_type: object_type.into(),
            year: year.into(),
        }
    }

    /// The raw value supplied for one criterion.
    pub fn value(&self, criterion: Criterion) -> &str {
        match criterion {
            Criterion::Department => &self.department,
            Criterion::ObjectType => &self.object_type,
            Criterion::Year => &self.year,
        }
    }

    pub fn is_empty(&self) -> bool {
        Criterion::ALL
            .iter()
            .all(|c| self.value(*c).trim().is_empty())
    }
}

/// Accepts `"2025"`, `2025` or `null` for the year.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Int(n)) => n.to_string(),
        Some(Raw::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

/// One filterable axis of the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Department,
    ObjectType,
    Year,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [Self::Department, Self::ObjectType, Self::Year];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::ObjectType => "objectType",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller value mapped towards the widget's own option representation.
///
/// The SEACE dropdowns expose no stable option values, only their labels, so
/// `ui_identifier` is a pinned on-screen label: when set and present in the
/// open panel it is clicked verbatim, bypassing fuzzy matching. The resolver
/// leaves it unset and the option is then located by [`pick_option`] over the
/// visible labels at interaction time.
///
/// [`pick_option`]: crate::seace::resolver::pick_option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOption {
    pub criterion: Criterion,
    pub raw_value: String,
    pub ui_label: String,
    /// Exact option label to click, compared against the panel's labels.
    pub ui_identifier: Option<String>,
}

/// One row of the SEACE result table, read positionally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub numero: String,
    pub entidad: String,
    pub fecha_publicacion: String,
    pub nomenclatura: String,
    pub reiniciado_desde: String,
    pub objeto: String,
    pub descripcion: String,
}

impl ResultRecord {
    /// Number of leading cells a row must carry to be a record.
    pub const CELL_COUNT: usize = 7;

    /// Map the first seven cells onto the named fields; `None` for short rows.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        let [
            numero,
            entidad,
            fecha_publicacion,
            nomenclatura,
            reiniciado_desde,
            objeto,
            descripcion,
        ] = cells.get(..Self::CELL_COUNT)?
        else {
            return None;
        };

        Some(Self {
            numero: numero.clone(),
            entidad: entidad.clone(),
            fecha_publicacion: fecha_publicacion.clone(),
            nomenclatura: nomenclatura.clone(),
            reiniciado_desde: reiniciado_desde.clone(),
            objeto: objeto.clone(),
            descripcion: descripcion.clone(),
        })
    }
}

/// Position of the pagination walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// 1-based index of the page currently rendered.
    pub page_index: u32,
    pub has_next: bool,
}

impl PageCursor {
    pub fn first() -> Self {
        Self {
            page_index: 1,
            has_next: true,
        }
    }

    pub fn advance(&mut self) {
        self.page_index += 1;
    }

    pub fn finish(&mut self) {
        self.has_next = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub source: String,
    pub scraped_at: DateTime<Utc>,
    pub pages_processed: u32,
    /// The criteria exactly as supplied, including values that could not be applied.
    pub filters_applied: FilterCriteria,
    pub filters_skipped: Vec<Criterion>,
    /// False when pagination stopped at the page cap with a next page still available.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub items: Vec<ResultRecord>,
    pub total: usize,
    pub meta: RunMeta,
}

/// Paths written by diagnostic capture; `None` where that capture failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub screenshot_path: Option<String>,
    pub html_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub run_id: String,
    pub error: String,
    pub error_kind: &'static str,
    pub diagnostics: Diagnostics,
    #[serde(skip)]
    pub cause: RunError,
}

impl RunFailure {
    pub fn new(run_id: String, cause: RunError, diagnostics: Diagnostics) -> Self {
        Self {
            run_id,
            error: cause.to_string(),
            error_kind: cause.kind(),
            diagnostics,
            cause,
        }
    }
}

/// Exactly one of these is produced per run.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunOutcome {
    Succeeded(RunReport),
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            Self::Succeeded(report) => &report.run_id,
            Self::Failed(failure) => &failure.run_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Succeeded(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_criteria_accepts_numeric_year() {
        let criteria: FilterCriteria = serde_json::from_value(json!({
            "department": "LIMA",
            "objectType": "OBRA",
            "year": 2025
        }))
        .unwrap();
        assert_eq!(criteria, FilterCriteria::new("LIMA", "OBRA", "2025"));
    }

    #[test]
    fn test_criteria_accepts_spanish_keys() {
        let criteria: FilterCriteria = serde_json::from_value(json!({
            "departamento": "CUSCO",
            "objeto": "Bien",
            "anio": "2024"
        }))
        .unwrap();
        assert_eq!(criteria, FilterCriteria::new("CUSCO", "Bien", "2024"));
    }

    #[test]
    fn test_criteria_missing_fields_default_to_blank() {
        let criteria: FilterCriteria =
            serde_json::from_value(json!({ "department": "LIMA", "year": null })).unwrap();
        assert_eq!(criteria.object_type, "");
        assert_eq!(criteria.year, "");
        assert!(!criteria.is_empty());
        assert!(FilterCriteria::default().is_empty());
    }

    #[test]
    fn test_record_from_cells_maps_positionally() {
        let record = ResultRecord::from_cells(&cells(&[
            "1", "MUNI LIMA", "01/02/2025", "AS-1-2025", "", "Obra", "Pistas", "extra",
        ]))
        .unwrap();
        assert_eq!(record.numero, "1");
        assert_eq!(record.entidad, "MUNI LIMA");
        assert_eq!(record.fecha_publicacion, "01/02/2025");
        assert_eq!(record.nomenclatura, "AS-1-2025");
        assert_eq!(record.reiniciado_desde, "");
        assert_eq!(record.objeto, "Obra");
        assert_eq!(record.descripcion, "Pistas");
    }

    #[test]
    fn test_record_from_short_row_is_none() {
        assert!(ResultRecord::from_cells(&cells(&["1", "2", "3", "4", "5", "6"])).is_none());
        assert!(ResultRecord::from_cells(&[]).is_none());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ResultRecord::from_cells(&cells(&["1", "E", "F", "N", "R", "O", "D"])).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fechaPublicacion"], "F");
        assert_eq!(value["reiniciadoDesde"], "R");
    }

    #[test]
    fn test_failure_serializes_error_and_null_paths() {
        let failure = RunFailure::new(
            "run-1".into(),
            RunError::SchemaMismatch("tbody".into()),
            Diagnostics {
                screenshot_path: Some("debug/run-1.png".into()),
                html_path: None,
            },
        );
        let value = serde_json::to_value(RunOutcome::Failed(failure)).unwrap();
        assert_eq!(value["runId"], "run-1");
        assert_eq!(value["errorKind"], "schema_mismatch");
        assert!(value["error"].as_str().unwrap().contains("tbody"));
        assert_eq!(value["diagnostics"]["screenshotPath"], "debug/run-1.png");
        assert!(value["diagnostics"]["htmlPath"].is_null());
        assert!(value.get("items").is_none());
    }

    #[test]
    fn test_cursor_lifecycle() {
        let mut cursor = PageCursor::first();
        assert_eq!(cursor.page_index, 1);
        cursor.advance();
        cursor.finish();
        assert_eq!(cursor.page_index, 2);
        assert!(!cursor.has_next);
    }
}
