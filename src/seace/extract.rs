//! Parses one rendered result page into [`ResultRecord`]s.

use html_scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use crate::seace::errors::RunError;
use crate::seace::layout::SeaceLayout;
use crate::seace::models::ResultRecord;
use crate::utils::collapse_whitespace;

/// Records read from one page, plus how many rows were discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub records: Vec<ResultRecord>,
    pub dropped_rows: usize,
}

pub struct RecordExtractor {
    table_body: Selector,
    table_locator: String,
}

impl RecordExtractor {
    pub fn new(layout: &SeaceLayout) -> Result<Self, RunError> {
        let table_locator = layout.table_body.as_str().to_owned();
        let table_body = Selector::parse(&table_locator).map_err(|e| {
            RunError::SchemaMismatch(format!("{table_locator} (invalid selector: {e:?})"))
        })?;
        Ok(Self {
            table_body,
            table_locator,
        })
    }

    /// Extract every well-formed row of the result table.
    ///
    /// Rows are the direct `<tr>` children of the table body and cells are
    /// their direct `<td>` children, so markup nested inside a cell never
    /// shifts the positional mapping. Rows with fewer than seven cells
    /// (the empty-results placeholder, spacer rows) are dropped. Only a
    /// missing table body is an error.
    pub fn extract(&self, markup: &str) -> Result<ExtractedPage, RunError> {
        let html = Html::parse_document(markup);
        let body = html
            .select(&self.table_body)
            .next()
            .ok_or_else(|| RunError::SchemaMismatch(self.table_locator.clone()))?;

        let mut page = ExtractedPage::default();
        for (idx, row) in child_elements(body, "tr").enumerate() {
            let cells: Vec<String> = child_elements(row, "td")
                .map(|td| collapse_whitespace(&td.text().collect::<String>()))
                .collect();

            match ResultRecord::from_cells(&cells) {
                Some(record) => page.records.push(record),
                None => {
                    trace!(row = idx, cells = cells.len(), "dropping short row");
                    page.dropped_rows += 1;
                }
            }
        }

        debug!(
            records = page.records.len(),
            dropped = page.dropped_rows,
            "extracted result page"
        );
        Ok(page)
    }
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
        format!("<tr>{tds}</tr>")
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><form><table>
                <thead><tr><th>N°</th><th>Entidad</th></tr></thead>
                <tbody id="tbBuscador:idFormBuscarProceso:dtProcesos_data">{}</tbody>
            </table></form></body></html>"#,
            rows.join("")
        )
    }

    fn extractor() -> RecordExtractor {
        RecordExtractor::new(&SeaceLayout::default()).unwrap()
    }

    #[test]
    fn test_extract_maps_cells_positionally() {
        let html = page(&[row(&[
            "1",
            "MUNICIPALIDAD DE LIMA",
            "05/03/2025 10:00",
            "AS-SM-4-2025-MML-1",
            "",
            "Obra",
            "Mejoramiento de pistas",
            "S/ 1,000.00",
        ])]);
        let result = extractor().extract(&html).unwrap();
        assert_eq!(result.dropped_rows, 0);
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.numero, "1");
        assert_eq!(record.entidad, "MUNICIPALIDAD DE LIMA");
        assert_eq!(record.fecha_publicacion, "05/03/2025 10:00");
        assert_eq!(record.nomenclatura, "AS-SM-4-2025-MML-1");
        assert_eq!(record.reiniciado_desde, "");
        assert_eq!(record.objeto, "Obra");
        assert_eq!(record.descripcion, "Mejoramiento de pistas");
    }

    #[test]
    fn test_extract_drops_short_and_placeholder_rows() {
        let html = page(&[
            row(&["1", "A", "B", "C", "D", "E", "F"]),
            row(&["2", "A", "B"]),
            r#"<tr class="ui-datatable-empty-message"><td colspan="9">No se encontraron Datos</td></tr>"#.to_owned(),
            row(&["3", "A", "B", "C", "D", "E", "F"]),
        ]);
        let result = extractor().extract(&html).unwrap();
        let numbers: Vec<_> = result.records.iter().map(|r| r.numero.as_str()).collect();
        assert_eq!(numbers, ["1", "3"]);
        assert_eq!(result.dropped_rows, 2);
    }

    #[test]
    fn test_extract_trims_and_collapses_cell_text() {
        let html = page(&[row(&[
            " 7 ",
            "<span>GOBIERNO</span>\n   REGIONAL",
            "x",
            "y",
            "z",
            "  Bien ",
            "<div>Compra\t de <b>equipos</b></div>",
        ])]);
        let record = &extractor().extract(&html).unwrap().records[0];
        assert_eq!(record.numero, "7");
        assert_eq!(record.entidad, "GOBIERNO REGIONAL");
        assert_eq!(record.objeto, "Bien");
        assert_eq!(record.descripcion, "Compra de equipos");
    }

    #[test]
    fn test_extract_ignores_nested_table_cells() {
        let nested = "<table><tr><td>a</td><td>b</td><td>c</td><td>d</td></tr></table>";
        let html = page(&[row(&["1", nested, "B", "C", "D", "E", "F"])]);
        let result = extractor().extract(&html).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].fecha_publicacion, "B");
    }

    #[test]
    fn test_extract_empty_body_is_not_an_error() {
        let result = extractor().extract(&page(&[])).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.dropped_rows, 0);
    }

    #[test]
    fn test_extract_missing_table_is_schema_mismatch() {
        let err = extractor()
            .extract("<html><body><p>Mantenimiento</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch(_)));
    }
}
