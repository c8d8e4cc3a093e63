//! The one UI shape a run is written against.
//!
//! The public SEACE search page is a JSF/PrimeFaces form: each filter is a
//! `selectOneMenu` (a styled div that reveals a floating `<ul>` panel), the
//! results live in a lazily rendered `dataTable` and paging is a PrimeFaces
//! paginator. Ids are prefixed by their naming containers, so locators match
//! on id suffixes.

use crate::seace::driver::Locator;
use crate::seace::models::Criterion;

pub const DEFAULT_SEACE_URL: &str =
    "https://prod2.seace.gob.pe/seacebus-uiwd-pub/buscadorPublico/buscadorPublico.xhtml";

/// Locators for one filter dropdown.
#[derive(Debug, Clone)]
pub struct DropdownLayout {
    /// The clickable composite control.
    pub control: Locator,
    /// The items of its floating option panel.
    pub items: Locator,
}

impl DropdownLayout {
    fn for_field(field: &str) -> Self {
        Self {
            control: Locator::css(format!("div.ui-selectonemenu[id$='{field}']")),
            items: Locator::css(format!(
                "div.ui-selectonemenu-panel[id$='{field}_panel'] li.ui-selectonemenu-item"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeaceLayout {
    pub department: DropdownLayout,
    pub object_type: DropdownLayout,
    pub year: DropdownLayout,
    pub search_button: Locator,
    /// Container whose absence means the page is not the expected shape.
    pub table_body: Locator,
    /// Every row of the result table, placeholder included.
    pub rows: Locator,
    /// The "no records found" row PrimeFaces renders for empty tables.
    pub placeholder_row: Locator,
    pub first_row: Locator,
    pub next_page: Locator,
    /// Class the paginator puts on a disabled control.
    pub disabled_class: String,
}

impl SeaceLayout {
    pub fn dropdown(&self, criterion: Criterion) -> &DropdownLayout {
        match criterion {
            Criterion::Department => &self.department,
            Criterion::ObjectType => &self.object_type,
            Criterion::Year => &self.year,
        }
    }
}

impl Default for SeaceLayout {
    fn default() -> Self {
        let body = "tbody[id$='dtProcesos_data']";
        Self {
            department: DropdownLayout::for_field("departamento"),
            object_type: DropdownLayout::for_field("objetoContratacion"),
            year: DropdownLayout::for_field("anioConvocatoria"),
            search_button: Locator::css("button[id$='btnBuscarSelToken']"),
            table_body: Locator::css(body),
            rows: Locator::css(format!("{body} > tr")),
            placeholder_row: Locator::css(format!("{body} > tr.ui-datatable-empty-message")),
            first_row: Locator::css(format!("{body} > tr:first-child")),
            next_page: Locator::css("div[id$='dtProcesos_paginator_bottom'] a.ui-paginator-next"),
            disabled_class: "ui-state-disabled".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropdowns_are_distinct_per_criterion() {
        let layout = SeaceLayout::default();
        let controls: Vec<_> = Criterion::ALL
            .iter()
            .map(|c| layout.dropdown(*c).control.as_str().to_owned())
            .collect();
        assert_eq!(controls.len(), 3);
        assert_ne!(controls[0], controls[1]);
        assert_ne!(controls[1], controls[2]);
        assert!(layout.dropdown(Criterion::Year).items.as_str().contains("anioConvocatoria_panel"));
    }

    #[test]
    fn test_row_locators_share_the_table_body() {
        let layout = SeaceLayout::default();
        let body = layout.table_body.as_str();
        assert!(layout.rows.as_str().starts_with(body));
        assert!(layout.placeholder_row.as_str().starts_with(body));
        assert!(layout.first_row.as_str().starts_with(body));
    }
}
