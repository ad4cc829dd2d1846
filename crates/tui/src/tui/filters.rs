use crate::core::FacetSummary;
use crate::model::{Category, Facet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OverlayPurpose {
    /// Narrow the candidate list to one category.
    Filter,
    /// Bulk-select every known entity in one category.
    Select,
}

impl OverlayPurpose {
    pub(crate) fn title(self) -> &'static str {
        match self {
            OverlayPurpose::Filter => "Filter by category",
            OverlayPurpose::Select => "Select everyone in a category",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FacetColumn {
    pub(crate) facet: Facet,
    pub(crate) values: Vec<(String, usize)>,
}

/// Column-per-facet chooser. In filter mode row 0 of every column means
/// "no category".
#[derive(Debug, Clone)]
pub(crate) struct CategoryOverlay {
    pub(crate) purpose: OverlayPurpose,
    pub(crate) columns: Vec<FacetColumn>,
    pub(crate) column: usize,
    pub(crate) rows: Vec<usize>,
    pub(crate) active: Option<Category>,
}

impl CategoryOverlay {
    pub(crate) fn new(
        purpose: OverlayPurpose,
        summary: &FacetSummary,
        active: Option<&Category>,
    ) -> Self {
        let mut columns: Vec<FacetColumn> = Facet::ALL
            .iter()
            .map(|facet| FacetColumn {
                facet: *facet,
                values: summary.counts(*facet),
            })
            .filter(|column| !column.values.is_empty())
            .collect();

        // Keep an active filter reachable even when no loaded entity carries it.
        if let Some(active) = active {
            match columns.iter_mut().find(|c| c.facet == active.facet) {
                Some(column) => {
                    if !column.values.iter().any(|(v, _)| *v == active.value) {
                        column.values.push((active.value.clone(), 0));
                    }
                }
                None => columns.push(FacetColumn {
                    facet: active.facet,
                    values: vec![(active.value.clone(), 0)],
                }),
            }
        }

        let mut overlay = Self {
            purpose,
            rows: vec![0; columns.len()],
            columns,
            column: 0,
            active: active.cloned(),
        };
        overlay.focus_active();
        overlay
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn offset(&self) -> usize {
        match self.purpose {
            OverlayPurpose::Filter => 1,
            OverlayPurpose::Select => 0,
        }
    }

    pub(crate) fn row_labels(&self, column: usize) -> Vec<String> {
        let Some(facet_column) = self.columns.get(column) else {
            return Vec::new();
        };
        let mut labels = Vec::with_capacity(facet_column.values.len() + 1);
        if self.purpose == OverlayPurpose::Filter {
            labels.push(format!("Any {}", facet_column.facet.title().to_lowercase()));
        }
        labels.extend(
            facet_column
                .values
                .iter()
                .map(|(value, count)| format!("{value} ({count})")),
        );
        labels
    }

    pub(crate) fn current_len(&self) -> usize {
        self.columns
            .get(self.column)
            .map(|c| c.values.len() + self.offset())
            .unwrap_or(0)
    }

    pub(crate) fn next_column(&mut self) {
        if !self.columns.is_empty() {
            self.column = (self.column + 1) % self.columns.len();
        }
    }

    pub(crate) fn prev_column(&mut self) {
        if !self.columns.is_empty() {
            self.column = self
                .column
                .checked_sub(1)
                .unwrap_or(self.columns.len() - 1);
        }
    }

    pub(crate) fn next_row(&mut self) {
        let max = self.current_len().saturating_sub(1);
        if let Some(row) = self.rows.get_mut(self.column) {
            *row = if *row >= max { 0 } else { *row + 1 };
        }
    }

    pub(crate) fn prev_row(&mut self) {
        let max = self.current_len().saturating_sub(1);
        if let Some(row) = self.rows.get_mut(self.column) {
            *row = if *row == 0 { max } else { *row - 1 };
        }
    }

    /// The category under the cursor, or `None` on an "Any" row.
    pub(crate) fn highlighted(&self) -> Option<Category> {
        let column = self.columns.get(self.column)?;
        let row = self.rows.get(self.column)?.checked_sub(self.offset())?;
        column
            .values
            .get(row)
            .map(|(value, _)| Category::new(column.facet, value))
    }

    fn focus_active(&mut self) {
        let Some(active) = self.active.clone() else {
            return;
        };
        let offset = self.offset();
        if let Some(index) = self.columns.iter().position(|c| c.facet == active.facet) {
            self.column = index;
            if let Some(pos) = self.columns[index]
                .values
                .iter()
                .position(|(v, _)| *v == active.value)
            {
                self.rows[index] = pos + offset;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityKind};
    use pretty_assertions::assert_eq;

    fn summary() -> FacetSummary {
        let people = vec![
            Entity::new(1, EntityKind::User, "A").with_category(Category::role("teacher")),
            Entity::new(2, EntityKind::User, "B").with_category(Category::role("teacher")),
            Entity::new(3, EntityKind::User, "C")
                .with_category(Category::role("schooladmin"))
                .with_category(Category::new(Facet::Region, "bakı")),
        ];
        FacetSummary::from_entities(&people)
    }

    #[test]
    fn filter_overlay_starts_on_the_active_category() {
        let active = Category::role("schooladmin");
        let overlay = CategoryOverlay::new(OverlayPurpose::Filter, &summary(), Some(&active));

        assert_eq!(overlay.highlighted(), Some(active));
        assert_eq!(
            overlay.row_labels(0),
            vec!["Any role", "teacher (2)", "schooladmin (1)"]
        );
    }

    #[test]
    fn any_row_clears_the_filter() {
        let mut overlay = CategoryOverlay::new(OverlayPurpose::Filter, &summary(), None);
        assert_eq!(overlay.highlighted(), None);
        overlay.next_row();
        assert_eq!(overlay.highlighted(), Some(Category::role("teacher")));
    }

    #[test]
    fn select_overlay_has_no_any_row_and_wraps() {
        let mut overlay = CategoryOverlay::new(OverlayPurpose::Select, &summary(), None);
        assert_eq!(overlay.highlighted(), Some(Category::role("teacher")));
        overlay.prev_row();
        assert_eq!(overlay.highlighted(), Some(Category::role("schooladmin")));

        overlay.next_column();
        assert_eq!(
            overlay.highlighted(),
            Some(Category::new(Facet::Region, "bakı"))
        );
        overlay.next_column();
        assert_eq!(overlay.column, 0);
    }

    #[test]
    fn unknown_active_filter_stays_selectable() {
        let active = Category::level(4);
        let overlay = CategoryOverlay::new(OverlayPurpose::Filter, &summary(), Some(&active));
        assert_eq!(overlay.highlighted(), Some(active));
    }
}
