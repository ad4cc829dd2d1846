use std::cmp::min;

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::{Chip, GroupKey, RegionGroup};
use crate::model::{Entity, EntityId, Facet};

pub const BG_BASE: Color = Color::Rgb(14, 17, 23);
pub const BG_PANEL: Color = Color::Rgb(22, 26, 34);
pub const BG_ACCENT: Color = Color::Rgb(32, 37, 47);
pub const FG_ACCENT: Color = Color::Rgb(120, 161, 255);

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = min(width, area.width);
    let h = min(height, area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}

pub fn inset_rect(area: Rect, padding: u16) -> Rect {
    if area.width == 0 || area.height == 0 {
        return area;
    }
    let px = padding.min(area.width / 2);
    let py = padding.min(area.height / 2);
    Rect {
        x: area.x + px,
        y: area.y + py,
        width: area.width.saturating_sub(px * 2),
        height: area.height.saturating_sub(py * 2),
    }
}

pub fn accent_title(text: &str) -> Line<'static> {
    Line::from(vec![Span::styled(
        text.to_owned(),
        Style::default().fg(FG_ACCENT).add_modifier(Modifier::BOLD),
    )])
}

/// Cut `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

/// Compact label for a list row: the role or level tag followed by where the
/// entity sits in the hierarchy.
pub fn row_context(entity: &Entity) -> String {
    let tag = entity
        .category_value(Facet::Role)
        .or_else(|| entity.category_value(Facet::InstitutionType))
        .map(str::to_string)
        .or_else(|| {
            entity
                .category_value(Facet::Level)
                .map(|level| format!("level {level}"))
        });

    match (tag, entity.path.as_deref()) {
        (Some(tag), Some(path)) => format!("{tag} · {path}"),
        (Some(tag), None) => tag,
        (None, Some(path)) => path.to_string(),
        (None, None) => String::new(),
    }
}

/// Chip labels for the summary strip, collapsing the tail past `max`.
pub fn chip_labels(chips: &[Chip], max: usize) -> Vec<String> {
    let mut labels: Vec<String> = chips
        .iter()
        .take(max)
        .map(|chip| {
            if chip.resolved {
                chip.label.clone()
            } else {
                format!("{}?", chip.label)
            }
        })
        .collect();
    if chips.len() > max {
        labels.push(format!("+{} more", chips.len() - max));
    }
    labels
}

/// One line of the grouped view: a region header or a sector nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub key: GroupKey,
    pub depth: usize,
    pub members: Vec<EntityId>,
}

/// Flatten region groups into rows, each region followed by its sectors.
pub fn group_rows(groups: &[RegionGroup]) -> Vec<GroupRow> {
    let mut rows = Vec::new();
    for group in groups {
        let mut members = group.direct.clone();
        for sector in &group.sectors {
            members.extend(sector.members.iter().cloned());
        }
        rows.push(GroupRow {
            key: group.key(),
            depth: 0,
            members,
        });
        rows.extend(group.sectors.iter().map(|sector| GroupRow {
            key: GroupKey::Sector(sector.sector.clone()),
            depth: 1,
            members: sector.members.clone(),
        }));
    }
    rows
}

pub fn build_help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/", "Search by name, email, code or hierarchy"),
        ("j / k or ↓ / ↑", "Move the cursor"),
        ("PgDn / PgUp", "Move one screen"),
        ("Home / End", "Jump to the first or last row"),
        ("Space / Enter", "Select or deselect the row"),
        ("a", "Select every visible candidate"),
        ("c", "Select everyone in a category"),
        ("g", "Select the cursor row's region or sector"),
        ("G", "Toggle the region / sector grouped view"),
        ("f", "Filter by category"),
        ("R", "Reset query and category filter"),
        ("d / Backspace", "Remove the last chip"),
        ("x", "Clear the selection"),
        ("m", "Load the next page"),
        ("r", "Retry a failed fetch"),
        ("b", "Toggle broader targeting (locks the selection)"),
        ("D", "Show recent picker events"),
        ("?", "Toggle this help overlay"),
        ("q / Ctrl+C", "Finish and print the selection"),
        ("Esc", "Cancel/close overlays"),
    ]
}
