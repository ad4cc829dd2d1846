use std::cmp::min;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::core::ListState as PickerListState;
use crate::tui::constants::{APP_VERSION, MAX_CHIPS};
use crate::tui::filters::CategoryOverlay;
use crate::tui::helpers::{
    accent_title, build_help_lines, centered_rect, chip_labels, inset_rect, row_context, truncate,
    BG_ACCENT, BG_BASE, BG_PANEL, FG_ACCENT,
};

use super::{App, InputMode};

impl App {
    pub(crate) fn draw(&mut self, f: &mut Frame<'_>) {
        let size = f.size();
        f.render_widget(Clear, size);
        f.render_widget(Block::default().style(Style::default().bg(BG_BASE)), size);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(2),
            ])
            .split(size);

        self.draw_header(f, chunks[0]);
        self.draw_search(f, chunks[1]);
        self.draw_chips(f, chunks[2]);
        self.draw_body(f, chunks[3]);
        self.draw_footer(f, chunks[4]);

        match self.input_mode {
            InputMode::Category => self.draw_category_overlay(f, size),
            InputMode::Help => self.draw_help_overlay(f, size),
            InputMode::Diagnostics => self.draw_diagnostics_overlay(f, size),
            InputMode::Normal | InputMode::Search => {}
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(area);

        let mut left_spans = vec![
            Span::styled(
                format!(" atis v{} ", APP_VERSION),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("· pick {}", self.picker.kind().plural())),
            Span::raw("  "),
            Span::styled(
                format!("💾 {}", self.config.db_path().display()),
                Style::default().fg(Color::DarkGray),
            ),
        ];

        if let Some(summary) = self.picker.filter().summary() {
            left_spans.push(Span::raw("  "));
            left_spans.push(Span::styled(
                format!("🔍 {}", summary),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        f.render_widget(
            Paragraph::new(Line::from(left_spans)).style(Style::default().bg(BG_BASE)),
            cols[0],
        );

        let selected = self.picker.selection().len();
        let right_line = Line::from(vec![Span::styled(
            format!("{selected} selected "),
            Style::default().fg(FG_ACCENT).add_modifier(Modifier::BOLD),
        )]);
        f.render_widget(
            Paragraph::new(right_line)
                .alignment(Alignment::Right)
                .style(Style::default().bg(BG_BASE)),
            cols[1],
        );
    }

    fn draw_search(&self, f: &mut Frame<'_>, area: Rect) {
        let editing = self.input_mode == InputMode::Search;
        let border = if editing { FG_ACCENT } else { Color::DarkGray };
        let mut title = vec![Span::styled(
            "Search",
            Style::default().fg(FG_ACCENT).add_modifier(Modifier::BOLD),
        )];
        if self.search.is_pending() {
            title.push(Span::styled(" ⏳", Style::default().fg(Color::Yellow)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(title))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(area);

        let text = if self.query.is_empty() && !editing {
            Line::from(Span::styled(
                "press / to search by name, email, code or hierarchy",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::from(self.query.as_str().to_string())
        };
        f.render_widget(Paragraph::new(text).block(block), area);

        if editing && inner.width > 0 {
            let column = min(self.query.cursor_column() as u16, inner.width - 1);
            f.set_cursor(inner.x + column, inner.y);
        }
    }

    fn draw_chips(&self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title(&format!(
                "Selected ({})",
                self.picker.selection().len()
            )))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));

        let line = if let Some(reason) = self.picker.competing_reason() {
            Line::from(vec![Span::styled(
                format!("🔒 Selection locked: {reason} (b to unlock)"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )])
        } else {
            let chips = self.picker.selected_chips();
            if chips.is_empty() {
                Line::from(Span::styled(
                    "nothing selected yet",
                    Style::default().fg(Color::DarkGray),
                ))
            } else {
                let mut spans = Vec::new();
                for label in chip_labels(&chips, MAX_CHIPS) {
                    spans.push(Span::styled(
                        format!(" {label} "),
                        Style::default().bg(BG_ACCENT).fg(Color::White),
                    ));
                    spans.push(Span::raw(" "));
                }
                Line::from(spans)
            }
        };
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_body(&mut self, f: &mut Frame<'_>, area: Rect) {
        let kind = self.picker.kind().plural();
        let loaded = self.picker.candidates().len();
        let mut title = format!("{} · {} of {}", capitalize(kind), loaded, self.picker.total());
        if self.picker.has_more() {
            title.push_str(" · m loads more");
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title(&title))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(area);
        self.scroll
            .resize(inner.height as u32 * self.settings.row_height);

        let placeholder = match self.picker.list_state() {
            PickerListState::Loading if loaded == 0 => Some(vec![Line::from(Span::styled(
                format!("Loading {kind}…"),
                Style::default().fg(Color::DarkGray),
            ))]),
            PickerListState::Empty => Some(self.empty_state(kind)),
            PickerListState::Failed(err) if loaded == 0 => Some(vec![
                Line::from(Span::styled(
                    format!("Could not load {kind}: {err}"),
                    Style::default().fg(Color::Red),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to retry",
                    Style::default().fg(Color::DarkGray),
                )),
            ]),
            _ => None,
        };

        if let Some(lines) = placeholder {
            f.render_widget(
                Paragraph::new(lines)
                    .block(block)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        if self.grouped {
            return self.draw_groups(f, area, block);
        }

        let window = self.picker.window(&self.scroll);
        let width = inner.width as usize;
        let locked = self.picker.is_locked();
        let items: Vec<ListItem> = self
            .picker
            .windowed(&self.scroll)
            .iter()
            .map(|entity| {
                let selected = self.picker.selection().contains(&entity.id);
                // Locked rows stay listed with a disabled marker.
                let (marker, color) = match (locked, selected) {
                    (true, _) => ("[-] ", Color::DarkGray),
                    (false, true) => ("[x] ", Color::Green),
                    (false, false) => ("[ ] ", Color::DarkGray),
                };
                let mut spans = vec![
                    Span::styled(marker, Style::default().fg(color)),
                    Span::styled(entity.label.clone(), Style::default().fg(Color::White)),
                ];
                if let Some(detail) = &entity.detail {
                    spans.push(Span::styled(
                        format!("  {detail}"),
                        Style::default().fg(Color::Gray),
                    ));
                }
                let context = row_context(entity);
                if !context.is_empty() {
                    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
                    let room = width.saturating_sub(used + 2);
                    if room > 3 {
                        spans.push(Span::styled(
                            format!("  {}", truncate(&context, room)),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let visible_start = self.scroll.visible_rows().start;
        let mut state = ListState::default()
            .with_offset(visible_start.saturating_sub(window.start))
            .with_selected(
                self.cursor
                    .checked_sub(window.start)
                    .filter(|_| window.contains(self.cursor)),
            );
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(BG_ACCENT)
                    .fg(FG_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_groups(&self, f: &mut Frame<'_>, area: Rect, block: Block<'_>) {
        let selection = self.picker.selection();
        let items: Vec<ListItem> = self
            .group_rows()
            .iter()
            .map(|row| {
                let chosen = row.members.iter().filter(|id| selection.contains(id)).count();
                let color = match chosen {
                    0 => Color::DarkGray,
                    n if n == row.members.len() => Color::Green,
                    _ => Color::Yellow,
                };
                let (indent, style) = if row.depth == 0 {
                    ("▸ ", Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
                } else {
                    ("    ", Style::default().fg(Color::Gray))
                };
                ListItem::new(Line::from(vec![
                    Span::raw(indent),
                    Span::styled(capitalize(row.key.label()), style),
                    Span::styled(
                        format!("  {chosen}/{} selected", row.members.len()),
                        Style::default().fg(color),
                    ),
                ]))
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(self.group_cursor));
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(BG_ACCENT)
                    .fg(FG_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        f.render_stateful_widget(list, area, &mut state);
    }

    fn empty_state(&self, kind: &str) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            format!("No {kind} match"),
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        ))];
        if let Some(summary) = self.picker.filter().summary() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Active filter: {summary} · press R to reset"),
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "The catalog is empty. Run `atis import` or `atis seed` first.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.style())])
        } else {
            Line::from(vec![Span::raw("Ready")])
        };
        f.render_widget(Paragraph::new(status_line), lines[0]);

        let help = match self.input_mode {
            InputMode::Normal => {
                "/ search | j/k move | space select | a visible | c category | g group | G grouped view | f filter | d remove | x clear | b broader | ? help | q done"
            }
            InputMode::Search => "type to search • Enter/↓ list • Esc clear",
            InputMode::Category => "←/→ facet • ↑/↓ value • Enter apply • Esc cancel",
            InputMode::Help => "Enter/Esc to close ❔",
            InputMode::Diagnostics => "e export • Enter/Esc to close",
        };
        let help_line = Line::from(vec![Span::styled(
            help,
            Style::default().fg(Color::DarkGray),
        )]);
        f.render_widget(Paragraph::new(help_line), lines[1]);
    }

    fn draw_category_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let Some(overlay) = self.overlay.as_ref() else {
            return;
        };

        let width = min(area.width.saturating_sub(10), 100);
        let height = min(area.height.saturating_sub(4), 24);
        let popup_area = centered_rect(width, height, area);
        f.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title(overlay.purpose.title()))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup_area);
        f.render_widget(block, popup_area);

        let count = overlay.columns.len().max(1) as u32;
        let constraints: Vec<Constraint> = (0..count).map(|_| Constraint::Ratio(1, count)).collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(inner);

        for (idx, area) in columns.iter().enumerate() {
            render_overlay_column(f, *area, overlay, idx);
        }
    }

    fn draw_help_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = build_help_lines();
        let width = min(area.width.saturating_sub(10), 80);
        let height = min(lines.len() as u16 + 4, area.height.saturating_sub(2)).max(10);
        let popup_area = centered_rect(width, height, area);
        f.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("⌨️ Keyboard Reference"))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup_area);
        f.render_widget(block, popup_area);

        if inner.width < 3 || inner.height < 3 {
            return;
        }

        let help_lines: Vec<Line> = lines
            .into_iter()
            .map(|(combo, desc)| {
                Line::from(vec![
                    Span::styled(format!("{combo:<16}"), Style::default().fg(Color::Cyan)),
                    Span::raw(desc),
                ])
            })
            .collect();
        f.render_widget(
            Paragraph::new(help_lines)
                .wrap(Wrap { trim: true })
                .style(Style::default().bg(BG_PANEL)),
            inset_rect(inner, 1),
        );
    }

    fn draw_diagnostics_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let width = min(area.width.saturating_sub(6), 120);
        let height = area.height.saturating_sub(4);
        let popup_area = centered_rect(width, height, area);
        f.render_widget(Clear, popup_area);

        let title = format!(
            "Diagnostics · {} kept · {} dropped",
            self.diagnostics.len(),
            self.diagnostics.dropped()
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title(&title))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup_area);

        let records = self.diagnostics.snapshot();
        let skip = records.len().saturating_sub(inner.height as usize);
        let lines: Vec<Line> = records
            .iter()
            .skip(skip)
            .map(|record| {
                let event = serde_json::to_string(&record.event)
                    .unwrap_or_else(|_| format!("{:?}", record.event));
                Line::from(vec![
                    Span::styled(
                        record.at.format("%H:%M:%S%.3f ").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(event),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines).block(block), popup_area);
    }
}

fn render_overlay_column(f: &mut Frame<'_>, area: Rect, overlay: &CategoryOverlay, idx: usize) {
    let Some(column) = overlay.columns.get(idx) else {
        return;
    };
    let focused = overlay.column == idx;
    let border = if focused { FG_ACCENT } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            column.facet.title(),
            Style::default().fg(border).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border));

    let active_label = overlay
        .active
        .as_ref()
        .filter(|active| active.facet == column.facet)
        .map(|active| active.value.clone());
    let items: Vec<ListItem> = overlay
        .row_labels(idx)
        .into_iter()
        .map(|label| {
            let is_active = active_label
                .as_deref()
                .is_some_and(|value| label.starts_with(&format!("{value} (")));
            let style = if is_active {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(label, style)))
        })
        .collect();

    let mut state = ListState::default();
    if focused {
        state.select(overlay.rows.get(idx).copied());
    }
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(BG_ACCENT).add_modifier(Modifier::BOLD))
        .highlight_symbol("› ");
    f.render_stateful_widget(list, area, &mut state);
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
