// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine la liste des actifs, le panneau de comparaison, les toasts et les
// états de chargement
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : composants UI (Block, Paragraph, Table, etc.)
// 3. Layout : découpage de l'espace en zones
// 4. Style : couleurs et attributs de texte (selon le thème clair/sombre)
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::app::{App, FetchFailure, Severity};
use crate::dataset::{ComparisonField, ComparisonRow};
use crate::models::AssetRecord;
use crate::scheduler::LoadingPhase;
use crate::ui::state::{Focus, UiState};

// ============================================================================
// Thème
// ============================================================================

/// Palette de couleurs dérivée du drapeau dark_mode
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub up: Color,
    pub down: Color,
}

impl Theme {
    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                background: Color::Black,
                text: Color::White,
                muted: Color::DarkGray,
                border: Color::Cyan,
                accent: Color::Yellow,
                up: Color::LightGreen,
                down: Color::LightRed,
            }
        } else {
            Self {
                background: Color::Reset,
                text: Color::Reset,
                muted: Color::Gray,
                border: Color::Blue,
                accent: Color::Magenta,
                up: Color::Green,
                down: Color::Red,
            }
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    fn block(&self, title: String, focused: bool) -> Block<'static> {
        let border = if focused { self.accent } else { self.border };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title)
            .style(self.base())
    }

    fn change_color(&self, record: &AssetRecord) -> Color {
        match record.price_change_percentage_24h {
            None => self.muted,
            Some(_) if record.is_positive() => self.up,
            Some(_) => self.down,
        }
    }
}

// ============================================================================
// Fonction principale de rendu
// ============================================================================

/// Dessine l'interface complète
///
/// - Premier chargement (ou premier échec) : écran bloquant
/// - Sinon : dashboard, avec la ligne de saisie si la recherche est active
pub fn render(frame: &mut Frame, app: &App, ui: &UiState) {
    let theme = Theme::for_mode(app.dark_mode());
    let size = frame.size();

    if !app.data_set().has_loaded() {
        render_blocking(frame, app, &theme, size);
    } else {
        let chunks = create_layout(size);
        render_header(frame, app, &theme, chunks[0]);
        render_main_content(frame, app, ui, &theme, chunks[1]);
        render_footer(frame, ui, &theme, chunks[2]);
    }

    render_toasts(frame, ui, &theme, size);
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header : 3 lignes
            Constraint::Min(0),    // Content : tout le reste
            Constraint::Length(3), // Footer : 3 lignes
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Écran bloquant : premier chargement
// ============================================================================

fn render_blocking(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let block = theme.block(" CoinBoard ".to_string(), false);

    let mut text = vec![Line::from(""), Line::from("")];
    match app.last_failure() {
        Some(failure) => {
            text.push(Line::from(Span::styled(
                "Unable to load market data, retrying soon",
                Style::default().fg(theme.down).add_modifier(Modifier::BOLD),
            )));
            text.push(Line::from(Span::styled(
                format!("Next attempt in {}s (attempt {})", failure.retry_in_secs, failure.streak + 1),
                Style::default().fg(theme.muted),
            )));
        }
        None => {
            text.push(Line::from(Span::styled(
                "Loading market data...",
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            )));
        }
    }
    if app.loading_phase() == LoadingPhase::InitialBlocking {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled("⏳", Style::default().fg(theme.accent))));
    }

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Header : titre, tri, recherche, statut
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let block = theme.block(" CoinBoard ".to_string(), false);

    let status = match app.loading_phase() {
        LoadingPhase::Refreshing => Span::styled("⟳ refreshing", Style::default().fg(theme.accent)),
        _ => match app.data_set().updated_at() {
            Some(at) => Span::styled(
                format!("updated {}", at.with_timezone(&chrono::Local).format("%H:%M:%S")),
                Style::default().fg(theme.muted),
            ),
            None => Span::raw(""),
        },
    };

    let search = if app.search_term().is_empty() {
        Span::styled("none", Style::default().fg(theme.muted))
    } else {
        Span::styled(
            format!("\"{}\"", app.search_term()),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )
    };

    let line = Line::from(vec![
        Span::styled("Sort: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(app.sort_mode().label()),
        Span::raw("   "),
        Span::styled("Search: ", Style::default().add_modifier(Modifier::BOLD)),
        search,
        Span::raw("   "),
        status,
    ]);

    let paragraph = Paragraph::new(vec![line]).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Main Content : liste + comparaison
// ============================================================================

/// Texte de la bannière d'échec (données précédentes conservées)
fn failure_banner(failure: &FetchFailure) -> String {
    let ceiling = if failure.at_ceiling { ", max backoff" } else { "" };
    format!(
        " ⚠ Refresh failed ({} in a row{}), showing previous data. Retrying in {}s ",
        failure.streak, ceiling, failure.retry_in_secs
    )
}

fn render_main_content(frame: &mut Frame, app: &App, ui: &UiState, theme: &Theme, area: Rect) {
    // Bannière d'erreur au-dessus de la liste conservée
    let (banner_area, content_area) = match app.last_failure() {
        Some(_) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(area);
            (Some(parts[0]), parts[1])
        }
        None => (None, area),
    };

    if let (Some(banner), Some(failure)) = (banner_area, app.last_failure()) {
        let text = failure_banner(failure);
        let paragraph = Paragraph::new(text).style(
            Style::default().fg(Color::White).bg(theme.down).add_modifier(Modifier::BOLD),
        );
        frame.render_widget(paragraph, banner);
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(content_area);

    render_asset_list(frame, app, ui, theme, columns[0]);
    render_comparison(frame, app, ui, theme, columns[1]);
}

/// Liste principale : recherche + tri, colonnes selon les préférences
fn render_asset_list(frame: &mut Frame, app: &App, ui: &UiState, theme: &Theme, area: Rect) {
    let assets = app.visible_assets();
    let title = format!(" Markets ({}/{}) ", assets.len(), app.data_set().len());
    let block = theme.block(title, ui.focus == Focus::List);

    if assets.is_empty() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No asset matches the search", Style::default().fg(theme.muted))),
        ])
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let fields = ComparisonField::visible(app.preferences());

    let mut header_cells = vec![Cell::from(" "), Cell::from("Symbol"), Cell::from("Name")];
    header_cells.extend(fields.iter().map(|field| Cell::from(field.label())));
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    // CONCEPT RUST : Iterator chaining
    let rows: Vec<Row> = assets
        .iter()
        .map(|record| {
            let pin = if app.is_selected(&record.id) { "★" } else { " " };
            let mut cells = vec![
                Cell::from(pin).style(Style::default().fg(theme.accent)),
                Cell::from(record.symbol.to_uppercase()),
                Cell::from(truncate(&record.name, 20)),
            ];
            cells.extend(fields.iter().map(|field| {
                let cell = Cell::from(field.format(record));
                if *field == ComparisonField::Change {
                    cell.style(Style::default().fg(theme.change_color(record)))
                } else {
                    cell
                }
            }));

            // Surbrillance des actifs épinglés
            let style = if app.is_selected(&record.id) {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(cells).style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(2), Constraint::Length(8), Constraint::Length(21)];
    widths.extend(fields.iter().map(|_| Constraint::Length(14)));

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if ui.focus == Focus::List {
        state.select(Some(ui.list_index.min(assets.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

/// Panneau de comparaison : une colonne par actif épinglé
fn render_comparison(frame: &mut Frame, app: &App, ui: &UiState, theme: &Theme, area: Rect) {
    let rows = app.comparison_rows();
    let title = format!(" Compare ({}/{}) ", rows.len(), crate::models::MAX_SELECTION);
    let block = theme.block(title, ui.focus == Focus::Comparison);

    if rows.is_empty() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter on an asset to compare it",
                Style::default().fg(theme.muted),
            )),
        ])
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let fields = ComparisonField::visible(app.preferences());

    // En-tête : symboles, celui sous le curseur en surbrillance
    let mut header_cells = vec![Cell::from("")];
    header_cells.extend(rows.iter().enumerate().map(|(i, row)| {
        let style = if ui.focus == Focus::Comparison && i == ui.comparison_index {
            Style::default().fg(theme.accent).add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(theme.accent)
        };
        Cell::from(row.entry().symbol.to_uppercase()).style(style)
    }));
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    let mut table_rows = vec![comparison_line("Name", &rows, |row| {
        Cell::from(truncate(&row.entry().name, 12))
    })];
    for field in &fields {
        table_rows.push(comparison_line(field.label(), &rows, |row| {
            let cell = Cell::from(row.display(*field));
            match (field, row.record()) {
                (ComparisonField::Change, Some(record)) => {
                    cell.style(Style::default().fg(theme.change_color(record)))
                }
                (_, None) => cell.style(Style::default().fg(theme.muted)),
                _ => cell,
            }
        }));
    }

    let mut widths = vec![Constraint::Length(11)];
    widths.extend(rows.iter().map(|_| Constraint::Min(10)));

    let table = Table::new(table_rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

/// Une ligne du tableau de comparaison : libellé + une cellule par actif
fn comparison_line<'a, F>(label: &'a str, rows: &[ComparisonRow<'_>], cell: F) -> Row<'a>
where
    F: Fn(&ComparisonRow<'_>) -> Cell<'a>,
{
    let mut cells = vec![Cell::from(label).style(Style::default().add_modifier(Modifier::BOLD))];
    cells.extend(rows.iter().map(cell));
    Row::new(cells)
}

// ============================================================================
// Footer : raccourcis ou ligne de saisie
// ============================================================================

fn render_footer(frame: &mut Frame, ui: &UiState, theme: &Theme, area: Rect) {
    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    };

    let (line, alignment) = if ui.is_in_search_input() {
        (
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(theme.border).add_modifier(Modifier::BOLD)),
                Span::raw(ui.input_buffer.clone()),
                Span::styled("█", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                Span::raw("   "),
                key("[Enter]"),
                Span::raw(" Confirm  "),
                key("[ESC]"),
                Span::raw(" Cancel"),
            ]),
            Alignment::Left,
        )
    } else if ui.is_awaiting_quit_confirmation() {
        (
            Line::from(vec![
                Span::styled("⚠  Press ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled(
                    "[q]",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
                ),
                Span::styled(
                    " again to quit, any other key to cancel ⚠",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]),
            Alignment::Center,
        )
    } else {
        (
            Line::from(vec![
                key("[q]"),
                Span::raw(" Quit  "),
                key("[↑↓]"),
                Span::raw(" Move  "),
                key("[Enter]"),
                Span::raw(" Pin  "),
                key("[Tab]"),
                Span::raw(" Panel  "),
                key("[/]"),
                Span::raw(" Search  "),
                key("[s/S]"),
                Span::raw(" Sort  "),
                key("[1 2 3]"),
                Span::raw(" Columns  "),
                key("[t]"),
                Span::raw(" Theme"),
            ]),
            Alignment::Center,
        )
    };

    let paragraph = Paragraph::new(vec![line])
        .block(theme.block(String::new(), ui.is_in_search_input()))
        .alignment(alignment);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Toasts : notifications en haut à droite
// ============================================================================

fn render_toasts(frame: &mut Frame, ui: &UiState, theme: &Theme, area: Rect) {
    let width = 48.min(area.width);
    let mut y = area.y + 1;

    for toast in ui.toasts.iter().rev() {
        if y + 3 > area.y + area.height {
            break;
        }

        let color = match toast.notice.severity {
            Severity::Info => theme.border,
            Severity::Success => theme.up,
            Severity::Error => theme.down,
        };
        let rect = Rect::new(area.x + area.width - width, y, width, 3);

        let paragraph = Paragraph::new(toast.notice.message.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .style(theme.base());

        frame.render_widget(Clear, rect);
        frame.render_widget(paragraph, rect);
        y += 3;
    }
}

/// Tronque un texte avec ellipse
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
