use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

use crate::app::App;
use crate::state::migration_wizard::{describe, Step, WizardEvent, WizardState};
use crate::state::notifications::{SCHEDULES_FLASH_KEY, SHELL_FLASH_KEY};
use crate::types::{AppState, FlashKind, Screen};

// Clean color palette for better visibility and modern look
const BASE_FG: Color = Color::Rgb(216, 222, 233); // Main text
const BASE_BG: Color = Color::Rgb(46, 52, 64); // Background
const ACCENT_COLOR: Color = Color::Rgb(136, 192, 208); // Primary accent
const SUCCESS_COLOR: Color = Color::Rgb(163, 190, 140); // Success/green
const WARNING_COLOR: Color = Color::Rgb(235, 203, 139); // Warning/yellow
const ERROR_COLOR: Color = Color::Rgb(191, 97, 106); // Error/red
const HIGHLIGHT_BG: Color = Color::Rgb(59, 66, 82); // Selection background
const BORDER_COLOR: Color = Color::Rgb(76, 86, 106); // Inactive borders
const MUTED_FG: Color = Color::Rgb(129, 139, 158); // Secondary text

const NAME_COLUMN_WIDTH: usize = 28;

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    app.initialize().await?;
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(250);

    loop {
        app.drain_events();
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_normal_input(&mut app, key.code, key.modifiers);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

pub fn handle_normal_input(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    match key {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('h') => app.toggle_help(),
        KeyCode::Esc => {
            if app.show_help {
                app.toggle_help();
            } else if app.screen == Screen::Shell {
                match app.wizard.state {
                    WizardState::ConfirmingReinstall { .. } => app.wizard_event(WizardEvent::Cancel),
                    WizardState::Browsing { step: Step::Game } => app.wizard.revealed = false,
                    WizardState::Browsing { .. } => app.wizard.back(),
                    WizardState::Applying { .. } => {}
                }
            }
        }
        _ if app.show_help || app.state != AppState::Ready => {}
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('r') if app.migration_in_flight() => {}
        KeyCode::Tab | KeyCode::BackTab => app.next_screen(),
        KeyCode::Char('r') => app.mount_current_screen(),
        KeyCode::Up => app.move_selection_up(),
        KeyCode::Down => app.move_selection_down(),
        KeyCode::Enter => app.select_current_item(),
        _ if app.screen == Screen::Shell => handle_shell_input(app, key),
        _ => {}
    }
}

fn handle_shell_input(app: &mut App, key: KeyCode) {
    if !matches!(app.wizard.state, WizardState::Browsing { .. }) {
        return;
    }

    match key {
        KeyCode::Char('c') => app.wizard.revealed = true,
        _ if !app.wizard.revealed => {}
        KeyCode::Char(c @ '1'..='3') => {
            let index = c as usize - '1' as usize;
            if let Some(step) = Step::from_index(index) {
                app.wizard_event(WizardEvent::GoToStep(step));
            }
        }
        KeyCode::Char('b') if app.wizard.state.step() == Step::Options => {
            app.wizard_event(WizardEvent::ToggleBackup);
        }
        KeyCode::Char('w') if app.wizard.state.step() == Step::Options => {
            app.wizard_event(WizardEvent::ToggleWipe);
        }
        KeyCode::Char('d') => {
            if let Some(egg) = app.wizard.egg_at_cursor() {
                app.wizard.toggle_description(egg);
            }
        }
        _ => {}
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, main_chunks[0], app);
    render_content(f, main_chunks[1], app);
    render_footer(f, main_chunks[2], app);

    if matches!(app.wizard.state, WizardState::ConfirmingReinstall { .. })
        && app.screen == Screen::Shell
    {
        render_confirm_reinstall_popup(f, app);
    }
    if !app.toasts.is_empty() {
        render_toasts(f, app);
    }
    if app.show_help {
        render_help_popup(f);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.dry_run_mode {
        " Panel Shell - DRY RUN MODE "
    } else {
        " Panel Shell "
    };

    let mut spans = Vec::new();
    for screen in [Screen::Schedules, Screen::Shell] {
        let style = if screen == app.screen {
            Style::default()
                .fg(ACCENT_COLOR)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(MUTED_FG)
        };
        spans.push(Span::styled(format!(" {} ", screen.title()), style));
        spans.push(Span::raw("  "));
    }
    if let Some(server) = &app.server {
        spans.push(Span::styled(
            format!("│ {} ({})", server.name, server.identifier),
            Style::default().fg(BASE_FG),
        ));
    }

    let header_block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(if app.dry_run_mode {
            Style::default().fg(WARNING_COLOR).bg(BASE_BG)
        } else {
            Style::default().fg(BASE_FG).bg(BASE_BG)
        });

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(header_block),
        area,
    );
}

fn render_content(f: &mut Frame, area: Rect, app: &App) {
    match &app.state {
        AppState::CheckingServer => render_loading(f, area, "Loading server details..."),
        AppState::Error(msg) => render_error(f, area, msg),
        AppState::Ready => match app.screen {
            Screen::Schedules => render_schedules(f, area, app),
            Screen::Shell => render_shell(f, area, app),
        },
    }
}

/// Splits off a flash region above `area` when the key has messages.
fn split_flashes(f: &mut Frame, area: Rect, app: &App, key: &str) -> Rect {
    let lines: Vec<Line> = app
        .flashes
        .by_key(key)
        .map(|flash| {
            let (icon, color) = flash_style(flash.kind);
            Line::from(Span::styled(
                format!("{icon} {}", flash.message),
                Style::default().fg(color),
            ))
        })
        .collect();

    if lines.is_empty() {
        return area;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(lines.len() as u16 + 2), Constraint::Min(0)])
        .split(area);

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(BORDER_COLOR)),
        ),
        chunks[0],
    );
    chunks[1]
}

fn flash_style(kind: FlashKind) -> (&'static str, Color) {
    match kind {
        FlashKind::Success => ("✓", SUCCESS_COLOR),
        FlashKind::Info => ("i", ACCENT_COLOR),
        FlashKind::Warning => ("!", WARNING_COLOR),
        FlashKind::Error => ("✗", ERROR_COLOR),
    }
}

/// Pads or clips `text` to exactly `width` terminal columns.
fn fit_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

fn render_schedules(f: &mut Frame, area: Rect, app: &App) {
    let area = split_flashes(f, area, app, SCHEDULES_FLASH_KEY);

    if app.schedules.is_loading() {
        render_loading(f, area, "Loading schedules...");
        return;
    }

    let rows = app.schedules.rows();
    if rows.is_empty() {
        f.render_widget(
            Paragraph::new("There are no schedules configured for this server.")
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .title("Schedules")
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .style(Style::default().fg(BORDER_COLOR)),
                ),
            area,
        );
        return;
    }

    let column_header = format!(
        "  {}{:^8}{:^8}{:^13}{:^8}{:^12}",
        fit_width("Name", NAME_COLUMN_WIDTH),
        "Minute",
        "Hour",
        "Day (Month)",
        "Month",
        "Day (Week)"
    );

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let status_color = if row.is_active {
                SUCCESS_COLOR
            } else {
                MUTED_FG
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        fit_width(&row.name, NAME_COLUMN_WIDTH),
                        Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(
                            "{:^8}{:^8}{:^13}{:^8}{:^12}",
                            row.minute, row.hour, row.day_of_month, row.month, row.day_of_week
                        ),
                        Style::default().fg(ACCENT_COLOR),
                    ),
                    Span::styled(
                        format!(" {} ", row.status.to_uppercase()),
                        Style::default().fg(BASE_BG).bg(status_color),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("Last run at: {}", row.last_run),
                    Style::default().fg(MUTED_FG),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(column_header)
                .style(Style::default().fg(ACCENT_COLOR)),
        )
        .highlight_style(Style::default().bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD))
        .highlight_symbol("► ");

    let mut state = ListState::default();
    state.select(Some(app.schedules.selected_index));

    f.render_stateful_widget(list, area, &mut state);
}

fn render_shell(f: &mut Frame, area: Rect, app: &App) {
    let area = split_flashes(f, area, app, SHELL_FLASH_KEY);

    let constraints = if app.wizard.revealed {
        vec![
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(4),
        ]
    } else {
        vec![
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(4),
        ]
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_current_egg(f, chunks[0], app);
    if app.wizard.revealed {
        render_wizard(f, chunks[1], app);
    }
    render_danger_zone(f, chunks[2]);
}

fn render_current_egg(f: &mut Frame, area: Rect, app: &App) {
    let name = app.wizard.current_egg_name().unwrap_or(if app.wizard.catalog.is_some() {
        "Unknown"
    } else {
        "Loading..."
    });

    let mut lines = vec![Line::from(vec![
        Span::styled("Current Egg: ", Style::default().fg(MUTED_FG)),
        Span::styled(
            name.to_string(),
            Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
        ),
    ])];
    if !app.wizard.revealed {
        lines.push(Line::from(Span::styled(
            "[c] Change Egg",
            Style::default().fg(WARNING_COLOR),
        )));
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title("Shell")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(ACCENT_COLOR)),
        ),
        area,
    );
}

fn render_wizard(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(ACCENT_COLOR));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    render_step_header(f, chunks[0], app);
    match app.wizard.state.step() {
        Step::Game => render_nest_step(f, chunks[1], app),
        Step::Software => render_egg_step(f, chunks[1], app),
        Step::Options => render_options_step(f, chunks[1], app),
    }

    if matches!(app.wizard.state, WizardState::Applying { .. }) {
        f.render_widget(
            Paragraph::new("⏳ Applying migration...")
                .style(Style::default().fg(WARNING_COLOR))
                .alignment(Alignment::Center),
            chunks[2],
        );
    }
}

fn render_step_header(f: &mut Frame, area: Rect, app: &App) {
    let current = app.wizard.state.step().index();
    let mut spans = Vec::new();

    for step in Step::ALL {
        let unavailable = step == Step::Options && !app.wizard.options_available();
        let style = if unavailable {
            Style::default().fg(BORDER_COLOR).add_modifier(Modifier::CROSSED_OUT)
        } else if step.index() <= current {
            Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED_FG)
        };
        spans.push(Span::styled(
            format!("({}) {}", step.index() + 1, step.title()),
            style,
        ));
        if step != Step::Options {
            let connector = if step.index() < current {
                ACCENT_COLOR
            } else {
                BORDER_COLOR
            };
            spans.push(Span::styled(" ╌╌╌╌ ", Style::default().fg(connector)));
        }
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_nest_step(f: &mut Frame, area: Rect, app: &App) {
    let Some(catalog) = app.wizard.catalog.as_ref() else {
        render_loading(f, area, "Loading games...");
        return;
    };
    let items: Vec<ListItem> = app
        .wizard
        .visible_nests()
        .into_iter()
        .map(|index| {
            let nest = &catalog[index];
            let marker = if app.wizard.selection.nest == Some(index) {
                "✓ "
            } else {
                "  "
            };
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("{marker}{}", nest.name),
                    Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("  {}", nest.description),
                    Style::default().fg(MUTED_FG),
                )),
            ])
        })
        .collect();

    render_cursor_list(f, area, items, app.wizard.cursor, "Choose a game");
}

fn render_egg_step(f: &mut Frame, area: Rect, app: &App) {
    let Some(nest) = app.wizard.selected_nest() else {
        f.render_widget(
            Paragraph::new("Please select a game first")
                .style(Style::default().fg(MUTED_FG))
                .alignment(Alignment::Center),
            area,
        );
        return;
    };

    let visible = app.wizard.visible_eggs();
    if visible.is_empty() {
        f.render_widget(
            Paragraph::new("No other software is available for this game.")
                .style(Style::default().fg(MUTED_FG))
                .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = visible
        .into_iter()
        .map(|index| {
            let egg = &nest.eggs[index];
            let view = describe(&egg.description, app.wizard.is_expanded(index));
            let mut description = vec![Span::styled(
                format!("  {}", view.text),
                Style::default().fg(MUTED_FG),
            )];
            if view.truncated {
                description.push(Span::styled("... ", Style::default().fg(MUTED_FG)));
            }
            if let Some(toggle) = view.toggle {
                description.push(Span::styled(
                    format!(" [d] {toggle}"),
                    Style::default().fg(WARNING_COLOR),
                ));
            }
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("  {}", egg.name),
                    Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
                )),
                Line::from(description),
            ])
        })
        .collect();

    render_cursor_list(
        f,
        area,
        items,
        app.wizard.cursor,
        &format!("Choose software for {}", nest.name),
    );
}

fn render_options_step(f: &mut Frame, area: Rect, app: &App) {
    let switch = |on: bool| if on { "[■] ON " } else { "[ ] OFF" };
    let backup_note = if app.wizard.backup_quota_exhausted() {
        " (backup limit reached)"
    } else {
        ""
    };

    let items = vec![
        ListItem::new(vec![
            Line::from(vec![
                Span::styled(
                    format!("  {} ", switch(app.wizard.selection.should_backup)),
                    Style::default().fg(ACCENT_COLOR),
                ),
                Span::styled(
                    format!("Backups{backup_note}"),
                    Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                "  Would you like to create a backup before continuing? Some data may be modified or removed during the process.",
                Style::default().fg(MUTED_FG),
            )),
        ]),
        ListItem::new(vec![
            Line::from(vec![
                Span::styled(
                    format!("  {} ", switch(app.wizard.selection.wipe_data)),
                    Style::default().fg(ACCENT_COLOR),
                ),
                Span::styled(
                    "Wipe Data",
                    Style::default().fg(BASE_FG).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                "  In some cases you might want to completely wipe your server, like when changing to a different game.",
                Style::default().fg(MUTED_FG),
            )),
        ]),
    ];

    render_cursor_list(f, area, items, app.wizard.cursor, "Options");
}

fn render_cursor_list(f: &mut Frame, area: Rect, items: Vec<ListItem>, cursor: usize, title: &str) {
    let list = List::new(items)
        .block(Block::default().title(title.to_string()))
        .highlight_style(Style::default().bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD))
        .highlight_symbol("► ");

    let mut state = ListState::default();
    state.select(Some(cursor));

    f.render_stateful_widget(list, area, &mut state);
}

fn render_danger_zone(f: &mut Frame, area: Rect) {
    f.render_widget(
        Paragraph::new(
            "During this process some files may be deleted or modified. Either make a backup beforehand or pick the option when prompted.",
        )
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(BASE_FG))
        .block(
            Block::default()
                .title("⚠ Danger Zone")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(WARNING_COLOR)),
        ),
        area,
    );
}

fn render_confirm_reinstall_popup(f: &mut Frame, app: &App) {
    let (Some(nest), Some(egg)) = (app.wizard.selected_nest(), app.wizard.selected_egg()) else {
        return;
    };

    let popup_area = centered_rect(70, 45, f.area());
    f.render_widget(Clear, popup_area);

    let backup_line = if app.wizard.selection.should_backup {
        Span::styled("A backup will be created first.", Style::default().fg(SUCCESS_COLOR))
    } else {
        Span::styled("No backup will be created.", Style::default().fg(WARNING_COLOR))
    };

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Target: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{} → {}", nest.name, egg.name),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(backup_line),
        Line::from(""),
        Line::from(Span::styled(
            "Your server will be stopped and some files may be deleted or modified during this process, are you sure you wish to continue?",
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter] ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("Yes, reinstall server  ", Style::default().fg(Color::White)),
            Span::styled("[Esc] ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled("Cancel", Style::default().fg(Color::White)),
        ]),
    ];

    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Confirm server reinstallation")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .style(Style::default().fg(Color::White).bg(Color::Rgb(139, 0, 0))),
            ),
        popup_area,
    );
}

fn render_toasts(f: &mut Frame, app: &App) {
    let area = f.area();
    let width = (area.width / 3).max(30).min(area.width);
    let mut y = area.y + 1;

    for toast in app.toasts.iter() {
        if y + 3 > area.bottom() {
            break;
        }
        let toast_area = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height: 3,
        };
        let (icon, color) = flash_style(toast.kind);
        f.render_widget(Clear, toast_area);
        f.render_widget(
            Paragraph::new(format!("{icon} {}", toast.message)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(color).bg(BASE_BG)),
            ),
            toast_area,
        );
        y += 3;
    }
}

fn render_loading(f: &mut Frame, area: Rect, message: &str) {
    let loading_text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "⏳ Loading...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message),
    ];

    let loading = Paragraph::new(loading_text)
        .block(Block::default().borders(Borders::ALL).title("Loading"))
        .alignment(Alignment::Center);

    f.render_widget(loading, area);
}

fn render_error(f: &mut Frame, area: Rect, error_msg: &str) {
    let error_text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "✗ ERROR",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(error_msg),
        Line::from(""),
        Line::from(Span::styled(
            "Press 'q' to exit",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let error = Paragraph::new(error_text)
        .block(Block::default().borders(Borders::ALL).title("Error"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(error, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let help_text = match (app.screen, &app.wizard.state) {
        (_, _) if app.state != AppState::Ready => " [q] Quit ",
        (Screen::Schedules, _) => " [↑/↓] Navigate | [Tab] Shell | [r] Reload | [h] Help | [q] Quit ",
        (Screen::Shell, WizardState::Applying { .. }) => " Applying migration... | [h] Help | [q] Quit ",
        (Screen::Shell, WizardState::ConfirmingReinstall { .. }) => {
            " [Enter] Reinstall | [Esc] Cancel "
        }
        (Screen::Shell, _) if !app.wizard.revealed => {
            " [c] Change Egg | [Tab] Schedules | [r] Reload | [h] Help | [q] Quit "
        }
        (Screen::Shell, WizardState::Browsing { step: Step::Options }) => {
            " [↑/↓] Navigate | [Enter/b/w] Toggle | [1-3] Step | [Esc] Back | [h] Help | [q] Quit "
        }
        (Screen::Shell, _) => {
            " [↑/↓] Navigate | [Enter] Select | [d] Description | [1-3] Step | [Esc] Back | [h] Help | [q] Quit "
        }
    };

    f.render_widget(
        Paragraph::new(help_text)
            .block(
                Block::default()
                    .title("Controls")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(BORDER_COLOR)),
            )
            .alignment(Alignment::Center)
            .style(Style::default().fg(BASE_FG)),
        area,
    );
}

fn render_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled(
            "HELP - Panel Shell",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("General:"),
        Line::from("  --dry-run     Walk through a migration without sending it"),
        Line::from("  RUST_LOG      Log filter for the log file (default: info)"),
        Line::from(""),
        section("Navigation:"),
        Line::from("  Tab       Switch between Schedules and Shell"),
        Line::from("  ↑/↓       Navigate through lists"),
        Line::from("  Enter     Select item or confirm action"),
        Line::from("  Esc       Go back or cancel"),
        Line::from(""),
        section("Shell:"),
        Line::from("  C         Open the egg picker"),
        Line::from("  1-3       Jump to a step"),
        Line::from("  D         Expand or collapse a description"),
        Line::from("  B / W     Toggle backup / wipe data on the options step"),
        Line::from(""),
        section("Commands:"),
        Line::from("  R         Reload the current view"),
        Line::from("  H         Toggle this help screen"),
        Line::from("  Q         Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Press H or Esc to close this help",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black));

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPanelClientTrait;
    use crate::state::migration_wizard::ShellOptions;
    use crate::types::{CronSpec, FeatureLimits, Schedule, ServerContext};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn server() -> ServerContext {
        ServerContext {
            id: 3,
            identifier: "1a2b3c4d".to_string(),
            uuid: "1a2b3c4d-uuid".to_string(),
            name: "Survival".to_string(),
            egg: "e0".to_string(),
            feature_limits: FeatureLimits {
                databases: 0,
                allocations: 1,
                backups: 2,
            },
        }
    }

    fn create_test_app() -> App {
        let mut app = App::new(
            Arc::new(MockPanelClientTrait::new()),
            "1a2b3c4d-uuid",
            ShellOptions::default(),
            false,
        );
        app.server = Some(server());
        app.state = AppState::Ready;
        app
    }

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_toggle_help() {
        let mut app = create_test_app();
        assert!(!app.show_help);

        handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE);
        assert!(app.show_help);

        handle_normal_input(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.show_help);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = create_test_app();
        handle_normal_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);

        let mut app = create_test_app();
        handle_normal_input(&mut app, KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.should_quit);
    }

    #[test]
    fn test_fit_width_pads_and_clips() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdef", 4), "abcd");
        assert_eq!(fit_width("日本語", 5), "日本 ");
    }

    #[test]
    fn test_schedule_screen_renders_rows() {
        let mut app = create_test_app();
        let generation = app.schedules.mount(&mut app.flashes);
        app.schedules.apply_loaded(
            generation,
            Ok(vec![Schedule {
                id: 1,
                name: "Nightly restart".to_string(),
                cron: CronSpec {
                    minute: "0".to_string(),
                    hour: "4".to_string(),
                    day_of_month: "*".to_string(),
                    day_of_week: "*".to_string(),
                },
                is_active: false,
                is_processing: false,
                last_run_at: None,
                next_run_at: None,
            }]),
            &mut app.flashes,
        );

        let text = screen_text(&mut app);
        assert!(text.contains("Nightly restart"));
        assert!(text.contains("Last run at: never"));
        assert!(text.contains("INACTIVE"));
    }

    #[test]
    fn test_schedule_screen_shows_spinner_while_loading() {
        let mut app = create_test_app();
        app.schedules.mount(&mut app.flashes);
        assert!(screen_text(&mut app).contains("Loading schedules..."));
    }

    #[test]
    fn test_nest_step_shows_loading_until_catalog_arrives() {
        let mut app = create_test_app();
        app.screen = Screen::Shell;
        app.wizard.mount(&server(), &mut app.flashes);
        app.wizard.revealed = true;

        assert!(screen_text(&mut app).contains("Loading games..."));
    }

    #[test]
    fn test_shell_keys_ignored_until_revealed() {
        let mut app = create_test_app();
        app.screen = Screen::Shell;
        app.wizard.mount(&server(), &mut app.flashes);

        handle_normal_input(&mut app, KeyCode::Char('2'), KeyModifiers::NONE);
        assert_eq!(app.wizard.state.step(), Step::Game);

        handle_normal_input(&mut app, KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(app.wizard.revealed);

        handle_normal_input(&mut app, KeyCode::Char('2'), KeyModifiers::NONE);
        assert_eq!(app.wizard.state.step(), Step::Software);
        assert!(screen_text(&mut app).contains("Please select a game first"));

        handle_normal_input(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.wizard.state.step(), Step::Game);
    }
}
