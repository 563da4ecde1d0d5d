use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Gauge, Paragraph, Tabs, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use swiftkeys::{passage, scorer::Outcome, Mode, Phase, SessionState};

use crate::{App, Tab};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn accuracy_color(accuracy: u32) -> Color {
    if accuracy > 90 {
        Color::Green
    } else if accuracy > 70 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Reference text coloured by what has been typed so far.
fn passage_line(state: &SessionState, show_cursor: bool) -> Line<'static> {
    let outcomes = state.outcomes();
    let mut spans = Vec::with_capacity(state.reference.len());

    for (idx, expected) in state.reference.chars().iter().enumerate() {
        let style = match outcomes.get(idx) {
            Some(Outcome::Correct) => bold().fg(Color::Green),
            Some(Outcome::Incorrect) => bold().fg(Color::Red).bg(Color::Rgb(60, 20, 20)),
            None if show_cursor && idx == outcomes.len() => {
                dim_bold().add_modifier(Modifier::UNDERLINED)
            }
            None => dim_bold(),
        };
        let text = match (expected, outcomes.get(idx)) {
            (' ', Some(Outcome::Incorrect)) => "·".to_string(),
            (c, _) => c.to_string(),
        };
        spans.push(Span::styled(text, style));
    }
    if state.overflow > 0 {
        spans.push(Span::styled(
            format!(" +{}", state.overflow),
            bold().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

/// Rows the passage needs once wrapped to `width`.
fn passage_height(state: &SessionState, width: u16) -> u16 {
    let width = width.max(1) as usize;
    (state.reference.as_str().width().div_ceil(width) + 1) as u16
}

fn progress_gauge(title: String, percent: f64, label: String, color: Color) -> Gauge<'static> {
    Gauge::default()
        .block(Block::default().title(title))
        .gauge_style(Style::default().fg(color))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(label)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let titles = Tab::ALL.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Tabs::new(titles)
            .block(Block::default().borders(Borders::BOTTOM).title(" swiftkeys "))
            .select(Tab::ALL.iter().position(|t| *t == self.tab).unwrap_or(0))
            .highlight_style(bold().fg(Color::Cyan))
            .render(chunks[0], buf);

        let body = Rect {
            x: chunks[1].x + HORIZONTAL_MARGIN.min(chunks[1].width / 4),
            y: chunks[1].y + VERTICAL_MARGIN.min(chunks[1].height),
            width: chunks[1]
                .width
                .saturating_sub(2 * HORIZONTAL_MARGIN.min(chunks[1].width / 4)),
            height: chunks[1].height.saturating_sub(VERTICAL_MARGIN),
        };

        let legend = match (self.tab, self.controller.state().phase) {
            (Tab::Race, Phase::Idle) => "(enter) start race / (tab) switch / (esc)ape",
            (Tab::Race, Phase::Complete) => "(enter) race again / (tab) switch / (esc)ape",
            (Tab::Learn, Phase::InProgress) => "(←) back to lessons / (tab) switch / (esc)ape",
            (Tab::Learn, Phase::Complete) => "(r)etry / (n)ext lesson / (esc)ape",
            (Tab::Learn, _) => "(↑↓) choose / (enter) start / (tab) switch / (esc)ape",
            (Tab::Stats, _) => "(r)efresh / (tab) switch / (esc)ape",
            _ => "(tab) switch / (esc)ape",
        };

        match self.tab {
            Tab::Race => render_race(self, body, buf),
            Tab::Learn => render_learn(self, body, buf),
            Tab::Stats => render_stats(self, body, buf),
        }

        Paragraph::new(Span::styled(legend, italic()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}

fn render_race(app: &App, area: Rect, buf: &mut Buffer) {
    let state = app.controller.state();
    match state.phase {
        Phase::Idle | Phase::LessonSelect => {
            Paragraph::new(vec![
                Line::from(Span::styled("Ready to Race?", bold())),
                Line::from(""),
                Line::from(Span::styled(
                    "Type the passage as quickly and accurately as possible.",
                    italic(),
                )),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
        }
        Phase::Countdown => {
            Paragraph::new(vec![
                Line::from(Span::styled(
                    state.countdown.to_string(),
                    bold().fg(Color::Cyan),
                )),
                Line::from(Span::styled("Get ready to type!", italic())),
            ])
            .alignment(Alignment::Center)
            .render(area, buf);
        }
        Phase::InProgress | Phase::Complete => {
            let competitors = app.controller.competitors();
            let mut constraints = vec![
                Constraint::Length(2),
                Constraint::Length(passage_height(state, area.width)),
                Constraint::Length(2),
            ];
            constraints.extend(std::iter::repeat(Constraint::Length(2)).take(competitors.len()));
            constraints.push(Constraint::Length(2));
            constraints.push(Constraint::Min(0));

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(area);

            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} WPM", state.wpm), bold()),
                Span::raw("   "),
                Span::styled(
                    format!("{}% Accuracy", state.accuracy_percent),
                    bold().fg(accuracy_color(state.accuracy_percent)),
                ),
                Span::raw("   "),
                Span::styled(format!("{} Errors", state.error_count), bold().fg(Color::Red)),
                Span::raw("   "),
                Span::styled(format!("{} Racers", competitors.len() + 1), bold()),
            ]))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

            Paragraph::new(passage_line(state, state.phase == Phase::InProgress))
                .wrap(Wrap { trim: false })
                .render(chunks[1], buf);

            progress_gauge(
                "You".to_string(),
                state.progress_percent(),
                format!("{} WPM", state.wpm),
                Color::Cyan,
            )
            .render(chunks[2], buf);

            for (i, c) in competitors.iter().enumerate() {
                progress_gauge(
                    c.name.clone(),
                    c.progress_percent,
                    format!("{} WPM", c.wpm),
                    Color::Magenta,
                )
                .render(chunks[3 + i], buf);
            }

            if state.phase == Phase::Complete {
                Paragraph::new(Span::styled(
                    format!(
                        "Race complete! You typed at {} WPM with {}% accuracy.",
                        state.wpm, state.accuracy_percent
                    ),
                    bold().fg(Color::Green),
                ))
                .alignment(Alignment::Center)
                .render(chunks[3 + competitors.len()], buf);
            }
        }
    }
}

fn render_learn(app: &App, area: Rect, buf: &mut Buffer) {
    let state = app.controller.state();
    let in_lesson = app.mode() == Mode::Lesson
        && matches!(state.phase, Phase::InProgress | Phase::Complete);

    if !in_lesson {
        let mut lines = vec![
            Line::from(Span::styled(
                "Choose a lesson to improve specific typing skills.",
                italic(),
            )),
            Line::from(""),
        ];
        for (i, lesson) in passage::lessons().iter().enumerate() {
            let marker = if i == app.lesson_cursor { "> " } else { "  " };
            let title_style = if i == app.lesson_cursor {
                bold().fg(Color::Cyan)
            } else {
                bold()
            };
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}. {}", lesson.id, lesson.title), title_style),
                Span::styled(format!("  [{}]", lesson.level), italic()),
            ]));
            lines.push(Line::from(Span::styled(
                format!("     {}", lesson.description),
                dim_bold(),
            )));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(area, buf);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(passage_height(state, area.width)),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let title = app
        .controller
        .lesson()
        .map(|l| l.title)
        .unwrap_or("Practice");
    let mut header = vec![Line::from(Span::styled(title, bold().fg(Color::Cyan)))];
    if state.phase == Phase::InProgress {
        let mut tip = "Type the text below exactly as shown. Focus on accuracy first, then speed.".to_string();
        if let Some(hint) = app.controller.lesson().and_then(|l| l.hint()) {
            tip.push(' ');
            tip.push_str(hint);
        }
        header.push(Line::from(Span::styled(tip, italic())));
    }
    Paragraph::new(header)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    Paragraph::new(passage_line(state, state.phase == Phase::InProgress))
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    let percent = state.progress_percent();
    progress_gauge(
        "Progress".to_string(),
        percent,
        format!("{}%", percent.round()),
        Color::Cyan,
    )
    .render(chunks[2], buf);

    if state.phase == Phase::Complete {
        Paragraph::new(Span::styled(
            format!(
                "Lesson complete! You typed at {} WPM with {}% accuracy ({} errors).",
                state.wpm, state.accuracy_percent, state.error_count
            ),
            bold().fg(Color::Green),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}

fn render_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let stats = app.controller.stats();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(app.recent_results.len() as u16 + 2),
        ])
        .split(area);

    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(format!("{} avg WPM", stats.average_wpm), bold()),
            Span::raw("   "),
            Span::styled(format!("{} best WPM", stats.best_wpm), bold().fg(Color::Green)),
            Span::raw("   "),
            Span::styled(
                format!("{}% avg accuracy", stats.average_accuracy),
                bold().fg(accuracy_color(stats.average_accuracy)),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("{} races", stats.total_races), dim_bold()),
            Span::raw("   "),
            Span::styled(format!("{} lessons", stats.total_lessons), dim_bold()),
        ]),
    ])
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let labels: Vec<String> = (1..=stats.recent_progress.len()).map(|i| i.to_string()).collect();
    let bars: Vec<(&str, u64)> = labels
        .iter()
        .zip(stats.recent_progress.iter())
        .map(|(label, wpm)| (label.as_str(), *wpm as u64))
        .collect();
    BarChart::default()
        .block(Block::default().title("Recent progress (WPM)").borders(Borders::TOP))
        .data(bars.as_slice())
        .bar_width(5)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(bold().fg(Color::Black).bg(Color::Magenta))
        .render(chunks[1], buf);

    let mut lines = vec![Line::from(Span::styled("Recent sessions", bold()))];
    lines.extend(app.recent_results.iter().rev().map(|r| {
        Line::from(Span::styled(
            format!(
                "{}  {:<6} {:>4} wpm  {:>3}% acc  {:>3} errors  {:>6.1}s",
                r.date.format("%Y-%m-%d %H:%M"),
                r.mode.to_string(),
                r.wpm,
                r.accuracy,
                r.errors,
                r.elapsed_secs
            ),
            dim_bold(),
        ))
    }));
    Paragraph::new(lines).render(chunks[2], buf);
}
