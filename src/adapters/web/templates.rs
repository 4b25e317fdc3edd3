//! HTML templates using Askama.
//!
//! Each page comes in two shapes: the full page extending `base.html`, and the
//! `partials/` fragment HTMX swaps into `#content`. Views carry preformatted
//! strings so the templates stay free of arithmetic.

use askama::Template;
use chrono::{Datelike, NaiveDate};

use crate::domain::journal::JournalDocument;
use crate::domain::ledger::{CalendarDay, DayOutcome, Summary};
use crate::domain::projection::Projection;
use crate::domain::record::{DailyRecord, RecordKind};

pub fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn signed_money(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

pub struct SummaryView {
    pub current_bank: String,
    pub win_rate: String,
    pub entry_target: String,
    pub entry_value: String,
    pub profit_target: String,
    pub profit_value: String,
    pub record_count: usize,
}

impl From<&Summary> for SummaryView {
    fn from(s: &Summary) -> Self {
        Self {
            current_bank: money(s.current_bank),
            win_rate: percent(s.win_rate),
            entry_target: percent(s.daily_entry_target),
            entry_value: money(s.daily_entry_value),
            profit_target: percent(s.daily_profit_target),
            profit_value: money(s.daily_profit_value),
            record_count: s.record_count,
        }
    }
}

pub struct HistoryRow {
    pub id: String,
    pub date: String,
    pub kind: &'static str,
    pub result: String,
    pub positive: bool,
    pub entries: String,
    pub wins: String,
    pub losses: String,
    pub win_rate: String,
}

fn count(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

impl From<&DailyRecord> for HistoryRow {
    fn from(r: &DailyRecord) -> Self {
        let kind = match r.kind {
            RecordKind::Trade => "Trade",
            RecordKind::Deposit => "Deposit",
            RecordKind::Withdrawal => "Withdrawal",
        };
        Self {
            id: r.id.clone(),
            date: r.calendar_day().format("%Y-%m-%d").to_string(),
            kind,
            result: signed_money(r.return_value),
            positive: r.return_value >= 0.0,
            entries: count(r.entries),
            wins: count(r.wins),
            losses: count(r.losses),
            win_rate: if r.is_trade() {
                percent(r.win_rate())
            } else {
                "-".into()
            },
        }
    }
}

pub struct DashboardView {
    pub summary: SummaryView,
    pub history: Vec<HistoryRow>,
    pub today: String,
    pub has_chart: bool,
}

impl DashboardView {
    /// `None` until settings exist; the setup form is shown instead.
    pub fn build(doc: &JournalDocument, today: NaiveDate) -> Option<Self> {
        let summary = doc.summary()?;
        Some(Self {
            summary: SummaryView::from(&summary),
            history: doc.history().into_iter().map(HistoryRow::from).collect(),
            today: today.format("%Y-%m-%d").to_string(),
            has_chart: !doc.records.is_empty(),
        })
    }
}

pub struct ProjectionRow {
    pub day: u32,
    pub date: String,
    pub profit: String,
    pub bank: String,
}

pub struct ProjectionView {
    pub start_balance: String,
    pub daily_rate: String,
    pub final_balance: String,
    pub rows: Vec<ProjectionRow>,
}

impl From<&Projection> for ProjectionView {
    fn from(p: &Projection) -> Self {
        Self {
            start_balance: money(p.start_balance()),
            daily_rate: percent(p.daily_rate() * 100.0),
            final_balance: money(p.final_balance()),
            rows: p
                .iter()
                .map(|d| ProjectionRow {
                    day: d.day,
                    date: d.date.format("%Y-%m-%d").to_string(),
                    profit: money(d.daily_profit),
                    bank: money(d.projected_bank),
                })
                .collect(),
        }
    }
}

pub struct CalendarCell {
    pub date: String,
    pub net: String,
    pub class: &'static str,
}

pub struct CalendarMonth {
    pub label: String,
    pub days: Vec<CalendarCell>,
}

pub struct CalendarView {
    pub months: Vec<CalendarMonth>,
    pub gain_days: usize,
    pub loss_days: usize,
}

impl CalendarView {
    /// Group days by month, newest month first.
    pub fn build(days: &[CalendarDay]) -> Self {
        let mut months: Vec<CalendarMonth> = Vec::new();
        let mut current: Option<(i32, u32)> = None;

        for day in days {
            let key = (day.date.year(), day.date.month());
            if current != Some(key) {
                current = Some(key);
                months.push(CalendarMonth {
                    label: day.date.format("%B %Y").to_string(),
                    days: Vec::new(),
                });
            }
            if let Some(month) = months.last_mut() {
                month.days.push(CalendarCell {
                    date: day.date.format("%d %a").to_string(),
                    net: signed_money(day.net),
                    class: match day.outcome {
                        DayOutcome::Gain => "gain",
                        DayOutcome::Loss => "loss",
                    },
                });
            }
        }
        months.reverse();

        let gain_days = days
            .iter()
            .filter(|d| d.outcome == DayOutcome::Gain)
            .count();
        Self {
            months,
            gain_days,
            loss_days: days.len() - gain_days,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
    pub view: &'a DashboardView,
}

#[derive(Template)]
#[template(path = "partials/dashboard.html")]
pub struct DashboardFragment<'a> {
    pub view: &'a DashboardView,
}

#[derive(Template)]
#[template(path = "setup.html")]
pub struct SetupPage;

#[derive(Template)]
#[template(path = "partials/setup.html")]
pub struct SetupFragment;

#[derive(Template)]
#[template(path = "projection.html")]
pub struct ProjectionPage<'a> {
    pub view: &'a ProjectionView,
}

#[derive(Template)]
#[template(path = "partials/projection.html")]
pub struct ProjectionFragment<'a> {
    pub view: &'a ProjectionView,
}

#[derive(Template)]
#[template(path = "calendar.html")]
pub struct CalendarPage<'a> {
    pub view: &'a CalendarView,
}

#[derive(Template)]
#[template(path = "partials/calendar.html")]
pub struct CalendarFragment<'a> {
    pub view: &'a CalendarView,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub message: &'a str,
}

#[derive(Template)]
#[template(path = "partials/error.html")]
pub struct ErrorFragment<'a> {
    pub status: u16,
    pub message: &'a str,
}
