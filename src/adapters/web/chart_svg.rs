//! SVG line chart of the bank balance over time.

use crate::domain::ledger::BankEvolution;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 260.0;
const PADDING: f64 = 40.0;

pub fn bank_evolution_svg(evolution: &BankEvolution) -> String {
    if evolution.is_empty() {
        return format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}"><text x="{:.0}" y="{:.0}" text-anchor="middle" fill="#627d98">No data</text></svg>"##,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
    }

    let balances: Vec<f64> = evolution.balances().collect();
    let min = balances.iter().copied().fold(f64::INFINITY, f64::min);
    let max = balances.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;

    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if balances.len() > 1 {
        plot_width / (balances.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = balances
        .iter()
        .enumerate()
        .map(|(i, balance)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (balance - min) * scale_y;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let first_label = evolution
        .points
        .first()
        .map(|p| p.date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let last_label = evolution
        .points
        .last()
        .map(|p| p.date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
  <rect width="100%" height="100%" fill="white"/>
  <line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{base:.0}" stroke="#9fb3c8"/>
  <line x1="{p:.0}" y1="{base:.0}" x2="{right:.0}" y2="{base:.0}" stroke="#9fb3c8"/>
  <text x="{label_x:.0}" y="{top_y:.0}" font-size="11" text-anchor="end" fill="#486581">{max:.2}</text>
  <text x="{label_x:.0}" y="{base:.0}" font-size="11" text-anchor="end" fill="#486581">{min:.2}</text>
  <text x="{p:.0}" y="{date_y:.0}" font-size="11" fill="#486581">{first_label}</text>
  <text x="{right:.0}" y="{date_y:.0}" font-size="11" text-anchor="end" fill="#486581">{last_label}</text>
  <polyline fill="none" stroke="#2680c2" stroke-width="2" points="{points}"/>
</svg>
"##,
        w = WIDTH,
        h = HEIGHT,
        p = PADDING,
        base = HEIGHT - PADDING,
        right = WIDTH - PADDING,
        label_x = PADDING - 4.0,
        top_y = PADDING + 4.0,
        date_y = HEIGHT - PADDING + 16.0,
        points = points.join(" "),
    )
}
