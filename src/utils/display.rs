use crate::models::{Dashboard, Snapshot};
use crate::services::aggregate_cache::CacheStats;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use serde_json::Value;

pub struct DisplayFormatter;

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_header(&self, text: &str) -> String {
        format!("\n=== {} ===", text.bright_white().bold())
    }

    pub fn format_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);

        table.add_row(Row::new(
            headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
        ));

        for row in rows {
            table.add_row(Row::new(row.iter().map(|cell| Cell::new(cell)).collect()));
        }

        table.to_string()
    }

    pub fn format_metric_name(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for (i, word) in name.split('_').filter(|w| !w.is_empty()).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        out
    }

    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => group_thousands(i),
                None => n.to_string(),
            },
            Value::String(s) => s.clone(),
            Value::Null => "-".to_string(),
            other => other.to_string(),
        }
    }

    pub fn format_snapshot(&self, dashboard: Dashboard, snapshot: &Snapshot) -> String {
        let mut output = vec![self.format_header(&format!("{} dashboard", dashboard))];
        if snapshot.is_empty() {
            output.push("No statistics available".dimmed().to_string());
            return output.join("\n");
        }

        let rows: Vec<Vec<String>> = snapshot
            .iter()
            .map(|(name, value)| vec![self.format_metric_name(name), self.format_value(value)])
            .collect();
        output.push(self.format_table(&["Metric", "Value"], &rows));
        output.join("\n")
    }

    pub fn format_hit_ratio(&self, ratio: f64) -> String {
        let text = format!("{:.1}%", ratio * 100.0);
        if ratio >= 0.8 {
            text.green().to_string()
        } else if ratio >= 0.5 {
            text.yellow().to_string()
        } else {
            text.red().to_string()
        }
    }

    pub fn format_cache_stats(&self, stats: &CacheStats) -> String {
        let rows = vec![
            vec!["Hits".to_string(), stats.hits.to_string()],
            vec!["Misses".to_string(), stats.misses.to_string()],
            vec!["Coalesced".to_string(), stats.coalesced.to_string()],
            vec!["Stale served".to_string(), stats.stale_served.to_string()],
            vec!["Producer failures".to_string(), stats.producer_failures.to_string()],
            vec!["Hit ratio".to_string(), self.format_hit_ratio(stats.hit_ratio())],
        ];
        format!(
            "{}\n{}",
            self.format_header("Cache"),
            self.format_table(&["Counter", "Value"], &rows)
        )
    }

    pub fn format_dashboard_list(&self) -> String {
        let rows: Vec<Vec<String>> = Dashboard::ALL
            .iter()
            .map(|d| vec![d.slug().to_string(), d.description().to_string()])
            .collect();
        format!(
            "{}\n{}",
            self.format_header("Dashboards"),
            self.format_table(&["Name", "Shows"], &rows)
        )
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
