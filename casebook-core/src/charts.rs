//! Vega-Lite chart specifications for a [`Report`].
//!
//! Each chart carries its own inline data, so a chart with no data can be
//! skipped without affecting the others.

use serde::Serialize;
use serde_json::{json, Value};

use crate::report::Report;

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Which chart a spec draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    PositiveNegative,
    Status,
    Modules,
    Heatmap,
    Timeline,
}

impl ChartKind {
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::PositiveNegative => "Positive vs Negative",
            ChartKind::Status => "Pass vs Fail",
            ChartKind::Modules => "Test cases per Module",
            ChartKind::Heatmap => "Heatmap: Module vs Status",
            ChartKind::Timeline => "Pass/Fail over time",
        }
    }
}

/// A chart's data rows and the full spec embedding them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub data: Vec<Value>,
    pub spec: Value,
}

impl Chart {
    fn new(kind: ChartKind, title: String, data: Vec<Value>, mut spec: Value) -> Self {
        spec["$schema"] = json!(SCHEMA);
        spec["title"] = json!(title);
        spec["data"] = json!({ "values": data });
        Self {
            kind,
            title,
            data,
            spec,
        }
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn pie(field: &str) -> Value {
    json!({
        "mark": { "type": "arc", "innerRadius": 20 },
        "encoding": {
            "theta": { "field": "count", "type": "quantitative" },
            "color": { "field": field, "type": "nominal" },
            "tooltip": [{ "field": field }, { "field": "count", "type": "quantitative" }]
        }
    })
}

pub fn positive_negative_chart(report: &Report) -> Chart {
    let p = report.polarity;
    let data = [("Positive", p.positive), ("Negative", p.negative), ("Other", p.other)]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    let kind = ChartKind::PositiveNegative;
    Chart::new(kind, kind.title().to_string(), data, pie("category"))
}

pub fn status_chart(report: &Report) -> Chart {
    let data = report
        .statuses
        .entries()
        .iter()
        .map(|e| json!({ "status": e.value, "count": e.count }))
        .collect();

    let kind = ChartKind::Status;
    Chart::new(kind, kind.title().to_string(), data, pie("status"))
}

pub fn module_chart(report: &Report) -> Chart {
    let data = report
        .top_modules
        .iter()
        .map(|e| json!({ "module": e.value, "count": e.count }))
        .collect();
    let spec = json!({
        "mark": "bar",
        "encoding": {
            "y": { "field": "module", "type": "nominal", "sort": "-x" },
            "x": { "field": "count", "type": "quantitative" },
            "tooltip": [{ "field": "module" }, { "field": "count", "type": "quantitative" }]
        }
    });

    let title = format!(
        "{} (top {})",
        ChartKind::Modules.title(),
        report.top_modules.len()
    );
    Chart::new(ChartKind::Modules, title, data, spec)
}

pub fn heatmap_chart(report: &Report) -> Chart {
    let data = report
        .heatmap
        .iter()
        .map(|c| json!({ "module": c.module, "status": c.status, "count": c.count }))
        .collect();
    let spec = json!({
        "height": 480,
        "mark": "rect",
        "encoding": {
            "x": { "field": "module", "type": "nominal", "axis": { "labelAngle": -45 } },
            "y": { "field": "status", "type": "nominal" },
            "color": { "field": "count", "type": "quantitative" },
            "tooltip": [
                { "field": "module" },
                { "field": "status" },
                { "field": "count", "type": "quantitative" }
            ]
        }
    });

    let kind = ChartKind::Heatmap;
    Chart::new(kind, kind.title().to_string(), data, spec)
}

/// Long-form pass/fail/other series. Empty when no date column held an
/// outcome.
pub fn timeline_chart(report: &Report) -> Chart {
    let has_outcomes = report.timeline.iter().any(|p| p.total() > 0);
    let data = if has_outcomes {
        report
            .timeline
            .iter()
            .flat_map(|p| {
                let date = p.date.format("%Y-%m-%d").to_string();
                [("Pass", p.pass), ("Fail", p.fail), ("Other", p.other)]
                    .into_iter()
                    .map(move |(result, count)| {
                        json!({ "date": date, "result": result, "count": count })
                    })
            })
            .collect()
    } else {
        Vec::new()
    };
    let spec = json!({
        "mark": { "type": "line", "point": true },
        "encoding": {
            "x": { "field": "date", "type": "temporal" },
            "y": { "field": "count", "type": "quantitative" },
            "color": { "field": "result", "type": "nominal" },
            "tooltip": [
                { "field": "date" },
                { "field": "result" },
                { "field": "count", "type": "quantitative" }
            ]
        }
    });

    let kind = ChartKind::Timeline;
    Chart::new(kind, kind.title().to_string(), data, spec)
}

/// Every chart for the report, including empty ones
pub fn build_charts(report: &Report) -> Vec<Chart> {
    vec![
        positive_negative_chart(report),
        status_chart(report),
        module_chart(report),
        heatmap_chart(report),
        timeline_chart(report),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::report::{ReportInput, ReportOptions};

    fn report_for(records: &[Record]) -> Report {
        Report::build(
            &ReportInput::from_records("memory", records),
            &ReportOptions::default(),
        )
    }

    #[test]
    fn test_positive_negative_omits_zero_buckets() {
        let report = report_for(&[
            Record::new().with("Test Case Type", "Positive"),
            Record::new().with("Test Case Type", "Positive"),
        ]);
        let chart = positive_negative_chart(&report);

        assert_eq!(chart.data, vec![json!({"category": "Positive", "count": 2})]);
        assert_eq!(chart.spec["mark"]["type"], "arc");
        assert_eq!(chart.spec["data"]["values"][0]["count"], 2);
    }

    #[test]
    fn test_charts_are_independent() {
        let report = report_for(&[Record::new().with("Module", "Login").with("Status", "Pass")]);
        let charts = build_charts(&report);

        assert_eq!(charts.len(), 5);
        let status = charts.iter().find(|c| c.kind == ChartKind::Status).unwrap();
        assert!(!status.is_empty());
        let timeline = charts.iter().find(|c| c.kind == ChartKind::Timeline).unwrap();
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_module_chart_title_and_sort() {
        let report = report_for(&[
            Record::new().with("Module", "Shop"),
            Record::new().with("Module", "Login"),
            Record::new().with("Module", "Login"),
        ]);
        let chart = module_chart(&report);

        assert_eq!(chart.title, "Test cases per Module (top 2)");
        assert_eq!(chart.data[0]["module"], "Login");
        assert_eq!(chart.spec["encoding"]["y"]["sort"], "-x");
    }

    #[test]
    fn test_timeline_long_form() {
        let mut input = ReportInput::from_records("memory", &[Record::new()]);
        input.table = crate::upload::CsvTable::parse(b"ID,2025-06-01\nTC_1,Pass\n").unwrap();
        let report = Report::build(&input, &ReportOptions::default());

        let chart = timeline_chart(&report);
        assert_eq!(chart.data.len(), 3);
        assert_eq!(
            chart.data[0],
            json!({"date": "2025-06-01", "result": "Pass", "count": 1})
        );
    }
}
